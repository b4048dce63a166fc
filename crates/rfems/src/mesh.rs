//! Rectilinear mesh lines

use crate::geometry::{Axis, BoundingBox};

/// Lines closer than this (in model units) are the same line.
const LINE_MERGE_DISTANCE: f64 = 1e-9;

/// Grid lines of a rectilinear mesh, one set per axis.
///
/// Lines may be added in any order; readers always see them sorted and
/// de-duplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAxisSet {
    lines: [Vec<f64>; 3],
}

impl MeshAxisSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, axis: Axis, value: f64) {
        self.lines[axis.index()].push(value);
    }

    /// Add the start and stop coordinate of `bbox` on `axis`.
    pub fn add_box_edges(&mut self, bbox: &BoundingBox, axis: Axis) {
        self.add_line(axis, bbox.start(axis));
        self.add_line(axis, bbox.stop(axis));
    }

    /// Add the box coordinates on all three axes.
    pub fn add_box(&mut self, bbox: &BoundingBox) {
        for axis in Axis::ALL {
            self.add_box_edges(bbox, axis);
        }
    }

    /// Sorted, de-duplicated lines on `axis`.
    pub fn lines(&self, axis: Axis) -> Vec<f64> {
        normalized(&self.lines[axis.index()])
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }

    /// Lowest and highest line on `axis`.
    pub fn bounds(&self, axis: Axis) -> Option<(f64, f64)> {
        let lines = self.lines(axis);
        Some((*lines.first()?, *lines.last()?))
    }

    /// Insert lines so that no gap on any axis exceeds `max_resolution`.
    /// Oversized gaps are split into equal cells.
    pub fn smooth(&mut self, max_resolution: f64) {
        for axis in Axis::ALL {
            let lines = self.lines(axis);
            let mut smoothed = Vec::with_capacity(lines.len());
            for pair in lines.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                smoothed.push(a);
                let cells = ((b - a) / max_resolution).ceil() as usize;
                for k in 1..cells {
                    smoothed.push(a + (b - a) * k as f64 / cells as f64);
                }
            }
            smoothed.extend(lines.last());
            self.lines[axis.index()] = smoothed;
        }
    }
}

fn normalized(lines: &[f64]) -> Vec<f64> {
    let mut sorted = lines.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|b, a| (*b - *a).abs() <= LINE_MERGE_DISTANCE);
    sorted
}
