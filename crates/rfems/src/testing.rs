//! Fixtures shared by the unit tests

use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Vec3};
use crate::model::{Model, ModelRole};
use crate::port::LumpedPort;
use crate::simulation::Scene;
use crate::solver::{FarField, FieldSolver};
use crate::sparams::{AngularGrid, PortResponse};
use crate::{DEFAULT_REFERENCE, STL_TOL};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// ASCII STL of the axis-aligned box `min..max` (12 facets).
pub fn box_stl(min: [f64; 3], max: [f64; 3]) -> String {
    let corner = |i: usize| {
        [
            if i & 1 == 0 { min[0] } else { max[0] },
            if i & 2 == 0 { min[1] } else { max[1] },
            if i & 4 == 0 { min[2] } else { max[2] },
        ]
    };
    const FACES: [[usize; 4]; 6] = [
        [0, 1, 3, 2],
        [4, 6, 7, 5],
        [0, 4, 5, 1],
        [2, 3, 7, 6],
        [0, 2, 6, 4],
        [1, 5, 7, 3],
    ];

    let mut stl = String::from("solid box\n");
    for [a, b, c, d] in FACES {
        for tri in [[a, b, c], [a, c, d]] {
            stl.push_str("  facet normal 0 0 0\n    outer loop\n");
            for v in tri {
                let [x, y, z] = corner(v);
                let _ = writeln!(stl, "      vertex {x:e} {y:e} {z:e}");
            }
            stl.push_str("    endloop\n  endfacet\n");
        }
    }
    stl.push_str("endsolid box\n");
    stl
}

/// Write a zip archive with the given `(entry name, contents)` pairs.
pub fn write_archive(path: &Path, entries: &[(&str, String)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// In-memory model of the box `min..max`, decoded from `name`.
pub fn model(name: &str, min: [f64; 3], max: [f64; 3]) -> Model {
    let bbox = BoundingBox::new(Vec3::from(min), Vec3::from(max));
    Model {
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.stl")),
        facets: Vec::new(),
        bbox: bbox.collapse_thin(STL_TOL),
        role: ModelRole::decode(name, DEFAULT_REFERENCE).unwrap(),
    }
}

/// Work-area marker left by [`MockSolver::run`].
const MARKER: &str = "mock.run";

/// Field solver that records its calls and answers with synthetic data.
///
/// Reflected waves depend only on the responding port, the excited port and
/// the distance of each frequency from `dip`; incident waves are 1.
pub struct MockSolver {
    pub far_field_support: bool,
    /// Frequency with the smallest reflection
    pub dip: f64,
    pub(crate) calls: RefCell<Vec<&'static str>>,
    pub(crate) excited: RefCell<Vec<Option<u32>>>,
    pub(crate) far_field_frequencies: RefCell<Vec<f64>>,
}

impl Default for MockSolver {
    fn default() -> Self {
        Self {
            far_field_support: true,
            dip: 1e9,
            calls: RefCell::default(),
            excited: RefCell::default(),
            far_field_frequencies: RefCell::default(),
        }
    }
}

impl MockSolver {
    /// `S[dip, m, k]` for responding port index `m` and excited index `k`.
    pub fn expected(m: usize, k: usize) -> Complex64 {
        Complex64::new(0.1 * (m + 1) as f64, 0.01 * (k + 1) as f64)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    /// Excited port number of every run.
    pub fn excited(&self) -> Vec<Option<u32>> {
        self.excited.borrow().clone()
    }

    pub fn far_field_frequencies(&self) -> Vec<f64> {
        self.far_field_frequencies.borrow().clone()
    }
}

impl FieldSolver for MockSolver {
    fn show_model(&self, _scene: &Scene, _sim_path: &Path) -> Result<()> {
        self.calls.borrow_mut().push("show_model");
        Ok(())
    }

    fn run(&self, scene: &Scene, sim_path: &Path) -> Result<()> {
        self.calls.borrow_mut().push("run");
        let marker = sim_path.join(MARKER);
        if marker.exists() {
            return Err(Error::Solver("work area left over from a previous run".into()));
        }
        fs::write(marker, "")?;
        self.excited
            .borrow_mut()
            .push(scene.excited_port().map(|p| p.number));
        Ok(())
    }

    fn show_pec_dump(&self, _sim_path: &Path) -> Result<()> {
        self.calls.borrow_mut().push("show_pec_dump");
        Ok(())
    }

    fn port_response(
        &self,
        port: &LumpedPort,
        _sim_path: &Path,
        frequencies: &Array1<f64>,
    ) -> Result<PortResponse> {
        self.calls.borrow_mut().push("port_response");
        let k = self
            .excited
            .borrow()
            .last()
            .copied()
            .flatten()
            .ok_or_else(|| Error::Solver("no port excited".into()))?;
        let s = Self::expected(port.number as usize - 1, k as usize - 1);
        Ok(PortResponse {
            incident: Array1::from_elem(frequencies.len(), Complex64::new(1.0, 0.0)),
            reflected: frequencies.mapv(|f| s * (1.0 + (f - self.dip).abs() / 1e9)),
        })
    }

    fn far_field(
        &self,
        _scene: &Scene,
        _sim_path: &Path,
        frequency: f64,
        grid: &AngularGrid,
    ) -> Result<FarField> {
        self.calls.borrow_mut().push("far_field");
        self.far_field_frequencies.borrow_mut().push(frequency);
        let dim = (grid.theta.len(), grid.phi.len());
        Ok(FarField {
            theta: grid.theta_radians(),
            phi: grid.phi_radians(),
            r: 1.0,
            freq: frequency,
            dmax: 1.5,
            prad: 1e-3,
            e_theta: Array2::from_elem(dim, Complex64::new(1.0, 0.0)),
            e_phi: Array2::zeros(dim),
            p_rad: Array2::from_elem(dim, 0.5),
        })
    }

    fn supports_far_field(&self) -> bool {
        self.far_field_support
    }
}
