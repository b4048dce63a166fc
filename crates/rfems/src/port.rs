//! Lumped excitation ports

use crate::geometry::{Axis, BoundingBox};
use crate::mesh::MeshAxisSet;
use crate::model::ModelSet;

/// A lumped port as handed to the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct LumpedPort {
    /// 1-based port number
    pub number: u32,
    pub direction: Axis,
    /// Reference impedance (ohms)
    pub impedance: f64,
    pub priority: i32,
    /// Whether this port carries the excitation in the current run
    pub excite: bool,
    pub bbox: BoundingBox,
}

impl LumpedPort {
    /// Axes whose box edges snap to the grid: the two orthogonal to the port.
    pub fn edges_to_grid(&self) -> [Axis; 2] {
        self.direction.orthogonal()
    }
}

/// Build every port, in number order, exciting the one at 0-based index
/// `excited`, and extend the mesh with their boxes.
pub fn add_ports(models: &ModelSet, mesh: &mut MeshAxisSet, excited: usize) -> Vec<LumpedPort> {
    models
        .ports()
        .into_iter()
        .map(|(model, spec)| {
            let port = LumpedPort {
                number: spec.number,
                direction: spec.direction,
                impedance: spec.impedance,
                priority: spec.priority,
                excite: spec.number as usize == excited + 1,
                bbox: model.bbox,
            };
            mesh.add_box(&port.bbox);
            port
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::model;

    fn two_ports() -> ModelSet {
        ModelSet::new(vec![
            model("b-port y 2 zo=75 priority=3", [5.0, 0.0, 0.0], [6.0, 2.0, 0.0]),
            model("a-port x 1", [0.0; 3], [1.0, 0.0, 0.5]),
            model("ground-pec", [-1.0; 3], [7.0; 3]),
        ])
        .unwrap()
    }

    #[test]
    fn test_ports_in_number_order() {
        let mut mesh = MeshAxisSet::new();
        let ports = add_ports(&two_ports(), &mut mesh, 1);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].number, 1);
        assert_eq!(ports[0].impedance, 50.0);
        assert!(!ports[0].excite);
        assert_eq!(ports[1].number, 2);
        assert_eq!(ports[1].direction, Axis::Y);
        assert_eq!(ports[1].impedance, 75.0);
        assert_eq!(ports[1].priority, 3);
        assert!(ports[1].excite);
        assert_eq!(ports[1].edges_to_grid(), [Axis::X, Axis::Z]);
    }

    #[test]
    fn test_port_boxes_meshed_once() {
        let mut mesh = MeshAxisSet::new();
        let ports = add_ports(&two_ports(), &mut mesh, 0);

        let mut expected = MeshAxisSet::new();
        for port in &ports {
            expected.add_box(&port.bbox);
        }
        assert_eq!(mesh, expected);
        assert_eq!(mesh.lines(Axis::Y), vec![0.0, 2.0]);
    }

    #[test]
    fn test_exactly_one_port_excited() {
        for excited in 0..2 {
            let mut mesh = MeshAxisSet::new();
            let ports = add_ports(&two_ports(), &mut mesh, excited);
            let hot: Vec<_> = ports.iter().filter(|p| p.excite).map(|p| p.number).collect();
            assert_eq!(hot, vec![excited as u32 + 1]);
        }
    }

    #[test]
    fn test_ports_extend_mesh() {
        let mut mesh = MeshAxisSet::new();
        add_ports(&two_ports(), &mut mesh, 0);
        assert_eq!(mesh.lines(Axis::X), vec![0.0, 1.0, 5.0, 6.0]);
        assert_eq!(mesh.lines(Axis::Y), vec![0.0, 2.0]);
        assert_eq!(mesh.lines(Axis::Z), vec![0.0, 0.5]);
    }
}
