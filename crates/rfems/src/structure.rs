//! Structure model: materials and the primitives that fill them

use crate::geometry::{Axis, BoundingBox};
use crate::material::MaterialSpec;
use crate::mesh::MeshAxisSet;
use crate::model::{ModelRole, ModelSet};
use std::path::PathBuf;
use tracing::debug;

/// Solid shape registered with a material.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Axis-aligned box; used for flat sheets
    Box { bbox: BoundingBox, priority: i32 },
    /// Closed surface read by the solver from the extracted STL file
    Polyhedron { path: PathBuf, priority: i32 },
}

impl Primitive {
    pub fn priority(&self) -> i32 {
        match self {
            Primitive::Box { priority, .. } | Primitive::Polyhedron { priority, .. } => *priority,
        }
    }
}

/// Named material with its primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub material: MaterialSpec,
    pub primitives: Vec<Primitive>,
}

/// Everything the solver needs to know about the geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    pub properties: Vec<Property>,
    /// Union of every part's box, air included.
    pub scene_bbox: Option<BoundingBox>,
}

impl Structure {
    /// Register every non-port model, in name order, and return the
    /// structure along with the mesh lines it implies.
    ///
    /// Air models contribute to the scene extent only. With `force_pec` all
    /// other parts become perfect conductors.
    pub fn from_models(models: &ModelSet, force_pec: bool) -> (Self, MeshAxisSet) {
        let mut structure = Structure::default();
        let mut mesh = MeshAxisSet::new();

        for model in models.parts() {
            let bbox = model.bbox;
            structure.scene_bbox = Some(match structure.scene_bbox {
                Some(scene) => scene.union(&bbox),
                None => bbox,
            });

            let ModelRole::Part { tag, custom, priority } = &model.role else {
                continue;
            };
            let Some(material) = MaterialSpec::resolve(tag, *custom, *priority, force_pec) else {
                debug!("Skipping {} ({:?})", model.name, tag);
                continue;
            };

            mesh.add_box(&bbox);

            let primitive = if bbox.is_degenerate() {
                Primitive::Box {
                    bbox,
                    priority: *priority,
                }
            } else {
                Primitive::Polyhedron {
                    path: model.path.clone(),
                    priority: *priority,
                }
            };
            structure.properties.push(Property {
                name: model.name.clone(),
                material,
                primitives: vec![primitive],
            });
        }

        if let Some(scene) = structure.scene_bbox {
            for axis in Axis::ALL {
                mesh.add_box_edges(&scene, axis);
            }
        }

        (structure, mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::material::MaterialKind;
    use crate::testing::model;

    #[test]
    fn test_parts_registered_in_name_order() {
        let models = ModelSet::new(vec![
            model("z-copper", [0.0; 3], [1.0; 3]),
            model("a-pec priority=4", [2.0; 3], [3.0; 3]),
            model("m-air", [-10.0; 3], [10.0; 3]),
        ])
        .unwrap();

        let (structure, mesh) = Structure::from_models(&models, false);
        let names: Vec<_> = structure.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a-pec priority=4", "z-copper"]);
        assert_eq!(structure.properties[0].primitives[0].priority(), 4);
        assert!(matches!(
            structure.properties[1].material.kind,
            MaterialKind::Conductor { .. }
        ));

        // air widens the scene and adds the outer boundary lines
        assert_eq!(mesh.lines(Axis::X), vec![-10.0, 0.0, 1.0, 2.0, 3.0, 10.0]);
        assert_eq!(
            structure.scene_bbox,
            Some(BoundingBox::new(Vec3::repeat(-10.0), Vec3::repeat(10.0)))
        );
    }

    #[test]
    fn test_flat_part_becomes_box() {
        let models = ModelSet::new(vec![
            model("sheet-pec", [0.0, 0.0, 1.0], [5.0, 5.0, 1.0]),
            model("block-pec", [0.0; 3], [5.0; 3]),
        ])
        .unwrap();
        let (structure, _) = Structure::from_models(&models, false);
        assert!(matches!(structure.properties[0].primitives[0], Primitive::Polyhedron { .. }));
        assert!(matches!(structure.properties[1].primitives[0], Primitive::Box { .. }));
    }

    #[test]
    fn test_force_pec() {
        let models = ModelSet::new(vec![
            model("sub-fr4 epsilon=4.4", [0.0; 3], [5.0; 3]),
            model("trace-gold", [0.0; 3], [5.0; 3]),
        ])
        .unwrap();
        let (structure, _) = Structure::from_models(&models, true);
        assert!(structure.properties.iter().all(|p| p.material.is_pec()));
    }

    #[test]
    fn test_ports_are_not_parts() {
        let models = ModelSet::new(vec![model("feed-port x 1", [0.0; 3], [1.0; 3])]).unwrap();
        let (structure, mesh) = Structure::from_models(&models, false);
        assert!(structure.properties.is_empty());
        assert!(structure.scene_bbox.is_none());
        assert!(mesh.is_empty());
    }
}
