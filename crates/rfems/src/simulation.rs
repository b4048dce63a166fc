//! Per-run simulation scene: structure, mesh, ports and solver settings
//!
//! A [`Scene`] is rebuilt from the immutable models for every excited port.
//! Nothing is carried over between sweep iterations.

use crate::error::{Error, Result};
use crate::geometry::{Axis, BoundingBox, Vec3};
use crate::mesh::MeshAxisSet;
use crate::model::ModelSet;
use crate::port::{add_ports, LumpedPort};
use crate::structure::Structure;
use crate::{SimulationConfig, STL_UNIT};
use ndarray::Array1;

/// Measurement frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySweep {
    /// Center frequency (Hz)
    pub center: f64,
    /// Span between the -20 dB passband ends (Hz)
    pub span: f64,
    pub points: usize,
}

impl FrequencySweep {
    /// Resolve center and span: each defaults to the other. With neither
    /// set, only the inspection modes may proceed (at 1 Hz).
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let (center, span) = match (config.frequency, config.span) {
            (Some(f), span) if f != 0.0 => (f, span.filter(|&s| s != 0.0).unwrap_or(f)),
            (_, Some(s)) if s != 0.0 => (s, s),
            _ if config.show_model || config.dump_pec => (1.0, 1.0),
            _ => return Err(Error::MissingFrequency),
        };
        Ok(Self {
            center,
            span,
            points: config.points,
        })
    }

    pub fn frequencies(&self) -> Array1<f64> {
        if self.points == 1 {
            Array1::from_elem(1, self.center)
        } else {
            Array1::linspace(
                self.center - self.span / 2.0,
                self.center + self.span / 2.0,
                self.points,
            )
        }
    }
}

/// Face boundary condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// First-order absorbing (Mur)
    Absorbing,
    /// Perfect electric conductor
    PerfectlyReflecting,
}

impl Boundary {
    /// Mesh lines the boundary occupies.
    pub fn layers(self) -> usize {
        match self {
            Boundary::Absorbing => 1,
            Boundary::PerfectlyReflecting => 0,
        }
    }
}

/// Gaussian pulse excitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussExcitation {
    /// Center frequency (Hz)
    pub f0: f64,
    /// 20 dB corner frequency (Hz)
    pub fc: f64,
}

/// Solver settings independent of geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSetup {
    pub excitation: GaussExcitation,
    /// xmin, xmax, ymin, ymax, zmin, zmax
    pub boundary: [Boundary; 6],
    /// Energy decay ratio that ends the run; solver default if `None`
    pub end_criteria: Option<f64>,
    /// Timestep limit; solver default if `None`
    pub timesteps: Option<u64>,
    /// Disable material averaging at cell boundaries
    pub cell_constant_material: bool,
}

impl SimulationSetup {
    pub fn new(config: &SimulationConfig, sweep: &FrequencySweep) -> Self {
        let face = if config.farfield {
            Boundary::Absorbing
        } else {
            Boundary::PerfectlyReflecting
        };
        Self {
            excitation: GaussExcitation {
                f0: sweep.center,
                fc: sweep.span / 2.0,
            },
            boundary: [face; 6],
            end_criteria: config.criteria.map(|db| 10f64.powf(db / 10.0)),
            timesteps: config.dump_pec.then_some(0),
            cell_constant_material: !config.average,
        }
    }
}

/// Closed box on which near fields are recorded for the far-field transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nf2ffBox {
    pub bbox: BoundingBox,
}

impl Nf2ffBox {
    /// Place the box three lines inside the boundary layers of a smoothed mesh.
    pub fn on_mesh(mesh: &MeshAxisSet, boundary: &[Boundary; 6]) -> Result<Self> {
        let mut min = Vec3::zeros();
        let mut max = Vec3::zeros();
        for axis in Axis::ALL {
            let lines = mesh.lines(axis);
            let lo = boundary[2 * axis.index()].layers() + 3;
            let hi = lines
                .len()
                .checked_sub(boundary[2 * axis.index() + 1].layers() + 4)
                .filter(|&hi| hi > lo)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "mesh has {} lines on {}, too few for a far-field box",
                        lines.len(),
                        axis
                    ))
                })?;
            min[axis.index()] = lines[lo];
            max[axis.index()] = lines[hi];
        }
        Ok(Self {
            bbox: BoundingBox::new(min, max),
        })
    }
}

/// Everything one solver invocation consumes.
#[derive(Debug, Clone)]
pub struct Scene {
    pub structure: Structure,
    pub mesh: MeshAxisSet,
    pub ports: Vec<LumpedPort>,
    pub setup: SimulationSetup,
    pub nf2ff: Option<Nf2ffBox>,
    /// Meters per model unit
    pub delta_unit: f64,
}

impl Scene {
    /// Build a fresh scene exciting the port at 0-based index `excited`.
    pub fn build(
        models: &ModelSet,
        config: &SimulationConfig,
        sweep: &FrequencySweep,
        excited: usize,
    ) -> Result<Self> {
        let setup = SimulationSetup::new(config, sweep);
        let (structure, mut mesh) = Structure::from_models(models, config.dump_pec);
        let ports = add_ports(models, &mut mesh, excited);
        mesh.smooth(config.pitch / STL_UNIT);

        let nf2ff = if config.farfield {
            Some(Nf2ffBox::on_mesh(&mesh, &setup.boundary)?)
        } else {
            None
        };

        Ok(Self {
            structure,
            mesh,
            ports,
            setup,
            nf2ff,
            delta_unit: STL_UNIT,
        })
    }

    pub fn excited_port(&self) -> Option<&LumpedPort> {
        self.ports.iter().find(|p| p.excite)
    }
}
