//! Port sweep: one solver run per excited port, filling one column of the
//! scattering matrix each.

use crate::error::{Error, Result};
use crate::model::ModelSet;
use crate::output::{ReferenceImpedance, SimulationResult};
use crate::simulation::{FrequencySweep, Scene};
use crate::solver::FieldSolver;
use crate::sparams::{frequency_of_interest, AngularGrid, ScatteringMatrix};
use crate::SimulationConfig;
use std::fs;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// Half-open range of 0-based port indices to excite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRange(pub Range<usize>);

impl PortRange {
    /// Resolve 1-based `start`/`stop` bounds against `ports` ports.
    ///
    /// No `start` means the first port; no `stop` means only `start`;
    /// `stop == 0` means every port from `start` on.
    pub fn resolve(start: Option<usize>, stop: Option<usize>, ports: usize) -> Result<Self> {
        let first = start.unwrap_or(0).saturating_sub(1);
        let last = match stop {
            None => first + 1,
            Some(0) => ports,
            Some(stop) => stop.min(ports),
        };
        let range = first..last.max(first + 1);
        if ports > 0 && range.start >= ports {
            return Err(Error::InvalidConfig(format!(
                "start port {} is beyond the last port {}",
                range.start + 1,
                ports
            )));
        }
        Ok(Self(range))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a sweep ended.
#[derive(Debug)]
pub enum SweepOutcome {
    Completed(SimulationResult),
    /// A viewer was opened; no results were computed.
    Inspected,
}

/// Empty the solver work area.
fn reset_work_area(sim_path: &Path) -> Result<()> {
    if sim_path.exists() {
        fs::remove_dir_all(sim_path)?;
    }
    fs::create_dir_all(sim_path)?;
    Ok(())
}

/// Check mode combinations before anything is solved.
fn check_modes<S: FieldSolver + ?Sized>(
    config: &SimulationConfig,
    solver: &S,
    range: &PortRange,
) -> Result<()> {
    if (config.farfield || config.single_run_platform) && range.len() > 1 {
        return Err(Error::SingleRunOnly {
            requested: range.len(),
        });
    }
    if config.farfield && !solver.supports_far_field() {
        return Err(Error::FarFieldUnavailable(
            "solver cannot compute far fields in this build".into(),
        ));
    }
    Ok(())
}

/// Run the configured port sweep over `models`.
///
/// Each iteration rebuilds the scene from scratch in an emptied `sim_path`,
/// so column `n` never depends on the run that excited port `n - 1`.
pub fn run_sweep<S: FieldSolver + ?Sized>(
    models: &ModelSet,
    config: &SimulationConfig,
    solver: &S,
    sim_path: &Path,
) -> Result<SweepOutcome> {
    let sweep = FrequencySweep::from_config(config)?;
    let frequencies = sweep.frequencies();
    let ports = models.port_count();
    let range = PortRange::resolve(config.start, config.stop, ports)?;
    check_modes(config, solver, &range)?;

    let grid = AngularGrid::new(config.dtheta, config.dphi);
    let mut s = ScatteringMatrix::zeros(frequencies.len(), ports);
    let mut far_field = None;

    for n in range.0.clone() {
        info!("Exciting port {} ({} of {})", n + 1, n - range.0.start + 1, range.len());
        reset_work_area(sim_path)?;
        let scene = Scene::build(models, config, &sweep, n)?;

        if config.show_model {
            solver.show_model(&scene, sim_path)?;
            return Ok(SweepOutcome::Inspected);
        }
        solver.run(&scene, sim_path)?;
        if config.dump_pec {
            solver.show_pec_dump(sim_path)?;
            return Ok(SweepOutcome::Inspected);
        }

        let responses = scene
            .ports
            .iter()
            .map(|port| solver.port_response(port, sim_path, &frequencies))
            .collect::<Result<Vec<_>>>()?;
        if n < responses.len() {
            s.fill_column(n, &responses);
        }

        if config.farfield {
            let frequency = if config.minimum_search {
                frequency_of_interest(&frequencies, &s, n, sweep.center)
            } else {
                sweep.center
            };
            debug!("Far field frequency {:.6e} Hz", frequency);
            far_field = Some(solver.far_field(&scene, sim_path, frequency, &grid)?);
        }
    }

    let impedances: Vec<f64> = models.ports().iter().map(|(_, p)| p.impedance).collect();
    Ok(SweepOutcome::Completed(SimulationResult {
        f: frequencies,
        s: s.into_array(),
        z: ReferenceImpedance::from_ports(&impedances, config.line),
        far_field,
    }))
}
