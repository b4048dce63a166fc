//! openEMS backend: writes the scene as XML and runs the solver executables

use crate::error::{Error, Result};
use crate::port::LumpedPort;
use crate::simulation::Scene;
use crate::solver::{csx, nf2ff, probe, FarField, FieldSolver};
use crate::sparams::{AngularGrid, PortResponse};
use crate::SimulationConfig;
use ndarray::Array1;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Simulation document inside the work area.
const MODEL_FILE: &str = "model.xml";
/// Far-field job description inside the work area.
const NF2FF_FILE: &str = "nf2ff.xml";
/// Structural dump written with `--debug-PEC`.
const PEC_DUMP_FILE: &str = "PEC_dump.vtp";

/// Drives the openEMS command line tools found on `PATH`.
#[derive(Debug, Clone)]
pub struct OpenEms {
    /// Solver threads, 0 for all cores
    pub threads: usize,
    pub verbose: u32,
    /// Ask the solver for a PEC dump
    pub debug_pec: bool,
    pub solver: PathBuf,
    pub transform: PathBuf,
    pub model_viewer: PathBuf,
    pub field_viewer: PathBuf,
}

impl Default for OpenEms {
    fn default() -> Self {
        Self {
            threads: 0,
            verbose: 0,
            debug_pec: false,
            solver: PathBuf::from("openEMS"),
            transform: PathBuf::from("nf2ff"),
            model_viewer: PathBuf::from("AppCSXCAD"),
            field_viewer: PathBuf::from("paraview"),
        }
    }
}

impl OpenEms {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            threads: config.threads,
            verbose: config.verbose,
            debug_pec: config.dump_pec,
            ..Self::default()
        }
    }

    fn write_model(&self, scene: &Scene, sim_path: &Path) -> Result<PathBuf> {
        fs::create_dir_all(sim_path)?;
        let path = sim_path.join(MODEL_FILE);
        fs::write(&path, csx::render_model(scene)?)?;
        debug!("Wrote {:?}", path);
        Ok(path)
    }

    fn solver_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.threads > 0 {
            args.push(format!("--numThreads={}", self.threads));
        }
        if self.verbose > 0 {
            args.push(format!("-{}", "v".repeat(self.verbose as usize)));
        }
        if self.debug_pec {
            args.push("--debug-PEC".to_string());
        }
        args
    }
}

/// Run `program` in `cwd` and wait for it.
fn execute<I, S>(program: &Path, args: I, cwd: &Path) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).current_dir(cwd);
    debug!("Running {:?}", command);

    let status = command
        .status()
        .map_err(|e| Error::Solver(format!("cannot start {}: {e}", program.display())))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Solver(format!("{} exited with {status}", program.display())))
    }
}

impl FieldSolver for OpenEms {
    fn show_model(&self, scene: &Scene, sim_path: &Path) -> Result<()> {
        let model = self.write_model(scene, sim_path)?;
        info!("Opening {:?} in {}", model, self.model_viewer.display());
        execute(&self.model_viewer, [model.as_os_str()], sim_path)
    }

    fn run(&self, scene: &Scene, sim_path: &Path) -> Result<()> {
        self.write_model(scene, sim_path)?;
        let mut args = vec![MODEL_FILE.to_string()];
        args.extend(self.solver_args());
        info!("Running {} in {:?}", self.solver.display(), sim_path);
        execute(&self.solver, args, sim_path)
    }

    fn show_pec_dump(&self, sim_path: &Path) -> Result<()> {
        let dump = sim_path.join(PEC_DUMP_FILE);
        info!("Opening {:?} in {}", dump, self.field_viewer.display());
        execute(&self.field_viewer, [dump.as_os_str()], sim_path)
    }

    fn port_response(
        &self,
        port: &LumpedPort,
        sim_path: &Path,
        frequencies: &Array1<f64>,
    ) -> Result<PortResponse> {
        probe::read_port(sim_path, port.number, port.impedance, frequencies)
    }

    fn far_field(
        &self,
        scene: &Scene,
        sim_path: &Path,
        frequency: f64,
        grid: &AngularGrid,
    ) -> Result<FarField> {
        let nf2ff_box = scene.nf2ff.as_ref().ok_or_else(|| {
            Error::InvalidConfig("far field requested for a scene without a near-field box".into())
        })?;
        let job = csx::render_nf2ff(
            nf2ff_box,
            scene.delta_unit,
            sim_path,
            nf2ff::OUTFILE,
            frequency,
            grid,
            self.verbose,
        )?;
        let job_path = sim_path.join(NF2FF_FILE);
        fs::write(&job_path, job)?;

        info!("Computing far field at {:.6e} Hz", frequency);
        execute(&self.transform, [job_path.as_os_str()], sim_path)?;
        nf2ff::read_far_field(&sim_path.join(nf2ff::OUTFILE))
    }

    fn supports_far_field(&self) -> bool {
        nf2ff::AVAILABLE
    }
}
