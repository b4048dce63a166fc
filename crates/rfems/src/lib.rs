//! rfems: S-parameters and far-field patterns of CAD models with openEMS
//!
//! This crate provides:
//! - Ingestion of zip archives of ASCII STL models whose names carry their
//!   material, priority and port metadata
//! - Construction of the structure, rectilinear mesh and lumped ports
//! - A port sweep that drives an external FDTD solver once per excited port
//!   and assembles the scattering matrix
//! - Far-field patterns at the best-matched frequency
//! - A NumPy `.npz` result archive
//!
//! Model coordinates are millimetres; frequencies are Hz.

pub mod error;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod model;
pub mod naming;
pub mod npy;
pub mod output;
pub mod port;
pub mod simulation;
pub mod solver;
pub mod sparams;
pub mod stl;
pub mod structure;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use model::{Model, ModelSet};
pub use output::{ReferenceImpedance, SimulationResult};
pub use solver::{FarField, FieldSolver, OpenEms};
pub use sweep::{run_sweep, SweepOutcome};

use std::path::{Path, PathBuf};
use tracing::info;

/// Thinner than this (mm) is flat.
pub const STL_TOL: f64 = 0.001;
/// Metres per STL unit.
pub const STL_UNIT: f64 = 1e-3;

pub const DEFAULT_PITCH: f64 = 1e-3;
/// Even, so group delay can be derived from neighbouring points.
pub const DEFAULT_POINTS: usize = 1000;
pub const DEFAULT_REFERENCE: f64 = 50.0;
pub const DEFAULT_DPHI: f64 = 2.0;
pub const DEFAULT_DTHETA: f64 = 2.0;

/// Settings of one run, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Zip archive of STL models
    pub input: PathBuf,
    /// Result archive; defaults to the input path
    pub output: Option<PathBuf>,
    /// Yee cell side (m)
    pub pitch: f64,
    /// Center frequency (Hz)
    pub frequency: Option<f64>,
    /// Span between the -20 dB passband ends (Hz)
    pub span: Option<f64>,
    /// Measurement points; 1 for the center frequency only
    pub points: usize,
    /// First port to excite, from 1
    pub start: Option<usize>,
    /// Last port to excite, from 1; 0 for all
    pub stop: Option<usize>,
    /// Default port reference impedance (ohms)
    pub line: f64,
    pub farfield: bool,
    /// Azimuth increment (degrees)
    pub dphi: f64,
    /// Elevation increment (degrees)
    pub dtheta: f64,
    /// Compute the far field at the best-matched frequency instead of the center
    pub minimum_search: bool,
    /// End criterion (dB)
    pub criteria: Option<f64>,
    /// Average materials at cell boundaries
    pub average: bool,
    pub verbose: u32,
    /// Solver threads, 0 for all
    pub threads: usize,
    pub show_model: bool,
    pub dump_pec: bool,
    /// The solver on this platform must not be run more than once per process.
    pub single_run_platform: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            pitch: DEFAULT_PITCH,
            frequency: None,
            span: None,
            points: DEFAULT_POINTS,
            start: None,
            stop: None,
            line: DEFAULT_REFERENCE,
            farfield: false,
            dphi: DEFAULT_DPHI,
            dtheta: DEFAULT_DTHETA,
            minimum_search: true,
            criteria: None,
            average: false,
            verbose: 0,
            threads: 0,
            show_model: false,
            dump_pec: false,
            single_run_platform: cfg!(all(target_os = "macos", target_arch = "aarch64")),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pitch", self.pitch),
            ("dphi", self.dphi),
            ("dtheta", self.dtheta),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        if self.points == 0 {
            return Err(Error::InvalidConfig("points must be at least 1".into()));
        }
        if self.line < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "line impedance must not be negative, got {}",
                self.line
            )));
        }
        Ok(())
    }

    /// Input path with a `.zip` extension.
    pub fn archive_path(&self) -> PathBuf {
        with_extension(&self.input, "zip")
    }

    /// Output path with a `.npz` extension, defaulting to the input.
    pub fn result_path(&self) -> PathBuf {
        output::npz_path(self.output.as_deref().unwrap_or(&self.input))
    }
}

fn with_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(extension) {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}

/// Main entry point: load the archive, sweep the ports and save the results.
///
/// Returns the result archive path, or `None` when a debug viewer ended the
/// run early.
pub fn run<S: FieldSolver + ?Sized>(config: &SimulationConfig, solver: &S) -> Result<Option<PathBuf>> {
    config.validate()?;
    let input = config.archive_path();
    let output = config.result_path();

    let scratch = tempfile::tempdir()?;
    let models = ModelSet::load(&input, &scratch.path().join("mod"), config.line)?;
    info!("{} models, {} ports", models.len(), models.port_count());

    match run_sweep(&models, config, solver, &scratch.path().join("sim"))? {
        SweepOutcome::Completed(result) => Ok(Some(result.save(&output)?)),
        SweepOutcome::Inspected => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{box_stl, write_archive, MockSolver};
    use pretty_assertions::assert_eq;
    use std::fs::File;

    fn archive(dir: &Path, entries: &[(&str, String)]) -> PathBuf {
        let path = dir.join("design.zip");
        write_archive(&path, entries);
        path
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = zip::ZipArchive::new(File::open(path).unwrap())
            .unwrap()
            .file_names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_paths() {
        let config = SimulationConfig {
            input: PathBuf::from("/work/board"),
            ..SimulationConfig::default()
        };
        assert_eq!(config.archive_path(), PathBuf::from("/work/board.zip"));
        assert_eq!(config.result_path(), PathBuf::from("/work/board.npz"));

        let config = SimulationConfig {
            output: Some(PathBuf::from("/out/result.dat")),
            ..config
        };
        assert_eq!(config.result_path(), PathBuf::from("/out/result.npz"));
    }

    #[test]
    fn test_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
        for bad in [
            SimulationConfig { pitch: 0.0, ..SimulationConfig::default() },
            SimulationConfig { points: 0, ..SimulationConfig::default() },
            SimulationConfig { dtheta: -2.0, ..SimulationConfig::default() },
            SimulationConfig { dphi: f64::NAN, ..SimulationConfig::default() },
        ] {
            assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_single_port_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = archive(
            dir.path(),
            &[
                ("space-air.stl", box_stl([-10.0; 3], [10.0; 3])),
                ("block-pec.stl", box_stl([-2.0; 3], [2.0; 3])),
                ("feed-port x 1.stl", box_stl([2.0, 0.0, 0.0], [4.0, 0.0, 1.0])),
            ],
        );
        let config = SimulationConfig {
            input,
            frequency: Some(1e9),
            span: Some(1e9),
            points: 1,
            single_run_platform: false,
            ..SimulationConfig::default()
        };

        let written = run(&config, &MockSolver::default()).unwrap().unwrap();
        assert_eq!(written, dir.path().join("design.npz"));
        assert_eq!(entry_names(&written), ["f.npy", "s.npy", "z.npy"]);

        let result = SimulationResult::load(&written).unwrap();
        assert_eq!(result.f.to_vec(), vec![1e9]);
        assert_eq!(result.s.dim(), (1, 1, 1));
        assert_eq!(result.s[[0, 0, 0]], MockSolver::expected(0, 0));
        assert_eq!(result.z, ReferenceImpedance::Uniform(50.0));
        assert!(result.far_field.is_none());
    }

    #[test]
    fn test_two_port_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = archive(
            dir.path(),
            &[
                ("line-pec.stl", box_stl([-5.0, -1.0, 0.0], [5.0, 1.0, 0.0])),
                ("left-port x 1.stl", box_stl([-6.0, 0.0, 0.0], [-5.0, 0.0, 1.0])),
                ("right-port x 2.stl", box_stl([5.0, 0.0, 0.0], [6.0, 0.0, 1.0])),
            ],
        );
        let config = SimulationConfig {
            input,
            output: Some(dir.path().join("sweep")),
            frequency: Some(1e9),
            points: 3,
            start: Some(1),
            stop: Some(2),
            single_run_platform: false,
            ..SimulationConfig::default()
        };

        let solver = MockSolver::default();
        let written = run(&config, &solver).unwrap().unwrap();
        assert_eq!(written, dir.path().join("sweep.npz"));
        assert_eq!(solver.excited(), vec![Some(1), Some(2)]);

        let result = SimulationResult::load(&written).unwrap();
        assert_eq!(result.s.dim(), (3, 2, 2));
        for m in 0..2 {
            for n in 0..2 {
                assert_eq!(result.s[[1, m, n]], MockSolver::expected(m, n));
            }
        }
    }

    #[test]
    fn test_far_field_with_two_ports_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = archive(
            dir.path(),
            &[
                ("a-port z 1.stl", box_stl([0.0; 3], [0.0, 0.0, 1.0])),
                ("b-port z 2.stl", box_stl([5.0, 0.0, 0.0], [5.0, 0.0, 1.0])),
            ],
        );
        let config = SimulationConfig {
            input,
            frequency: Some(1e9),
            farfield: true,
            stop: Some(0),
            ..SimulationConfig::default()
        };

        let solver = MockSolver::default();
        let err = run(&config, &solver).unwrap_err();
        assert!(matches!(err, Error::SingleRunOnly { requested: 2 }));
        assert!(solver.calls().is_empty());
        assert!(!dir.path().join("design.npz").exists());
    }

    #[test]
    fn test_far_field_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = archive(
            dir.path(),
            &[
                ("space-air.stl", box_stl([-10.0; 3], [10.0; 3])),
                ("dipole-pec.stl", box_stl([0.0, 0.0, 0.5], [0.0, 0.0, 5.0])),
                ("feed-port z 1.stl", box_stl([0.0, 0.0, -0.5], [0.0, 0.0, 0.5])),
            ],
        );
        let config = SimulationConfig {
            input,
            frequency: Some(1e9),
            points: 3,
            farfield: true,
            dtheta: 45.0,
            dphi: 45.0,
            ..SimulationConfig::default()
        };

        let written = run(&config, &MockSolver::default()).unwrap().unwrap();
        let names = entry_names(&written);
        for key in output::FAR_FIELD_KEYS {
            assert!(names.contains(&format!("{key}.npy")), "{key}");
        }
        let ff = SimulationResult::load(&written).unwrap().far_field.unwrap();
        assert_eq!(ff.e_theta.dim(), (8, 4));
        assert_eq!(ff.freq, 1e9);
    }

    #[test]
    fn test_missing_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let input = archive(dir.path(), &[("feed-port x 1.stl", box_stl([0.0; 3], [1.0; 3]))]);
        let config = SimulationConfig {
            input,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            run(&config, &MockSolver::default()),
            Err(Error::MissingFrequency)
        ));
    }
}
