//! rfems: CLI for openEMS port sweeps over a zip of named STL models

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser};
use rfems::{
    run, OpenEms, SimulationConfig, DEFAULT_DPHI, DEFAULT_DTHETA, DEFAULT_PITCH, DEFAULT_POINTS,
    DEFAULT_REFERENCE,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rfems")]
#[command(about = "Simulate S-parameters and far-field patterns of STL models with openEMS")]
#[command(version)]
struct Args {
    /// Input zip file of STL models
    input: PathBuf,

    /// S-parameter and far-field .npz output file [default: input]
    output: Option<PathBuf>,

    /// Length of a uniform yee cell side (m)
    #[arg(long, default_value_t = DEFAULT_PITCH)]
    pitch: f64,

    /// Center simulation frequency (Hz)
    #[arg(long, value_name = "FREQ")]
    frequency: Option<f64>,

    /// Simulation span, -20dB passband ends (Hz)
    #[arg(long)]
    span: Option<f64>,

    /// Measurement frequency points, set to 1 for center frequency
    #[arg(long, default_value_t = DEFAULT_POINTS)]
    points: usize,

    /// First port to excite, starting from 1
    #[arg(long)]
    start: Option<usize>,

    /// Last port to excite, starting from 1, 0 for all
    #[arg(long)]
    stop: Option<usize>,

    /// Default characteristic impedance of ports (ohms)
    #[arg(long, default_value_t = DEFAULT_REFERENCE)]
    line: f64,

    #[command(flatten)]
    farfield: FarFieldArgs,

    #[command(flatten)]
    solver: SolverArgs,

    #[command(flatten)]
    debug: DebugArgs,
}

#[derive(ClapArgs, Debug)]
#[command(next_help_heading = "Farfield options")]
struct FarFieldArgs {
    /// Generate free-space farfield radiation patterns
    #[arg(long)]
    farfield: bool,

    /// Azimuth increment (degree)
    #[arg(long, default_value_t = DEFAULT_DPHI)]
    dphi: f64,

    /// Elevation increment (degree)
    #[arg(long, default_value_t = DEFAULT_DTHETA)]
    dtheta: f64,

    /// Do not find the frequency of least VSWR, use the center frequency
    #[arg(long)]
    nominimum: bool,
}

#[derive(ClapArgs, Debug)]
#[command(next_help_heading = "openEMS options")]
struct SolverArgs {
    /// End criteria, eg -60 (dB)
    #[arg(long, allow_hyphen_values = true)]
    criteria: Option<f64>,

    /// Use cell material averaging
    #[arg(long)]
    average: bool,

    /// openEMS verbose setting
    #[arg(long, default_value_t = 0)]
    verbose: u32,

    /// Number of threads to use, 0 for all
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(ClapArgs, Debug)]
#[command(next_help_heading = "Debugging options")]
struct DebugArgs {
    /// Run AppCSXCAD on input model, no simulation
    #[arg(long)]
    show_model: bool,

    /// Generate PEC dump file and run ParaView on it
    #[arg(long)]
    dump_pec: bool,
}

impl From<Args> for SimulationConfig {
    fn from(args: Args) -> Self {
        Self {
            input: args.input,
            output: args.output,
            pitch: args.pitch,
            frequency: args.frequency,
            span: args.span,
            points: args.points,
            start: args.start,
            stop: args.stop,
            line: args.line,
            farfield: args.farfield.farfield,
            dphi: args.farfield.dphi,
            dtheta: args.farfield.dtheta,
            minimum_search: !args.farfield.nominimum,
            criteria: args.solver.criteria,
            average: args.solver.average,
            verbose: args.solver.verbose,
            threads: args.solver.threads,
            show_model: args.debug.show_model,
            dump_pec: args.debug.dump_pec,
            ..SimulationConfig::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = SimulationConfig::from(Args::parse());
    let solver = OpenEms::from_config(&config);

    let written = run(&config, &solver)
        .with_context(|| format!("Simulation of {:?} failed", config.input))?;

    if let Some(path) = written {
        eprintln!("Wrote results: {:?}", path);
    }

    Ok(())
}
