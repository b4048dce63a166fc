//! Error type shared by every stage of the pipeline.
//!
//! All of these are fatal: the binary prints the message and exits.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Surface file is not in the ASCII form.
    #[error("{}: binary stl files unsupported: not enough precision", path.display())]
    BinaryStl { path: PathBuf },

    #[error("{}:{line}: malformed vertex: {reason}", path.display())]
    MalformedStl {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("model '{name}' has no facets")]
    EmptyModel { name: String },

    #[error("no port number provided in port name '{name}'")]
    MissingPortNumber { name: String },

    #[error("port number must be 1 or greater in port name '{name}', got {number}")]
    InvalidPortNumber { name: String, number: i64 },

    #[error("no port direction provided in port name '{name}'")]
    MissingPortDirection { name: String },

    #[error("ports must be numbered consecutive from 1, found {numbers:?}")]
    NonContiguousPorts { numbers: Vec<u32> },

    #[error("either frequency span or center frequency must be set")]
    MissingFrequency,

    #[error("only one port can be simulated with farfield or on this platform, {requested} requested")]
    SingleRunOnly { requested: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("far-field transform unavailable: {0}")]
    FarFieldUnavailable(String),

    #[error("solver failed: {0}")]
    Solver(String),

    #[error("malformed result archive: {0}")]
    ResultArchive(String),
}

pub type Result<T> = std::result::Result<T, Error>;
