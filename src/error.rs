//! Error types for the screening engine
//!
//! Recoverable conditions (a malformed element set, a model failure for one
//! object, a tick with no aligned hazard data) are logged and skipped where
//! they happen and never reach this type. What ends up here is fatal for the
//! run: structural emptiness, bad configuration, I/O, or cancellation.

use std::path::PathBuf;

use thiserror::Error;

use crate::propagation::ModelError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The element-set source yielded nothing that could be propagated
    #[error("no valid element sets found in {source_name}")]
    NoElementSets { source_name: String },

    /// One side of the screening has no trajectory data at all
    #[error("{population} population has no trajectory data")]
    EmptyPopulation { population: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A trajectory file row could not be turned into a state vector
    #[error("{path:?} (line {line}): {reason}")]
    TrajectoryFile {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The orbit model could not handle an object
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
