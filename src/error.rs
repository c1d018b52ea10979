use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationReport;

/// The step of an export or import a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Metadata,
    Nodes,
    Edges,
    Tracks,
    Features,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Metadata => "metadata",
            Phase::Nodes => "nodes",
            Phase::Edges => "edges",
            Phase::Tracks => "tracks",
            Phase::Features => "features",
        };
        f.write_str(name)
    }
}

/// The main error type for trackgeff operations.
#[derive(Debug, Error)]
pub enum GeffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store failure while processing {phase}: {source}")]
    Store {
        phase: Phase,
        #[source]
        source: StoreError,
    },

    #[error("No GEFF metadata found at '{location}' (store missing or incomplete)")]
    MetadataMissing { location: String },

    #[error("Invalid GEFF metadata at '{location}': {message}")]
    MetadataInvalid { location: String, message: String },

    #[error("Required {phase} column '{column}' is missing")]
    MissingColumn { phase: Phase, column: String },

    #[error("Invalid {phase} column '{column}': {message}")]
    InvalidColumn {
        phase: Phase,
        column: String,
        message: String,
    },

    #[error("Invalid group name '{0}': must name a path below the store root")]
    InvalidGroup(String),

    #[error("Invalid tracking model: {0}")]
    InvalidModel(String),

    #[error("Failed to parse model JSON from {path}: {source}")]
    ModelJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write model JSON to {path}: {source}")]
    ModelJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

impl GeffError {
    /// Wraps a store failure with the phase it happened in.
    pub fn store(phase: Phase) -> impl FnOnce(StoreError) -> GeffError {
        move |source| GeffError::Store { phase, source }
    }
}
