use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceId;
use crate::verify::Discrepancy;

/// Error type for configuration, verification, collaborator, and IO failures.
#[derive(Debug, Error)]
pub enum SimordError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("configuration error: unexpected origin file '{0}'")]
    UnknownOrigin(String),
    #[error("reallocation verification failed: {}", summarize(.discrepancies))]
    VerificationFailed { discrepancies: Vec<Discrepancy> },
    #[error("data source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },
    #[error("invalid JSON in {}: {reason}", path.display())]
    InvalidJson { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn summarize(discrepancies: &[Discrepancy]) -> String {
    discrepancies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
