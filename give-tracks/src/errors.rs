use thiserror::Error;

use give_core::errors::{ReferenceError, RegionError};
use give_tree::TreeError;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown track: {0}")]
    UnknownTrack(String),
}

pub type TrackResult<T> = std::result::Result<T, TrackError>;

///
/// A problem with one part of a response. The offending part is skipped and
/// the rest of the batch is still ingested.
///
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestWarning {
    #[error("Response for '{key}' is not a list of entries")]
    NotAList { key: String },
    #[error("Skipped entry {index} of '{key}': {reason}")]
    BadEntry {
        key: String,
        index: usize,
        reason: String,
    },
    #[error("Chromosome '{chr}' is not part of the reference")]
    UnknownChromosome { chr: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Records handed to the trees.
    pub inserted: usize,
    pub warnings: Vec<IngestWarning>,
}

impl IngestReport {
    pub fn warn(&mut self, warning: IngestWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
