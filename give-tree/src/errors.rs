use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("Tree holds {expected}, query is on {found}")]
    ChromosomeMismatch { expected: String, found: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Inconsistent summary at {0}")]
    InconsistentSummary(String),
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;
