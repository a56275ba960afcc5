use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegionError {
    #[error("Malformed region string: {0}")]
    Format(String),

    #[error("Invalid strand token: {0}")]
    InvalidStrand(String),

    #[error("Region end is before its start: {0}")]
    InvertedRange(String),
}

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference {0} is not ready yet")]
    NotReady(String),

    #[error("Chromosome {chr} is not part of reference {db}")]
    UnknownChromosome { db: String, chr: String },

    #[error("Malformed chrom sizes line: {0}")]
    ChromSizesParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
