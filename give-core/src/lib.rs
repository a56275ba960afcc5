//! Core models shared by every GIVE crate.
//!
//! [`Region`](models::Region) is the half-open genomic interval everything else is
//! keyed on, and [`Reference`](models::Reference) carries chromosome sizes and
//! track group metadata for a genome assembly.
//!
//! ```rust
//! use give_core::models::Region;
//!
//! let region: Region = "chr2:100-200(-)".parse().unwrap();
//! assert_eq!(region.len(), 100);
//! assert_eq!(region.to_string(), "chr2:100-200 (-)");
//! ```
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::{ReferenceError, RegionError};
