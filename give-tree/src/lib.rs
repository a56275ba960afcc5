//! # Interval trees for genome browser track data
//!
//! Per-chromosome caches of track data that know which parts of the
//! chromosome have been fetched, which are known to be empty, and which
//! still need to be requested.
//!
//! Two structures are provided:
//!
//! - [PineTree]: a partition of the chromosome into contiguous segments with
//!   bounded fan-out non-leaf nodes that carry summaries, for signal data
//!   (bigWig-like) queried at varying resolutions.
//! - [OakTree]: an ordered store of possibly overlapping features, for
//!   interaction data.
//!
//! ```rust
//! use give_core::models::Region;
//! use give_tree::{GiveTree, PineTree, SignalSummary, SummaryCtor, TreeConfig, TreeRecord};
//!
//! let mut tree: PineTree<f64, SignalSummary> =
//!     PineTree::with_span("chr1", 0, 1000, &TreeConfig::default());
//! let window = Region::new("chr1", 0, 20);
//! tree.insert(
//!     vec![TreeRecord::raw(0, 10, 2.0), TreeRecord::raw(10, 20, 4.0)],
//!     &[window.clone()],
//! )
//! .unwrap();
//!
//! let summary = tree.summary_in_range(&window, 20).unwrap();
//! assert_eq!(summary.value(), 3.0);
//! ```
pub mod coverage;
pub mod errors;
pub mod oak_tree;
pub mod pine_tree;
pub mod summary;
pub mod traits;

mod traversal;

pub use coverage::CoverageSet;
pub use errors::{TreeError, TreeResult};
pub use oak_tree::OakTree;
pub use pine_tree::PineTree;
pub use summary::{NoSummary, SignalSummary};
pub use traits::{
    EntryData, EntryIdentity, GiveTree, RecordData, SummaryCtor, TreeEntry, TreeRecord,
};
pub use traversal::Traversal;

pub mod consts {
    pub const DEFAULT_BRANCHING_FACTOR: usize = 20;
    pub const MIN_BRANCHING_FACTOR: usize = 4;
}

///
/// Which tree structure a track type stores its data in.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeType {
    Pine,
    Oak,
}

///
/// Shape parameters shared by all trees of a track.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeConfig {
    /// Maximum number of children of a non-leaf node.
    pub branching_factor: usize,
    /// Number of children moved into a new sibling when a node overflows.
    pub min_branching: usize,
}

impl TreeConfig {
    pub fn new(branching_factor: usize) -> Self {
        let branching_factor = branching_factor.max(consts::MIN_BRANCHING_FACTOR);
        TreeConfig {
            branching_factor,
            min_branching: branching_factor / 2,
        }
    }

    /// Clamp user supplied values into a usable shape.
    pub fn normalized(self) -> Self {
        let branching_factor = self.branching_factor.max(consts::MIN_BRANCHING_FACTOR);
        TreeConfig {
            branching_factor,
            min_branching: self.min_branching.clamp(2, branching_factor / 2),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig::new(consts::DEFAULT_BRANCHING_FACTOR)
    }
}
