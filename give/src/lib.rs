#[cfg(feature = "core")]
#[doc(inline)]
pub use give_core as core;

#[cfg(feature = "tree")]
#[doc(inline)]
pub use give_tree as tree;

#[cfg(feature = "tracks")]
#[doc(inline)]
pub use give_tracks as tracks;
