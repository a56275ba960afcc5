pub mod reference;
pub mod region;

// re-export for cleaner imports
pub use self::reference::{ChromSizes, Reference, TrackGroup};
pub use self::region::{ExtendDirection, Extension, Region, Strand};
