//! Track level plumbing of the GIVE data store.
//!
//! A [Track](track::Track) owns one [DataAdapter](adapter::DataAdapter) which
//! turns JSON responses into tree records and answers window queries. The
//! [TrackRegistry](registry::TrackRegistry) picks the adapter for a track
//! type and the [PriorityManager](priority::PriorityManager) keeps the
//! vertical order of the tracks.
//!
//! ```rust
//! use fxhash::FxHashMap;
//! use give_core::models::{Reference, Region};
//! use give_tracks::{QueryIntent, QueryResult, TrackRegistry};
//! use serde_json::{json, Map};
//!
//! let mut chromosomes = FxHashMap::default();
//! chromosomes.insert("chr1".to_string(), 1_000_000);
//! let reference = Reference::new("hg38", chromosomes);
//!
//! let registry = TrackRegistry::default();
//! let mut track = registry.create_track("signal", Map::new(), Some("bigWig"), None, &reference);
//!
//! let window: Region = "chr1:0-20".parse().unwrap();
//! assert!(!track.query(&window, 1, QueryIntent::Entries).unwrap().is_fetched());
//!
//! let response = json!({
//!     "chr1:0-20": [
//!         { "regionString": "chr1:0-10", "data": { "value": 2.0 } },
//!         { "regionString": "chr1:10-20", "data": { "value": 4.0 } }
//!     ]
//! });
//! track.ingest(&reference, response.as_object().unwrap(), &[window.clone()]).unwrap();
//!
//! match track.query(&window, 20, QueryIntent::Summary).unwrap() {
//!     QueryResult::Summary(summary) => assert_eq!(summary.sum_data, 60.0),
//!     _ => unreachable!(),
//! }
//! ```
pub mod adapter;
pub mod bigwig;
pub mod browser;
pub mod config;
pub mod errors;
pub mod interaction;
pub mod priority;
pub mod registry;
pub mod track;
pub mod utils;
pub mod view;
pub mod wire;

pub use adapter::{DataAdapter, EntryValue, NullAdapter, QueryIntent, QueryResult, TrackEntry};
pub use bigwig::{BigWigAdapter, SignalDisplay, SignalView};
pub use browser::Browser;
pub use config::{BrowserConfig, ConfigError};
pub use errors::{IngestReport, IngestWarning, TrackError, TrackResult};
pub use interaction::{InteractionAdapter, InteractionData};
pub use priority::{EffectivePriority, PriorityManager, Slot, compare_priorities};
pub use registry::TrackRegistry;
pub use track::{Settings, Track, Visibility};
pub use view::{CancellationToken, Outcome, Ticket, ViewWindow};
pub use wire::{Response, parse_response};
