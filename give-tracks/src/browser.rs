use std::path::Path;

use log::info;

use give_core::models::{Reference, Region};

use crate::adapter::{QueryIntent, QueryResult};
use crate::config::{BrowserConfig, ConfigResult};
use crate::errors::{IngestReport, TrackError, TrackResult};
use crate::priority::PriorityManager;
use crate::registry::TrackRegistry;
use crate::track::Track;
use crate::wire::Response;

///
/// The tracks of one reference together with their ordering.
///
#[derive(Debug)]
pub struct Browser {
    reference: Reference,
    registry: TrackRegistry,
    tracks: Vec<Track>,
    priorities: PriorityManager,
}

impl Browser {
    pub fn new(reference: Reference, registry: TrackRegistry) -> Self {
        Browser {
            reference,
            registry,
            tracks: Vec::new(),
            priorities: PriorityManager::default(),
        }
    }

    ///
    /// Create the reference and every configured track. Relative paths in
    /// `config` are resolved against `base_dir`.
    ///
    pub fn from_config(config: &BrowserConfig, base_dir: &Path) -> ConfigResult<Self> {
        let reference = config.build_reference(base_dir)?;
        let registry = TrackRegistry::with_defaults(config.tree_config());

        let mut tracks = Vec::with_capacity(config.tracks.len());
        for track_config in &config.tracks {
            tracks.push(registry.create_track(
                &track_config.id,
                track_config.json_settings()?,
                Some(&track_config.track_type),
                track_config.group.as_deref(),
                &reference,
            ));
        }
        let priorities = PriorityManager::new(&tracks, &reference);
        info!(
            "Loaded {} tracks on {} ({} visible)",
            tracks.len(),
            reference.db,
            priorities.len()
        );

        Ok(Browser {
            reference,
            registry,
            tracks,
            priorities,
        })
    }

    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let config = BrowserConfig::try_from(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Browser::from_config(&config, base_dir)
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn reference_mut(&mut self) -> &mut Reference {
        &mut self.reference
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn priorities(&self) -> &PriorityManager {
        &self.priorities
    }

    pub fn priorities_mut(&mut self) -> &mut PriorityManager {
        &mut self.priorities
    }

    pub fn track(&self, id: &str) -> TrackResult<&Track> {
        self.tracks
            .iter()
            .find(|track| track.id() == id)
            .ok_or_else(|| TrackError::UnknownTrack(id.to_string()))
    }

    pub fn track_mut(&mut self, id: &str) -> TrackResult<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id() == id)
            .ok_or_else(|| TrackError::UnknownTrack(id.to_string()))
    }

    ///
    /// Add a track. Visible tracks are appended to the end of their slot.
    /// A track with the same ID is replaced.
    ///
    pub fn add_track(&mut self, track: Track) {
        self.remove_track(track.id());
        if track.is_visible() {
            self.priorities.add_track(&track);
        }
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, id: &str) -> Option<Track> {
        self.priorities.remove_track(id);
        let index = self.tracks.iter().position(|track| track.id() == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn ingest(
        &mut self,
        id: &str,
        response: &Response,
        query_regions: &[Region],
    ) -> TrackResult<IngestReport> {
        let Browser {
            reference, tracks, ..
        } = self;
        let track = tracks
            .iter_mut()
            .find(|track| track.id() == id)
            .ok_or_else(|| TrackError::UnknownTrack(id.to_string()))?;
        track.ingest(reference, response, query_regions)
    }

    pub fn query(
        &self,
        id: &str,
        window: &Region,
        resolution: u32,
        intent: QueryIntent,
    ) -> TrackResult<QueryResult> {
        self.track(id)?.query(window, resolution, intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fxhash::FxHashMap;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::{Map, json};

    use give_tree::TreeConfig;

    #[fixture]
    fn browser() -> Browser {
        let mut chromosomes = FxHashMap::default();
        chromosomes.insert("chr1".to_string(), 1000);
        let reference = Reference::new("test", chromosomes);
        Browser::new(reference, TrackRegistry::with_defaults(TreeConfig::default()))
    }

    fn visible() -> Map<String, serde_json::Value> {
        match json!({ "visibility": "full" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[rstest]
    fn test_add_replace_remove(mut browser: Browser) {
        let track = browser.registry().create_track(
            "signal",
            visible(),
            Some("bigwig"),
            None,
            browser.reference(),
        );
        browser.add_track(track);
        let hidden = browser
            .registry()
            .create_track("quiet", Map::new(), Some("bigwig"), None, browser.reference());
        browser.add_track(hidden);

        assert_eq!(browser.tracks().len(), 2);
        assert_eq!(browser.priorities().ordered_ids(false), vec!["signal"]);

        let again = browser.registry().create_track(
            "signal",
            visible(),
            Some("interaction"),
            None,
            browser.reference(),
        );
        browser.add_track(again);
        assert_eq!(browser.tracks().len(), 2);
        assert!(browser.track("signal").unwrap().adapter().as_interaction().is_some());

        assert!(browser.remove_track("signal").is_some());
        assert!(browser.priorities().is_empty());
        assert!(matches!(browser.track("signal"), Err(TrackError::UnknownTrack(_))));
    }

    #[rstest]
    fn test_ingest_and_query(mut browser: Browser) {
        let track = browser.registry().create_track(
            "signal",
            visible(),
            Some("bigwig"),
            None,
            browser.reference(),
        );
        browser.add_track(track);

        let window: Region = "chr1:0-20".parse().unwrap();
        let response = json!({
            "chr1:0-20": [
                { "regionString": "chr1:0-10", "data": { "value": 2.0 } },
                { "regionString": "chr1:10-20", "data": { "value": 4.0 } }
            ]
        });
        let report = browser
            .ingest("signal", response.as_object().unwrap(), &[window.clone()])
            .unwrap();
        assert_eq!(report.inserted, 2);

        match browser.query("signal", &window, 20, QueryIntent::Summary).unwrap() {
            QueryResult::Summary(summary) => assert_eq!(summary.sum_data, 60.0),
            other => panic!("unexpected {:?}", other),
        }
        assert!(browser
            .ingest("missing", &Response::new(), &[])
            .is_err());
    }
}
