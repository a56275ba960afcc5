use fxhash::FxHashMap;
use log::{debug, warn};
use serde_json::{Map, Value};

use give_core::models::Reference;
use give_tree::TreeConfig;

use crate::adapter::{DataAdapter, NullAdapter};
use crate::bigwig::BigWigAdapter;
use crate::interaction::InteractionAdapter;
use crate::track::{Track, type_trunk};

pub type AdapterFactory = fn(&TreeConfig) -> Box<dyn DataAdapter>;

fn bigwig_adapter(config: &TreeConfig) -> Box<dyn DataAdapter> {
    Box::new(BigWigAdapter::new(config))
}

fn interaction_adapter(config: &TreeConfig) -> Box<dyn DataAdapter> {
    Box::new(InteractionAdapter::new(config))
}

///
/// Maps track type keywords to the adapters that store their data.
///
/// Built once at startup and handed to whoever creates tracks.
///
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    factories: FxHashMap<String, AdapterFactory>,
    tree_config: TreeConfig,
}

impl TrackRegistry {
    pub fn new(tree_config: TreeConfig) -> Self {
        TrackRegistry {
            factories: FxHashMap::default(),
            tree_config: tree_config.normalized(),
        }
    }

    /// A registry knowing the `bigwig` and `interaction` track types.
    pub fn with_defaults(tree_config: TreeConfig) -> Self {
        let mut registry = TrackRegistry::new(tree_config);
        registry.register(&["bigwig"], bigwig_adapter);
        registry.register(&["interaction"], interaction_adapter);
        registry
    }

    pub fn tree_config(&self) -> &TreeConfig {
        &self.tree_config
    }

    ///
    /// Register `factory` under every key in `keys` (case insensitive),
    /// replacing earlier registrations. Returns `false` if any key was
    /// already taken.
    ///
    pub fn register(&mut self, keys: &[&str], factory: AdapterFactory) -> bool {
        let mut all_new = true;
        for key in keys {
            if self
                .factories
                .insert(key.to_lowercase(), factory)
                .is_some()
            {
                debug!("Track type '{}' was registered before, replaced", key);
                all_new = false;
            }
        }
        all_new
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factories.contains_key(&type_trunk(type_name))
    }

    ///
    /// An adapter for `type_name`. Unknown types get a [NullAdapter] after a
    /// warning.
    ///
    pub fn create_adapter(&self, type_name: &str) -> Box<dyn DataAdapter> {
        match self.factories.get(&type_trunk(type_name)) {
            Some(factory) => factory(&self.tree_config),
            None => {
                warn!("Type '{}' is not a valid type!", type_name);
                Box::new(NullAdapter)
            }
        }
    }

    ///
    /// Create a track. `type_name` is stored as the `type` setting unless the
    /// settings already carry one. A group unknown to `reference` is kept but
    /// logged, the track then sorts as ungrouped.
    ///
    pub fn create_track(
        &self,
        id: &str,
        mut settings: Map<String, Value>,
        type_name: Option<&str>,
        group: Option<&str>,
        reference: &Reference,
    ) -> Track {
        if let Some(type_name) = type_name {
            settings
                .entry("type")
                .or_insert_with(|| Value::String(type_name.to_string()));
        }
        let resolved = settings
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| type_name.map(str::to_string))
            .unwrap_or_default();

        if let Some(group) = group.filter(|group| reference.group(group).is_none()) {
            warn!("Track '{}' refers to unknown group '{}'", id, group);
        }

        let adapter = self.create_adapter(&resolved);
        Track::new(id, settings, group, adapter)
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        TrackRegistry::with_defaults(TreeConfig::default())
    }
}
