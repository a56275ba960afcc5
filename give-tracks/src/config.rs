use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use give_core::errors::ReferenceError;
use give_core::models::Reference;
use give_tree::TreeConfig;
use give_tree::consts::DEFAULT_BRANCHING_FACTOR;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ReferenceConfig {
    pub db: String,
    /// Two column `chrom.sizes` file, relative to the config file.
    pub chrom_sizes: Option<PathBuf>,
    pub chromosomes: Option<BTreeMap<String, u32>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct TreeSection {
    pub branching_factor: Option<usize>,
    pub min_branching: Option<usize>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GroupConfig {
    pub id: String,
    pub priority: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TrackConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub track_type: String,
    pub group: Option<String>,
    #[serde(default)]
    pub settings: toml::Table,
}

///
/// Everything needed to set up the tracks of one reference.
///
/// ```toml
/// [reference]
/// db = "hg38"
/// chrom_sizes = "hg38.chrom.sizes"
///
/// [tree]
/// branching_factor = 20
///
/// [[groups]]
/// id = "signal"
/// priority = 1.0
///
/// [[tracks]]
/// id = "h3k4me3"
/// type = "bigWig"
/// group = "signal"
/// settings = { visibility = "full", shortLabel = "H3K4me3" }
/// ```
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub tree: TreeSection,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("Invalid settings for track '{0}': {1}")]
    Settings(String, serde_json::Error),
    #[error("Reference '{0}' needs either `chrom_sizes` or `chromosomes`")]
    MissingChromosomes(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl TryFrom<&Path> for BrowserConfig {
    type Error = ConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

impl BrowserConfig {
    pub fn tree_config(&self) -> TreeConfig {
        let mut config =
            TreeConfig::new(self.tree.branching_factor.unwrap_or(DEFAULT_BRANCHING_FACTOR));
        if let Some(min_branching) = self.tree.min_branching {
            config.min_branching = min_branching;
        }
        config.normalized()
    }

    ///
    /// Build the reference with its groups. A `chrom_sizes` path is resolved
    /// against `base_dir`; inline `chromosomes` are added on top.
    ///
    pub fn build_reference(&self, base_dir: &Path) -> ConfigResult<Reference> {
        let db = &self.reference.db;
        let mut chromosomes: FxHashMap<String, u32> = match &self.reference.chrom_sizes {
            Some(path) => give_core::utils::read_chrom_sizes(&base_dir.join(path))?,
            None => FxHashMap::default(),
        };
        if let Some(inline) = &self.reference.chromosomes {
            chromosomes.extend(inline.iter().map(|(chr, len)| (chr.clone(), *len)));
        }
        if chromosomes.is_empty() {
            return Err(ConfigError::MissingChromosomes(db.clone()));
        }

        let mut reference = Reference::new(db, chromosomes);
        for group in &self.groups {
            reference.add_group(&group.id, group.priority);
        }
        Ok(reference)
    }
}

impl TrackConfig {
    /// The `settings` table as JSON values.
    pub fn json_settings(&self) -> ConfigResult<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(&self.settings) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Ok(serde_json::Map::new()),
            Err(err) => Err(ConfigError::Settings(self.id.clone(), err)),
        }
    }
}
