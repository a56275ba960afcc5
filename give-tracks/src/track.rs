use std::collections::BTreeMap;

use log::warn;
use serde_json::{Map, Value};

use give_core::models::{Reference, Region};

use crate::adapter::{DataAdapter, QueryIntent, QueryResult};
use crate::errors::{IngestReport, TrackResult};
use crate::wire::Response;

pub const DEFAULT_PRIORITY: f64 = 100.0;

pub type SettingValue = Value;

///
/// Current track settings together with the defaults they can be reset to.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    current: BTreeMap<String, SettingValue>,
    defaults: BTreeMap<String, SettingValue>,
}

impl Settings {
    ///
    /// Build settings from a raw map. Keys of a nested `settings` object are
    /// lifted to the top level and win over top-level keys of the same name.
    ///
    pub fn from_map(mut raw: Map<String, Value>) -> Self {
        match raw.remove("settings") {
            Some(Value::Object(nested)) => raw.extend(nested),
            Some(other) => {
                raw.insert("settings".to_string(), other);
            }
            None => {}
        }
        Settings {
            current: raw.into_iter().collect(),
            defaults: BTreeMap::new(),
        }
    }

    /// Make the current values the defaults.
    pub fn snapshot_defaults(&mut self) {
        self.defaults = self.current.clone();
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.current.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    pub fn set<V: Into<SettingValue>>(&mut self, key: &str, value: V) -> Option<SettingValue> {
        self.current.insert(key.to_string(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.current.remove(key)
    }

    pub fn default_value(&self, key: &str) -> Option<&SettingValue> {
        self.defaults.get(key)
    }

    /// Change the value `key` resets to. The current value is untouched.
    pub fn set_default<V: Into<SettingValue>>(&mut self, key: &str, value: V) {
        self.defaults.insert(key.to_string(), value.into());
    }

    ///
    /// Restore the default of `key`, or drop the setting when it has no
    /// default.
    ///
    pub fn reset(&mut self, key: &str) {
        match self.defaults.get(key) {
            Some(value) => {
                self.current.insert(key.to_string(), value.clone());
            }
            None => {
                self.current.remove(key);
            }
        }
    }

    pub fn reset_all(&mut self) {
        self.current = self.defaults.clone();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.current.iter()
    }

    /// The setting as text; missing and `null` settings are empty.
    pub fn get_string(&self, key: &str) -> String {
        match self.current.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.current.get(key)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64)),
            Value::String(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            Value::Bool(flag) => Some(i64::from(*flag)),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.current.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    ///
    /// Truthiness of a setting. Strings are true only for `on`, `true`,
    /// `yes`, `y` and `t` (any case).
    ///
    pub fn get_bool(&self, key: &str) -> bool {
        match self.current.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => matches!(
                text.to_lowercase().as_str(),
                "on" | "true" | "yes" | "y" | "t"
            ),
            Some(Value::Number(number)) => number.as_f64().is_some_and(|f| f != 0.0),
            Some(_) => true,
        }
    }
}

///
/// UCSC style display density, from hidden to fully expanded.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    Hide = 0,
    Dense = 1,
    NoText = 2,
    Collapsed = 3,
    Pack = 4,
    Full = 5,
}

impl Visibility {
    ///
    /// Parse a UCSC visibility name. Unknown names are logged and hide the
    /// track.
    ///
    pub fn from_ucsc(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "full" => Visibility::Full,
            "pack" => Visibility::Pack,
            "collapsed" => Visibility::Collapsed,
            "notext" => Visibility::NoText,
            "dense" => Visibility::Dense,
            "hide" => Visibility::Hide,
            other => {
                warn!("Invalid visibility value encountered: \"{}\". Used \"hide\" instead.", other);
                Visibility::Hide
            }
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Visibility::Hide),
            1 => Some(Visibility::Dense),
            2 => Some(Visibility::NoText),
            3 => Some(Visibility::Collapsed),
            4 => Some(Visibility::Pack),
            5 => Some(Visibility::Full),
            _ => None,
        }
    }

    /// Read a stored setting: a level, a UCSC name or an on/off flag.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(number) => number
                .as_i64()
                .and_then(Visibility::from_level)
                .unwrap_or_else(|| {
                    warn!("Invalid visibility level {}. Used \"hide\" instead.", number);
                    Visibility::Hide
                }),
            Value::String(text) => match text.trim().parse::<i64>() {
                Ok(level) => Visibility::from_value(&Value::from(level)),
                Err(_) => Visibility::from_ucsc(text),
            },
            Value::Bool(true) => Visibility::Full,
            _ => Visibility::Hide,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn ucsc_name(&self) -> &'static str {
        match self {
            Visibility::Full => "full",
            Visibility::Pack => "pack",
            Visibility::Collapsed => "collapsed",
            Visibility::NoText => "notext",
            Visibility::Dense => "dense",
            Visibility::Hide => "hide",
        }
    }

    pub fn is_visible(&self) -> bool {
        *self > Visibility::Hide
    }
}

///
/// One track of a reference: its settings plus the adapter that owns its
/// data.
///
#[derive(Debug)]
pub struct Track {
    id: String,
    group_id: Option<String>,
    settings: Settings,
    priority: f64,
    adapter: Box<dyn DataAdapter>,
    old_visibility: Option<Visibility>,
}

impl Track {
    pub fn new(
        id: &str,
        settings: Map<String, Value>,
        group_id: Option<&str>,
        adapter: Box<dyn DataAdapter>,
    ) -> Self {
        let mut track = Track {
            id: id.to_string(),
            group_id: group_id.map(str::to_string),
            settings: Settings::from_map(settings),
            priority: DEFAULT_PRIORITY,
            adapter,
            old_visibility: None,
        };
        track.init_settings(true);
        track.settings.snapshot_defaults();
        track
    }

    fn init_settings(&mut self, update_priority: bool) {
        if update_priority {
            self.priority = self
                .settings
                .get_float("priority")
                .filter(|p| p.is_finite())
                .unwrap_or(DEFAULT_PRIORITY);
        }
        if let Some(value) = self.settings.get("visibility") {
            let visibility = Visibility::from_value(value);
            self.settings.set("visibility", visibility.level());
        }
        if self.window_span() > 1 && !self.settings.has("pin") {
            self.settings.set("pin", "inbetween");
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// The ID with underscores shown as spaces.
    pub fn readable_id(&self) -> String {
        self.id
            .split('_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_setting<V: Into<SettingValue>>(&mut self, key: &str, value: V) {
        let value = value.into();
        if key == "visibility" {
            self.set_visibility(Visibility::from_value(&value));
        } else {
            self.settings.set(key, value);
        }
    }

    pub fn set_default_setting<V: Into<SettingValue>>(&mut self, key: &str, value: V) {
        let value = value.into();
        if key == "visibility" {
            let level = Visibility::from_value(&value).level();
            self.settings.set_default(key, level);
        } else {
            self.settings.set_default(key, value);
        }
    }

    /// Restore one setting. The priority keeps its current value.
    pub fn reset_setting(&mut self, key: &str) {
        self.settings.reset(key);
    }

    /// Restore every setting. The priority keeps its current value.
    pub fn reset_all_settings(&mut self) {
        self.settings.reset_all();
        self.init_settings(false);
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: f64) {
        self.priority = priority;
    }

    pub fn visibility(&self) -> Visibility {
        self.settings
            .get("visibility")
            .map(Visibility::from_value)
            .unwrap_or(Visibility::Hide)
    }

    ///
    /// Set the visibility. Hiding remembers the visibility being replaced so
    /// that [Track::toggle_visibility] can bring it back.
    ///
    pub fn set_visibility(&mut self, visibility: Visibility) {
        if visibility.is_visible() {
            self.old_visibility = None;
        } else if self.old_visibility.is_none() {
            self.old_visibility = Some(self.visibility());
        }
        self.settings.set("visibility", visibility.level());
    }

    /// Switch between hidden and the last visible state (`full` if none).
    pub fn toggle_visibility(&mut self, on: bool) {
        if on {
            let restored = self
                .old_visibility
                .take()
                .filter(Visibility::is_visible)
                .unwrap_or(Visibility::Full);
            self.settings.set("visibility", restored.level());
        } else {
            self.set_visibility(Visibility::Hide);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility().is_visible()
    }

    pub fn title(&self) -> String {
        let with_feature = |label: String, feature: &str| {
            let feature = self.settings.get_string(feature);
            if feature.is_empty() {
                label
            } else {
                format!("{} ({})", label, feature)
            }
        };
        let group_type = self.settings.get_string("groupDataType");
        if !group_type.is_empty() {
            return with_feature(group_type, "groupFeature");
        }
        let data_type = self.settings.get_string("dataType");
        if !data_type.is_empty() {
            return with_feature(data_type, "trackFeature");
        }
        self.settings.get_string("shortLabel")
    }

    pub fn type_name(&self) -> String {
        self.settings.get_string("type")
    }

    /// Lowercase first word of the type, e.g. `bigwig` for `bigWig 0 100`.
    pub fn type_trunk(&self) -> String {
        type_trunk(&self.type_name())
    }

    pub fn window_span(&self) -> u32 {
        self.settings
            .get_int("windowSpan")
            .filter(|span| *span > 0)
            .and_then(|span| u32::try_from(span).ok())
            .unwrap_or_else(|| self.adapter.default_window_span())
    }

    pub fn pin(&self) -> Option<String> {
        self.settings
            .get("pin")
            .map(|_| self.settings.get_string("pin"))
    }

    ///
    /// `[group priority, track priority]`; smaller values stack closer to
    /// the top. Missing values sort last.
    ///
    pub fn priorities(&self, reference: &Reference) -> [f64; 2] {
        let group = self
            .group_id
            .as_deref()
            .and_then(|id| reference.group_priority(id))
            .unwrap_or(f64::MAX);
        [group, self.priority]
    }

    pub fn adapter(&self) -> &dyn DataAdapter {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> &mut dyn DataAdapter {
        self.adapter.as_mut()
    }

    pub fn ingest(
        &mut self,
        reference: &Reference,
        response: &Response,
        query_regions: &[Region],
    ) -> TrackResult<IngestReport> {
        self.adapter.ingest(reference, response, query_regions)
    }

    pub fn query(
        &self,
        window: &Region,
        resolution: u32,
        intent: QueryIntent,
    ) -> TrackResult<QueryResult> {
        self.adapter.query(window, resolution, intent)
    }
}

pub fn type_trunk(type_name: &str) -> String {
    type_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    use fxhash::FxHashMap;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    use crate::adapter::NullAdapter;
    use crate::interaction::InteractionAdapter;
    use give_tree::TreeConfig;

    fn settings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("settings must be an object"),
        }
    }

    fn track(value: Value) -> Track {
        Track::new("test_track__one", settings(value), None, Box::new(NullAdapter))
    }

    #[rstest]
    fn test_nested_settings_take_precedence() {
        let settings = Settings::from_map(settings(json!({
            "shortLabel": "outer",
            "type": "bigWig",
            "settings": { "shortLabel": "inner", "color": 3 }
        })));
        assert_eq!(settings.get_string("shortLabel"), "inner");
        assert_eq!(settings.get_int("color"), Some(3));
        assert!(!settings.has("settings"));
    }

    #[rstest]
    #[case(json!("on"), true)]
    #[case(json!("Yes"), true)]
    #[case(json!("T"), true)]
    #[case(json!("off"), false)]
    #[case(json!("nope"), false)]
    #[case(json!(1), true)]
    #[case(json!(0), false)]
    #[case(json!(null), false)]
    fn test_get_bool(#[case] value: Value, #[case] expected: bool) {
        let mut settings = Settings::default();
        settings.set("flag", value);
        assert_eq!(settings.get_bool("flag"), expected);
    }

    #[rstest]
    fn test_typed_getters() {
        let settings = Settings::from_map(settings(json!({
            "height": "42.7",
            "scale": "0.5",
            "label": 12
        })));
        assert_eq!(settings.get_int("height"), Some(42));
        assert_eq!(settings.get_float("scale"), Some(0.5));
        assert_eq!(settings.get_string("label"), "12");
        assert_eq!(settings.get_string("missing"), "");
        assert_eq!(settings.get_int("missing"), None);
    }

    #[rstest]
    fn test_reset_restores_or_drops() {
        let mut track = track(json!({ "color": "red" }));
        track.set_setting("color", "blue");
        track.set_setting("extra", 1);
        track.reset_setting("color");
        track.reset_setting("extra");
        assert_eq!(track.settings().get_string("color"), "red");
        assert!(!track.settings().has("extra"));

        track.set_default_setting("color", "green");
        track.reset_setting("color");
        assert_eq!(track.settings().get_string("color"), "green");
    }

    #[rstest]
    fn test_reset_all_keeps_priority() {
        let mut track = track(json!({ "priority": 5, "color": "red" }));
        assert_eq!(track.priority(), 5.0);
        track.set_priority(1.0);
        track.set_setting("color", "blue");
        track.reset_all_settings();
        assert_eq!(track.priority(), 1.0);
        assert_eq!(track.settings().get_string("color"), "red");
    }

    #[rstest]
    #[case(json!("full"), Visibility::Full)]
    #[case(json!("PACK"), Visibility::Pack)]
    #[case(json!("notext"), Visibility::NoText)]
    #[case(json!("sideways"), Visibility::Hide)]
    #[case(json!(3), Visibility::Collapsed)]
    #[case(json!("1"), Visibility::Dense)]
    #[case(json!(17), Visibility::Hide)]
    #[case(json!(true), Visibility::Full)]
    fn test_visibility_values(#[case] value: Value, #[case] expected: Visibility) {
        assert_eq!(Visibility::from_value(&value), expected);
    }

    #[rstest]
    fn test_visibility_toggle_remembers_state() {
        let mut track = track(json!({ "visibility": "dense" }));
        assert_eq!(track.visibility(), Visibility::Dense);
        assert_eq!(track.settings().get("visibility"), Some(&json!(1)));

        track.toggle_visibility(false);
        assert!(!track.is_visible());
        track.toggle_visibility(true);
        assert_eq!(track.visibility(), Visibility::Dense);

        track.set_setting("visibility", "hide");
        track.toggle_visibility(true);
        assert_eq!(track.visibility(), Visibility::Dense);

        let mut fresh = self::track(json!({}));
        fresh.toggle_visibility(true);
        assert_eq!(fresh.visibility(), Visibility::Full);
    }

    #[rstest]
    #[case(json!({ "groupDataType": "ChIP-Seq", "groupFeature": "H3K4me3", "dataType": "x" }), "ChIP-Seq (H3K4me3)")]
    #[case(json!({ "dataType": "RNA-Seq", "trackFeature": "plus" }), "RNA-Seq (plus)")]
    #[case(json!({ "dataType": "RNA-Seq" }), "RNA-Seq")]
    #[case(json!({ "shortLabel": "Genes" }), "Genes")]
    #[case(json!({}), "")]
    fn test_title(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(track(value).title(), expected);
    }

    #[rstest]
    fn test_type_and_ids() {
        let track = track(json!({ "type": "bigWig 0 100" }));
        assert_eq!(track.type_trunk(), "bigwig");
        assert_eq!(track.readable_id(), "test track one");
    }

    #[rstest]
    fn test_multi_window_tracks_pin_between() {
        let interaction = Track::new(
            "links",
            settings(json!({ "type": "interaction" })),
            None,
            Box::new(InteractionAdapter::new(&TreeConfig::default())),
        );
        assert_eq!(interaction.window_span(), 2);
        assert_eq!(interaction.pin().as_deref(), Some("inbetween"));

        let pinned = Track::new(
            "links_top",
            settings(json!({ "type": "interaction", "pin": "top" })),
            None,
            Box::new(InteractionAdapter::new(&TreeConfig::default())),
        );
        assert_eq!(pinned.pin().as_deref(), Some("top"));
        assert_eq!(track(json!({})).pin(), None);
    }

    #[rstest]
    fn test_priorities() {
        let mut chromosomes = FxHashMap::default();
        chromosomes.insert("chr1".to_string(), 1000);
        let mut reference = Reference::new("test", chromosomes);
        reference.add_group("genes", 2.0);

        let grouped = Track::new("a", Map::new(), Some("genes"), Box::new(NullAdapter));
        let loose = Track::new("b", settings(json!({ "priority": "7" })), None, Box::new(NullAdapter));
        assert_eq!(grouped.priorities(&reference), [2.0, DEFAULT_PRIORITY]);
        assert_eq!(loose.priorities(&reference), [f64::MAX, 7.0]);
    }
}
