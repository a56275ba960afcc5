use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;
use serde_json::{Value, json};

use give_core::errors::RegionError;
use give_core::models::{Reference, Region};
use give_tree::{
    EntryData, EntryIdentity, OakTree, SignalSummary, SummaryCtor, TreeConfig, TreeRecord, TreeType,
};

use crate::adapter::{
    ChromTrees, DataAdapter, EntryValue, QueryIntent, QueryResult, TrackEntry, decode_response,
};
use crate::errors::{IngestReport, TrackResult};
use crate::track::Settings;
use crate::utils::{quantile, sorted_finite};
use crate::wire::{InteractionEntry, Response};

///
/// One end of a link between two genomic regions.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionData {
    pub link_id: u32,
    pub region_id: Option<u32>,
    pub value: Option<f64>,
    /// Which window the end belongs to, when known.
    pub dir_flag: Option<u32>,
}

impl EntryIdentity for InteractionData {
    fn same_entry(&self, other: &Self) -> bool {
        self.link_id == other.link_id && self.region_id == other.region_id
    }
}

pub type InteractionTree = OakTree<InteractionData>;

/// Threshold applied when a track sets none.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Steps of the value distribution a percentile threshold is resolved on.
const THRESHOLD_STEPS: usize = 100;

fn end_region(tokens: &[&str]) -> Result<Region, RegionError> {
    format!("{}:{}-{}({})", tokens[0], tokens[1], tokens[2], tokens[3]).parse()
}

///
/// Convert a plain-text interaction file into a response.
///
/// Every line holds the two ends of one link as `chr start end strand`
/// quadruplets. The line number is the link ID. A link is kept when its
/// first end overlaps `regions[0]` or its second end overlaps `regions[1]`.
///
pub fn parse_interaction_lines(text: &str, regions: &[Region]) -> Response {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for (line_index, line) in text.lines().enumerate() {
        let link_id = line_index + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 8 {
            warn!("Skipping line {}: expected 8 columns, found {}", link_id, tokens.len());
            continue;
        }
        let ends = match (end_region(&tokens[0..4]), end_region(&tokens[4..8])) {
            (Ok(first), Ok(second)) => [first, second],
            (Err(err), _) | (_, Err(err)) => {
                warn!("Skipping line {}: {}", link_id, err);
                continue;
            }
        };

        let wanted = ends
            .iter()
            .enumerate()
            .any(|(index, end)| regions.get(index).is_some_and(|query| end.overlaps(query) > 0));
        if !wanted {
            continue;
        }
        for (index, end) in ends.iter().enumerate() {
            grouped.entry(end.chr.clone()).or_default().push(json!({
                "regionString": end.to_string(),
                "linkID": link_id,
                "dirFlag": index,
            }));
        }
    }

    grouped
        .into_iter()
        .map(|(chr, entries)| (chr, Value::Array(entries)))
        .collect()
}

///
/// Relative rank of `value` among `quantiles` (ascending cut points), from 0
/// to 1.
///
pub fn value_to_percentile(quantiles: &[f64], value: f64) -> Option<f64> {
    if quantiles.len() < 2 {
        return None;
    }
    let rank = quantiles
        .iter()
        .position(|cut| *cut >= value)
        .unwrap_or(quantiles.len() - 1);
    Some(rank as f64 / (quantiles.len() - 1) as f64)
}

///
/// Whether a link value passes `threshold`. With quantiles the threshold is
/// a percentage of the value distribution, otherwise a raw value. Links
/// without a value always pass.
///
pub fn is_above_threshold(value: Option<f64>, threshold: f64, quantiles: Option<&[f64]>) -> bool {
    let Some(value) = value else {
        return true;
    };
    match quantiles.and_then(|q| value_to_percentile(q, value)) {
        Some(percentile) => percentile >= threshold / 100.0,
        None => value >= threshold,
    }
}

///
/// Data adapter for interaction (link) tracks.
///
#[derive(Debug, Clone)]
pub struct InteractionAdapter {
    trees: ChromTrees<InteractionTree>,
}

impl InteractionAdapter {
    pub fn new(config: &TreeConfig) -> Self {
        InteractionAdapter {
            trees: ChromTrees::new(config),
        }
    }

    pub fn tree(&self, chr: &str) -> Option<&InteractionTree> {
        self.trees.get(chr)
    }

    fn entries(&self, window: &Region) -> TrackResult<Vec<TrackEntry>> {
        let Some(tree) = self.trees.get(&window.chr) else {
            return Ok(Vec::new());
        };
        Ok(tree
            .iter(window)?
            .filter_map(|entry| match entry.data {
                EntryData::Raw(data) => Some(TrackEntry {
                    region: entry.region(&window.chr),
                    value: EntryValue::Interaction(data.clone()),
                }),
                EntryData::Summary(_) => None,
            })
            .collect())
    }

    ///
    /// Cached link ends within `windows`, grouped by link ID. Ends seen in
    /// more than one window are listed once.
    ///
    pub fn link_map(&self, windows: &[Region]) -> TrackResult<BTreeMap<u32, Vec<TrackEntry>>> {
        let mut links: BTreeMap<u32, Vec<TrackEntry>> = BTreeMap::new();
        for window in windows {
            for entry in self.entries(window)? {
                let EntryValue::Interaction(data) = &entry.value else {
                    continue;
                };
                let ends = links.entry(data.link_id).or_default();
                if !ends.contains(&entry) {
                    ends.push(entry);
                }
            }
        }
        Ok(links)
    }

    ///
    /// `count + 1` evenly spaced quantiles of the link values in `windows`,
    /// from minimum to maximum. Empty when no values are cached.
    ///
    pub fn value_quantiles(&self, windows: &[Region], count: usize) -> TrackResult<Vec<f64>> {
        let mut values = Vec::new();
        for window in windows {
            values.extend(self.entries(window)?.into_iter().filter_map(|entry| {
                match entry.value {
                    EntryValue::Interaction(data) => data.value,
                    _ => None,
                }
            }));
        }
        let sorted = sorted_finite(values);
        let count = count.max(1);
        Ok((0..=count)
            .filter_map(|i| quantile(&sorted, i as f64 / count as f64))
            .collect())
    }

    ///
    /// Quantiles a track's threshold is a percentage of: the `quantiles`
    /// setting when the track carries one, the cached values in `windows`
    /// with `thresholdPercentile`, otherwise none and the threshold is a raw
    /// value.
    ///
    pub fn threshold_quantiles(
        &self,
        settings: &Settings,
        windows: &[Region],
    ) -> TrackResult<Option<Vec<f64>>> {
        if let Some(Value::Array(cuts)) = settings.get("quantiles") {
            let cuts: Vec<f64> = cuts.iter().filter_map(Value::as_f64).collect();
            if cuts.len() >= 2 {
                return Ok(Some(cuts));
            }
            warn!("Ignoring a quantiles setting with fewer than two values");
        }
        if settings.get_bool("thresholdPercentile") {
            return Ok(Some(self.value_quantiles(windows, THRESHOLD_STEPS)?));
        }
        Ok(None)
    }

    ///
    /// The links of [InteractionAdapter::link_map] whose ends all pass
    /// `threshold`.
    ///
    pub fn links_above(
        &self,
        windows: &[Region],
        threshold: f64,
        quantiles: Option<&[f64]>,
    ) -> TrackResult<BTreeMap<u32, Vec<TrackEntry>>> {
        let mut links = self.link_map(windows)?;
        links.retain(|_, ends| {
            ends.iter().all(|end| match &end.value {
                EntryValue::Interaction(data) => is_above_threshold(data.value, threshold, quantiles),
                _ => true,
            })
        });
        Ok(links)
    }
}

impl DataAdapter for InteractionAdapter {
    fn tree_type(&self) -> TreeType {
        TreeType::Oak
    }

    fn ingest(
        &mut self,
        reference: &Reference,
        response: &Response,
        query_regions: &[Region],
    ) -> TrackResult<IngestReport> {
        let mut report = IngestReport::default();
        let decoded = decode_response(reference, response, &mut report, |value| {
            let entry = InteractionEntry::try_from(value).map_err(|e| e.to_string())?;
            let data = InteractionData {
                link_id: entry.link_id,
                region_id: entry.region_id,
                value: entry.value,
                dir_flag: entry.dir_flag,
            };
            let record = TreeRecord::raw(entry.region.start, entry.region.end, data);
            Ok((entry.region, record))
        })?;

        self.trees
            .insert_batch(reference, decoded, query_regions, &mut report)?;
        Ok(report)
    }

    fn query(
        &self,
        window: &Region,
        resolution: u32,
        intent: QueryIntent,
    ) -> TrackResult<QueryResult> {
        let uncached = self.trees.uncached_ranges(window, resolution)?;
        if !uncached.is_empty() {
            return Ok(QueryResult::NotFetched(uncached));
        }
        let entries = self.entries(window)?;
        Ok(match intent {
            QueryIntent::Entries => QueryResult::Entries(entries),
            QueryIntent::Summary => {
                let mut summary = SignalSummary::default();
                for entry in &entries {
                    if let EntryValue::Interaction(InteractionData {
                        value: Some(value), ..
                    }) = &entry.value
                    {
                        summary.add_data(entry.region.overlaps(window), value);
                    }
                }
                QueryResult::Summary(summary)
            }
        })
    }

    fn uncached_ranges(&self, window: &Region, resolution: u32) -> TrackResult<Vec<Region>> {
        self.trees.uncached_ranges(window, resolution)
    }

    fn default_window_span(&self) -> u32 {
        2
    }

    fn as_interaction(&self) -> Option<&InteractionAdapter> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fxhash::FxHashMap;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn reference() -> Reference {
        let mut chromosomes = FxHashMap::default();
        chromosomes.insert("chr1".to_string(), 100_000);
        chromosomes.insert("chr2".to_string(), 100_000);
        Reference::new("test", chromosomes)
    }

    #[fixture]
    fn adapter(reference: Reference) -> InteractionAdapter {
        let mut adapter = InteractionAdapter::new(&TreeConfig::default());
        let response = json!({
            "chr1:0-10000": [
                { "regionString": "chr1:100-200", "linkID": 1, "ID": 1, "value": 5.0, "dirFlag": 0 },
                { "regionString": "chr1:5000-5100", "linkID": 1, "ID": 2, "value": 5.0, "dirFlag": 1 },
                { "regionString": "chr1:300-400", "linkID": 2, "ID": 3, "value": 1.0 },
                { "regionString": "chr1:300-400", "ID": 4 }
            ]
        });
        let report = adapter
            .ingest(
                &reference,
                response.as_object().unwrap(),
                &["chr1:0-10000".parse().unwrap()],
            )
            .unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(report.warnings.len(), 1);
        adapter
    }

    #[rstest]
    fn test_query_entries(adapter: InteractionAdapter) {
        let window: Region = "chr1:150-350".parse().unwrap();
        match adapter.query(&window, 1, QueryIntent::Entries).unwrap() {
            QueryResult::Entries(entries) => {
                let ids: Vec<u32> = entries
                    .iter()
                    .filter_map(|e| match &e.value {
                        EntryValue::Interaction(data) => Some(data.link_id),
                        _ => None,
                    })
                    .collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let outside: Region = "chr1:20000-30000".parse().unwrap();
        assert!(!adapter.query(&outside, 1, QueryIntent::Entries).unwrap().is_fetched());
    }

    #[rstest]
    fn test_link_map(adapter: InteractionAdapter) {
        let windows: Vec<Region> = vec!["chr1:0-1000".parse().unwrap(), "chr1:4000-6000".parse().unwrap()];
        let links = adapter.link_map(&windows).unwrap();
        assert_eq!(links[&1].len(), 2);
        assert_eq!(links[&2].len(), 1);
    }

    #[rstest]
    fn test_reingest_replaces_same_link(reference: Reference, mut adapter: InteractionAdapter) {
        let response = json!({
            "chr1:0-1000": [
                { "regionString": "chr1:100-200", "linkID": 1, "ID": 1, "value": 9.0 }
            ]
        });
        adapter
            .ingest(&reference, response.as_object().unwrap(), &["chr1:0-1000".parse().unwrap()])
            .unwrap();
        assert_eq!(adapter.tree("chr1").unwrap().len(), 3);
        let quantiles = adapter
            .value_quantiles(&["chr1:0-10000".parse().unwrap()], 2)
            .unwrap();
        assert_eq!(quantiles, vec![1.0, 5.0, 9.0]);
    }

    #[rstest]
    #[case(json!({}), 2.0, vec![1])]
    #[case(json!({ "thresholdPercentile": true }), 20.0, vec![1])]
    #[case(json!({ "thresholdPercentile": true }), 0.0, vec![1, 2])]
    #[case(json!({ "quantiles": [0.0, 10.0] }), 50.0, vec![1, 2])]
    fn test_links_above(
        adapter: InteractionAdapter,
        #[case] settings: Value,
        #[case] threshold: f64,
        #[case] expected: Vec<u32>,
    ) {
        let settings = Settings::from_map(settings.as_object().unwrap().clone());
        let windows: Vec<Region> = vec!["chr1:0-10000".parse().unwrap()];
        let quantiles = adapter.threshold_quantiles(&settings, &windows).unwrap();
        let links = adapter
            .links_above(&windows, threshold, quantiles.as_deref())
            .unwrap();
        assert_eq!(links.keys().copied().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case(0.5, Some(0.5))]
    #[case(1.0, Some(0.5))]
    #[case(2.5, Some(1.0))]
    #[case(-1.0, Some(0.0))]
    fn test_value_to_percentile(#[case] value: f64, #[case] expected: Option<f64>) {
        assert_eq!(value_to_percentile(&[0.0, 1.0, 2.0], value), expected);
    }

    #[rstest]
    fn test_threshold() {
        let quantiles = [0.0, 1.0, 2.0];
        assert!(is_above_threshold(Some(2.0), 50.0, Some(&quantiles)));
        assert!(!is_above_threshold(Some(0.0), 50.0, Some(&quantiles)));
        assert!(is_above_threshold(Some(0.2), 0.1, None));
        assert!(is_above_threshold(None, 99.0, None));
    }

    #[rstest]
    fn test_parse_interaction_lines(reference: Reference) {
        let text = "chr1 100 200 + chr2 300 400 -\n\nchr1 9000 9100 + chr1 50 60 .\nbroken line\n";
        let regions: Vec<Region> = vec!["chr1:0-1000".parse().unwrap(), "chr1:0-1000".parse().unwrap()];
        let response = parse_interaction_lines(text, &regions);

        assert_eq!(response["chr1"].as_array().unwrap().len(), 3);
        assert_eq!(response["chr2"].as_array().unwrap().len(), 1);
        assert_eq!(response["chr2"][0]["linkID"], json!(1));
        assert_eq!(response["chr2"][0]["dirFlag"], json!(1));

        let mut adapter = InteractionAdapter::new(&TreeConfig::default());
        let report = adapter.ingest(&reference, &response, &regions).unwrap();
        assert_eq!(report.inserted, 4);
        assert!(report.is_clean());
    }
}
