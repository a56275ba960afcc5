use std::collections::BTreeMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;

use fxhash::FxHashMap;
use log::debug;
use serde::Serialize;
use serde_json::Value;

use give_core::models::{ChromSizes, Reference, Region};
use give_core::errors::ReferenceError;
use give_tree::{GiveTree, SignalSummary, TreeConfig, TreeRecord, TreeType};

use crate::bigwig::BigWigAdapter;
use crate::errors::{IngestReport, IngestWarning, TrackResult};
use crate::interaction::{InteractionAdapter, InteractionData};
use crate::wire::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// Every entry overlapping the window, at the requested resolution.
    Entries,
    /// One summary over the window.
    Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryValue {
    Signal { value: f64 },
    Summary(SignalSummary),
    Interaction(InteractionData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackEntry {
    pub region: Region,
    pub value: EntryValue,
}

///
/// Outcome of a query. A window that was never ingested is `NotFetched`,
/// which is different from a fetched window without entries.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum QueryResult {
    NotFetched(Vec<Region>),
    Entries(Vec<TrackEntry>),
    Summary(SignalSummary),
}

impl QueryResult {
    pub fn is_fetched(&self) -> bool {
        !matches!(self, QueryResult::NotFetched(_))
    }
}

///
/// Caches and answers queries for the data of one track.
///
pub trait DataAdapter: Debug + Send {
    fn tree_type(&self) -> TreeType;

    ///
    /// Store the entries of `response`. `query_regions` are the regions the
    /// response answers; they count as fetched afterwards.
    ///
    /// Malformed entries are skipped and reported. Only tree failures and a
    /// reference that is not ready abort the call.
    ///
    fn ingest(
        &mut self,
        reference: &Reference,
        response: &Response,
        query_regions: &[Region],
    ) -> TrackResult<IngestReport>;

    fn query(
        &self,
        window: &Region,
        resolution: u32,
        intent: QueryIntent,
    ) -> TrackResult<QueryResult>;

    /// Parts of `window` that still need to be requested.
    fn uncached_ranges(&self, window: &Region, resolution: u32) -> TrackResult<Vec<Region>>;

    /// Number of view windows a track of this kind spans by default.
    fn default_window_span(&self) -> u32 {
        1
    }

    fn as_bigwig(&self) -> Option<&BigWigAdapter> {
        None
    }

    fn as_interaction(&self) -> Option<&InteractionAdapter> {
        None
    }
}

///
/// Lazily created per-chromosome trees of one track.
///
#[derive(Debug, Clone)]
pub struct ChromTrees<Tr> {
    trees: FxHashMap<String, Tr>,
    config: TreeConfig,
}

impl<Tr: GiveTree> ChromTrees<Tr> {
    pub fn new(config: &TreeConfig) -> Self {
        ChromTrees {
            trees: FxHashMap::default(),
            config: config.normalized(),
        }
    }

    pub fn get(&self, chr: &str) -> Option<&Tr> {
        self.trees.get(chr)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    ///
    /// The tree of `chr`, created to span the whole chromosome on first use.
    ///
    pub fn get_or_create(&mut self, chr: &str, reference: &Reference) -> TrackResult<&mut Tr> {
        match self.trees.entry(chr.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let (start, end) = reference.chrom_range(chr)?;
                debug!("Creating tree for {}:{}-{}", chr, start, end);
                Ok(entry.insert(Tr::with_span(chr, start, end, &self.config)))
            }
        }
    }

    pub fn uncached_ranges(&self, window: &Region, resolution: u32) -> TrackResult<Vec<Region>> {
        match self.trees.get(&window.chr) {
            Some(tree) => Ok(tree.uncached_ranges(window, resolution)?),
            None if window.is_empty() => Ok(Vec::new()),
            None => Ok(vec![window.clone()]),
        }
    }

    ///
    /// Insert records grouped by chromosome, together with the query regions
    /// on each chromosome. Chromosomes the reference does not know are
    /// reported and skipped.
    ///
    pub fn insert_batch(
        &mut self,
        reference: &Reference,
        mut records: BTreeMap<String, Vec<TreeRecord<Tr::Data, Tr::Summary>>>,
        query_regions: &[Region],
        report: &mut IngestReport,
    ) -> TrackResult<()> {
        for region in query_regions {
            records.entry(region.chr.clone()).or_default();
        }

        for (chr, batch) in records {
            let tree = match self.get_or_create(&chr, reference) {
                Ok(tree) => tree,
                Err(crate::errors::TrackError::Reference(ReferenceError::UnknownChromosome {
                    ..
                })) => {
                    report.warn(IngestWarning::UnknownChromosome { chr });
                    continue;
                }
                Err(err) => return Err(err),
            };
            let covering: Vec<Region> = query_regions
                .iter()
                .filter(|region| region.chr == chr)
                .cloned()
                .collect();
            report.inserted += tree.insert(batch, &covering)?;
        }
        Ok(())
    }
}

///
/// Walk a response and decode each entry with `decode`, collecting the
/// results by chromosome. Undecodable entries and entries on chromosomes the
/// reference does not know become warnings.
///
pub fn decode_response<E, F>(
    reference: &Reference,
    response: &Response,
    report: &mut IngestReport,
    mut decode: F,
) -> TrackResult<BTreeMap<String, Vec<E>>>
where
    F: FnMut(&Value) -> Result<(Region, E), String>,
{
    if !reference.is_ready() {
        return Err(ReferenceError::NotReady(reference.db.clone()).into());
    }

    let mut decoded: BTreeMap<String, Vec<E>> = BTreeMap::new();
    for (key, entries) in response {
        let Some(entries) = entries.as_array() else {
            report.warn(IngestWarning::NotAList { key: key.clone() });
            continue;
        };
        for (index, value) in entries.iter().enumerate() {
            let (region, entry) = match decode(value) {
                Ok(decoded) => decoded,
                Err(reason) => {
                    report.warn(IngestWarning::BadEntry {
                        key: key.clone(),
                        index,
                        reason,
                    });
                    continue;
                }
            };
            if reference.chrom_range(&region.chr).is_err() {
                report.warn(IngestWarning::UnknownChromosome {
                    chr: region.chr.clone(),
                });
                continue;
            }
            decoded.entry(region.chr).or_default().push(entry);
        }
    }
    Ok(decoded)
}

///
/// Adapter for track types without data of their own.
///
#[derive(Debug, Clone, Default)]
pub struct NullAdapter;

impl DataAdapter for NullAdapter {
    fn tree_type(&self) -> TreeType {
        TreeType::Oak
    }

    fn ingest(
        &mut self,
        _reference: &Reference,
        response: &Response,
        _query_regions: &[Region],
    ) -> TrackResult<IngestReport> {
        debug!("Ignoring {} response keys for a track without data", response.len());
        Ok(IngestReport::default())
    }

    fn query(
        &self,
        _window: &Region,
        _resolution: u32,
        intent: QueryIntent,
    ) -> TrackResult<QueryResult> {
        Ok(match intent {
            QueryIntent::Entries => QueryResult::Entries(Vec::new()),
            QueryIntent::Summary => QueryResult::Summary(SignalSummary::default()),
        })
    }

    fn uncached_ranges(&self, _window: &Region, _resolution: u32) -> TrackResult<Vec<Region>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fxhash::FxHashMap;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    use crate::errors::TrackError;
    use give_tree::PineTree;

    #[fixture]
    fn reference() -> Reference {
        let mut chromosomes = FxHashMap::default();
        chromosomes.insert("chr1".to_string(), 1000);
        Reference::new("test", chromosomes)
    }

    fn decode_value(value: &Value) -> Result<(Region, f64), String> {
        let region: Region = value["regionString"]
            .as_str()
            .ok_or("no region")?
            .parse()
            .map_err(|e: give_core::RegionError| e.to_string())?;
        Ok((region, value["value"].as_f64().ok_or("no value")?))
    }

    #[rstest]
    fn test_decode_response_skips_bad_entries(reference: Reference) {
        let response = json!({
            "chr1:0-100": [
                { "regionString": "chr1:0-10", "value": 1.0 },
                { "regionString": "chr1:10-20" },
                { "regionString": "chrUn:0-10", "value": 1.0 }
            ],
            "chr1:100-200": "nothing"
        });
        let mut report = IngestReport::default();
        let decoded = decode_response(
            &reference,
            response.as_object().unwrap(),
            &mut report,
            decode_value,
        )
        .unwrap();

        assert_eq!(decoded["chr1"], vec![1.0]);
        assert_eq!(report.warnings.len(), 3);
    }

    #[rstest]
    fn test_decode_response_needs_ready_reference() {
        let mut report = IngestReport::default();
        let result = decode_response(
            &Reference::pending("hg38"),
            &Response::new(),
            &mut report,
            decode_value,
        );
        assert!(matches!(
            result,
            Err(TrackError::Reference(ReferenceError::NotReady(_)))
        ));
    }

    #[rstest]
    fn test_trees_are_created_lazily(reference: Reference) {
        let mut trees: ChromTrees<PineTree<f64, SignalSummary>> =
            ChromTrees::new(&TreeConfig::default());
        let window = Region::new("chr1", 0, 100);
        assert_eq!(trees.uncached_ranges(&window, 1).unwrap(), vec![window.clone()]);
        assert!(trees.is_empty());

        let mut report = IngestReport::default();
        trees
            .insert_batch(&reference, BTreeMap::new(), &[window.clone()], &mut report)
            .unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees.get("chr1").unwrap().span(), (0, 1000));
        assert_eq!(trees.uncached_ranges(&window, 1).unwrap(), vec![]);
    }

    #[rstest]
    fn test_unknown_query_chromosome_is_reported(reference: Reference) {
        let mut trees: ChromTrees<PineTree<f64, SignalSummary>> =
            ChromTrees::new(&TreeConfig::default());
        let mut report = IngestReport::default();
        trees
            .insert_batch(
                &reference,
                BTreeMap::new(),
                &[Region::new("chrZ", 0, 100)],
                &mut report,
            )
            .unwrap();
        assert!(trees.is_empty());
        assert_eq!(
            report.warnings,
            vec![IngestWarning::UnknownChromosome {
                chr: "chrZ".to_string()
            }]
        );
    }

    #[rstest]
    fn test_null_adapter(reference: Reference) {
        let mut adapter = NullAdapter;
        let report = adapter
            .ingest(&reference, &Response::new(), &[])
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(
            adapter
                .query(&Region::new("chr1", 0, 10), 1, QueryIntent::Entries)
                .unwrap(),
            QueryResult::Entries(vec![])
        );
    }
}
