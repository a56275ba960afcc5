use serde::Serialize;

use give_core::models::{ChromSizes, ExtendDirection, Extension, Reference, Region};
use give_tree::{EntryData, PineTree, SignalSummary, SummaryCtor, TreeConfig, TreeRecord, TreeType};

use crate::adapter::{
    ChromTrees, DataAdapter, EntryValue, QueryIntent, QueryResult, TrackEntry, decode_response,
};
use crate::errors::{IngestReport, TrackResult};
use crate::track::Settings;
use crate::utils::{quantile, sorted_finite};
use crate::wire::{DataPayload, Response, SignalEntry};

pub type SignalTree = PineTree<f64, SignalSummary>;

///
/// One bin of a rebinned signal.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalPoint {
    pub start: u32,
    pub end: u32,
    pub value: f64,
}

impl SignalPoint {
    fn overlap(&self, start: u32, end: u32) -> u32 {
        self.end.min(end).saturating_sub(self.start.max(start))
    }
}

///
/// Number of bases one data point should cover so that a window of
/// `window_len` bases drawn `width_px` pixels wide gets at least
/// `min_resolution_per_pixel` pixels per point.
///
pub fn resolution_for(window_len: u32, width_px: u32, min_resolution_per_pixel: u32) -> u32 {
    let per_pixel = width_px.max(1) as u64 * min_resolution_per_pixel.max(1) as u64;
    ((window_len as u64 / per_pixel) as u32).max(1)
}

///
/// Display range for `values`, taken from the `lower_prop` and `upper_prop`
/// quantiles. With `include_zero` the range always contains 0. Falls back to
/// `(0, 1)` when no proper range can be found.
///
pub fn auto_scale(
    values: &[f64],
    upper_prop: f64,
    lower_prop: f64,
    include_zero: bool,
) -> (f64, f64) {
    let (mut min, mut max) = if include_zero {
        (0.0, 0.0)
    } else {
        (f64::INFINITY, f64::NEG_INFINITY)
    };
    let sorted = sorted_finite(values.iter().copied());
    if let (Some(lower), Some(upper)) =
        (quantile(&sorted, lower_prop), quantile(&sorted, upper_prop))
    {
        max = max.max(upper);
        min = min.min(lower);
    }
    if max > min { (min, max) } else { (0.0, 1.0) }
}

///
/// How a signal track turns cached data into points, read from its
/// settings.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDisplay {
    pub min_resolution_per_pixel: u32,
    /// Bins averaged on each side of a point. 0 draws the rebinned signal.
    pub half_width: u32,
    pub auto_scale: bool,
    pub include_zero: bool,
    /// Share of the values allowed above the upper display bound.
    pub upper_proportion: f64,
    /// Share of the values allowed below the lower display bound.
    pub lower_proportion: f64,
}

impl Default for SignalDisplay {
    fn default() -> Self {
        SignalDisplay {
            min_resolution_per_pixel: 1,
            half_width: 5,
            auto_scale: true,
            include_zero: true,
            upper_proportion: 0.1,
            lower_proportion: 0.1,
        }
    }
}

impl SignalDisplay {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = SignalDisplay::default();
        let flag = |key: &str, default: bool| match settings.has(key) {
            true => settings.get_bool(key),
            false => default,
        };
        let count = |key: &str, default: u32| {
            settings
                .get_int(key)
                .map_or(default, |value| value.clamp(0, u32::MAX as i64) as u32)
        };
        let proportion = |key: &str, default: f64| {
            settings
                .get_float(key)
                .map_or(default, |value| value.clamp(0.0, 1.0))
        };
        SignalDisplay {
            min_resolution_per_pixel: count("minResolutionPerPixel", defaults.min_resolution_per_pixel),
            half_width: count("slidingWindowHalfWidth", defaults.half_width),
            auto_scale: flag("autoScale", defaults.auto_scale),
            include_zero: flag("includeZero", defaults.include_zero),
            upper_proportion: proportion("upperProportion", defaults.upper_proportion),
            lower_proportion: proportion("lowerProportion", defaults.lower_proportion),
        }
    }
}

///
/// The points of one window as a signal track draws them.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    pub resolution: u32,
    pub points: Vec<SignalPoint>,
    /// `(min, max)` display range, present when the track scales itself.
    pub scale: Option<(f64, f64)>,
}

///
/// Data adapter for continuous signal tracks.
///
#[derive(Debug, Clone)]
pub struct BigWigAdapter {
    trees: ChromTrees<SignalTree>,
}

impl BigWigAdapter {
    pub fn new(config: &TreeConfig) -> Self {
        BigWigAdapter {
            trees: ChromTrees::new(config),
        }
    }

    pub fn tree(&self, chr: &str) -> Option<&SignalTree> {
        self.trees.get(chr)
    }

    fn entries(&self, window: &Region, resolution: u32) -> TrackResult<Vec<(u32, u32, f64)>> {
        let Some(tree) = self.trees.get(&window.chr) else {
            return Ok(Vec::new());
        };
        Ok(tree
            .iter(window, resolution)?
            .map(|entry| {
                let value = match entry.data {
                    EntryData::Raw(value) => *value,
                    EntryData::Summary(summary) => summary.value(),
                };
                (entry.start, entry.end, value)
            })
            .collect())
    }

    ///
    /// Rebin the cached signal in `window` into consecutive bins of
    /// `resolution` bases starting at `window.start`. Values are split by
    /// overlap, and bins without data are 0.
    ///
    pub fn raw_points(&self, window: &Region, resolution: u32) -> TrackResult<Vec<SignalPoint>> {
        let span = resolution.max(1);
        let mut points: Vec<SignalPoint> = Vec::new();

        for (start, end, value) in self.entries(window, span)? {
            let mut cursor = window.start;
            if let Some(last) = points.last_mut() {
                let overlap = last.overlap(start, end);
                if overlap > 0 {
                    last.value += value * overlap as f64 / (last.end - last.start) as f64;
                }
                cursor = last.end;
            }
            while cursor < end && cursor < window.end {
                let mut point = SignalPoint {
                    start: cursor,
                    end: cursor + span,
                    value: 0.0,
                };
                point.value = value * point.overlap(start, end) as f64 / span as f64;
                points.push(point);
                cursor += span;
            }
        }

        let mut last_end = points.last().map_or(window.start, |point| point.end);
        while last_end < window.end {
            points.push(SignalPoint {
                start: last_end,
                end: last_end + span,
                value: 0.0,
            });
            last_end += span;
        }
        Ok(points)
    }

    ///
    /// Rebinned signal smoothed by a sliding mean over `half_width` bins on
    /// each side. Bins near the edge average over what is available.
    ///
    pub fn smoothed_points(
        &self,
        window: &Region,
        resolution: u32,
        half_width: u32,
        reference: Option<&Reference>,
    ) -> TrackResult<Vec<SignalPoint>> {
        let span = resolution.max(1);
        let padding = span as i64 * half_width as i64;
        let mut extended = window.extension(
            Extension::Bases(padding * 2),
            ExtendDirection::Both,
            reference.map(|r| r as &dyn ChromSizes),
        )?;
        // keep the bins aligned with the window
        let shift = (window.start - extended.start) % span;
        extended.start += shift;

        let raw = self.raw_points(&extended, span)?;
        let half = half_width as usize;
        let smoothed = raw
            .iter()
            .enumerate()
            .filter(|(_, point)| point.end > window.start && point.start < window.end)
            .map(|(index, point)| {
                let from = index.saturating_sub(half);
                let to = (index + half + 1).min(raw.len());
                let sum: f64 = raw[from..to].iter().map(|p| p.value).sum();
                SignalPoint {
                    value: sum / (to - from) as f64,
                    ..*point
                }
            })
            .collect();
        Ok(smoothed)
    }

    ///
    /// Points for `window` drawn `width_px` pixels wide.
    ///
    pub fn view(
        &self,
        window: &Region,
        width_px: u32,
        display: &SignalDisplay,
        reference: Option<&Reference>,
    ) -> TrackResult<SignalView> {
        let resolution = resolution_for(window.len(), width_px, display.min_resolution_per_pixel);
        let points = match display.half_width {
            0 => self.raw_points(window, resolution)?,
            half_width => self.smoothed_points(window, resolution, half_width, reference)?,
        };
        let scale = display.auto_scale.then(|| {
            let values: Vec<f64> = points.iter().map(|point| point.value).collect();
            auto_scale(
                &values,
                1.0 - display.upper_proportion,
                display.lower_proportion,
                display.include_zero,
            )
        });
        Ok(SignalView {
            resolution,
            points,
            scale,
        })
    }
}

impl DataAdapter for BigWigAdapter {
    fn tree_type(&self) -> TreeType {
        TreeType::Pine
    }

    fn ingest(
        &mut self,
        reference: &Reference,
        response: &Response,
        query_regions: &[Region],
    ) -> TrackResult<IngestReport> {
        let mut report = IngestReport::default();
        let decoded = decode_response(reference, response, &mut report, |value| {
            let entry = SignalEntry::try_from(value).map_err(|e| e.to_string())?;
            let record = match entry.data {
                DataPayload::Raw(value) => {
                    TreeRecord::raw(entry.region.start, entry.region.end, value)
                }
                DataPayload::Summary(summary) => {
                    TreeRecord::summary(entry.region.start, entry.region.end, summary)
                }
            };
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
        let Some(tree) = self.trees.get(&window.chr) else {
            return Ok(match intent {
                QueryIntent::Entries => QueryResult::Entries(Vec::new()),
                QueryIntent::Summary => QueryResult::Summary(SignalSummary::default()),
            });
        };

        Ok(match intent {
            QueryIntent::Summary => QueryResult::Summary(tree.summary_in_range(window, resolution)?),
            QueryIntent::Entries => QueryResult::Entries(
                tree.iter(window, resolution)?
                    .map(|entry| TrackEntry {
                        region: entry.region(&window.chr),
                        value: match entry.data {
                            EntryData::Raw(value) => EntryValue::Signal { value: *value },
                            EntryData::Summary(summary) => EntryValue::Summary(*summary),
                        },
                    })
                    .collect(),
            ),
        })
    }

    fn uncached_ranges(&self, window: &Region, resolution: u32) -> TrackResult<Vec<Region>> {
        self.trees.uncached_ranges(window, resolution)
    }

    fn as_bigwig(&self) -> Option<&BigWigAdapter> {
        Some(self)
    }
}
