///
/// A set of fetched ranges, kept as sorted, disjoint, non-touching
/// half-open intervals.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageSet {
    ranges: Vec<(u32, u32)>,
}

impl CoverageSet {
    pub fn new() -> Self {
        CoverageSet::default()
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Add `[start, end)`, merging with anything it touches.
    pub fn insert(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        // first range that could touch the new one
        let first = self.ranges.partition_point(|&(_, e)| e < start);
        // one past the last range that could touch it
        let last = self.ranges.partition_point(|&(s, _)| s <= end);

        let mut merged = (start, end);
        if first < last {
            merged.0 = merged.0.min(self.ranges[first].0);
            merged.1 = merged.1.max(self.ranges[last - 1].1);
        }
        self.ranges.splice(first..last, std::iter::once(merged));
    }

    /// Parts of `[start, end)` that are not in the set.
    pub fn gaps(&self, start: u32, end: u32) -> Vec<(u32, u32)> {
        let mut gaps = Vec::new();
        let mut cursor = start;
        let first = self.ranges.partition_point(|&(_, e)| e <= start);
        for &(s, e) in &self.ranges[first..] {
            if s >= end {
                break;
            }
            if s > cursor {
                gaps.push((cursor, s));
            }
            cursor = cursor.max(e);
        }
        if cursor < end {
            gaps.push((cursor, end));
        }
        gaps
    }

    pub fn covers(&self, start: u32, end: u32) -> bool {
        self.gaps(start, end).is_empty()
    }
}
