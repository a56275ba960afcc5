use std::collections::BTreeMap;
use std::collections::btree_map;

use give_core::models::Region;
use log::debug;

use crate::TreeConfig;
use crate::coverage::CoverageSet;
use crate::errors::{TreeError, TreeResult};
use crate::summary::NoSummary;
use crate::traits::{EntryData, EntryIdentity, GiveTree, RecordData, TreeEntry, TreeRecord};

#[derive(Debug, Clone)]
struct OakRecord<T> {
    end: u32,
    data: T,
}

///
/// A store of possibly overlapping features on one chromosome.
///
/// Records are kept in an ordered map keyed by start. The length of the
/// longest record bounds how far left of a query an overlapping record can
/// start, so overlap queries seek to `query.start - max_len` and scan forward.
///
/// ```
/// use give_core::models::Region;
/// use give_tree::{EntryIdentity, GiveTree, OakTree, TreeRecord};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Feature(&'static str);
///
/// impl EntryIdentity for Feature {
///     fn same_entry(&self, other: &Self) -> bool {
///         self.0 == other.0
///     }
/// }
///
/// let mut tree = OakTree::new("chr1", 0, 1000);
/// tree.insert(
///     vec![TreeRecord::raw(100, 400, Feature("long")), TreeRecord::raw(250, 260, Feature("short"))],
///     &[Region::new("chr1", 0, 500)],
/// )
/// .unwrap();
///
/// assert_eq!(tree.iter(&Region::new("chr1", 300, 310)).unwrap().count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct OakTree<T> {
    chr: String,
    start: u32,
    end: u32,
    records: BTreeMap<u32, Vec<OakRecord<T>>>,
    max_len: u32,
    coverage: CoverageSet,
    len: usize,
}

impl<T: EntryIdentity> OakTree<T> {
    pub fn new(chr: &str, start: u32, end: u32) -> Self {
        OakTree {
            chr: chr.to_string(),
            start,
            end: end.max(start + 1),
            records: BTreeMap::new(),
            max_len: 0,
            coverage: CoverageSet::new(),
            len: 0,
        }
    }

    /// Number of records stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clip(&self, query: &Region) -> TreeResult<Option<(u32, u32)>> {
        if query.chr != self.chr {
            return Err(TreeError::ChromosomeMismatch {
                expected: self.chr.clone(),
                found: query.chr.clone(),
            });
        }
        if query.start > query.end {
            return Err(TreeError::InvalidRange(query.to_string()));
        }
        let start = query.start.max(self.start);
        let end = query.end.min(self.end);
        Ok((start < end).then_some((start, end)))
    }

    fn put(&mut self, start: u32, end: u32, data: T) {
        let bucket = self.records.entry(start).or_default();
        match bucket
            .iter_mut()
            .find(|record| record.end == end && record.data.same_entry(&data))
        {
            Some(existing) => existing.data = data,
            None => {
                bucket.push(OakRecord { end, data });
                self.len += 1;
                self.max_len = self.max_len.max(end - start);
            }
        }
    }

    ///
    /// Records overlapping `query`, ordered by start.
    ///
    pub fn iter(&self, query: &Region) -> TreeResult<OakIter<'_, T>> {
        let (seek, start, end) = match self.clip(query)? {
            Some((start, end)) => (start.saturating_sub(self.max_len), start, end),
            None => (0, 0, 0),
        };
        Ok(OakIter {
            buckets: self.records.range(seek..end),
            current: None,
            start,
        })
    }
}

///
/// Iterator over the records of an [OakTree] that overlap a query.
///
pub struct OakIter<'a, T> {
    buckets: btree_map::Range<'a, u32, Vec<OakRecord<T>>>,
    current: Option<(u32, std::slice::Iter<'a, OakRecord<T>>)>,
    start: u32,
}

impl<'a, T> Iterator for OakIter<'a, T> {
    type Item = TreeEntry<'a, T, NoSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((start, records)) = self.current.as_mut() {
                for record in records.by_ref() {
                    if record.end > self.start {
                        return Some(TreeEntry {
                            start: *start,
                            end: record.end,
                            data: EntryData::Raw(&record.data),
                        });
                    }
                }
            }
            let (start, bucket) = self.buckets.next()?;
            self.current = Some((*start, bucket.iter()));
        }
    }
}

impl<T: EntryIdentity> GiveTree for OakTree<T> {
    type Data = T;
    type Summary = NoSummary;

    /// An ordered map has no fan-out to configure, so `config` is not used.
    fn with_span(chr: &str, start: u32, end: u32, _config: &TreeConfig) -> Self {
        OakTree::new(chr, start, end)
    }

    fn chr(&self) -> &str {
        &self.chr
    }

    fn span(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    fn insert(
        &mut self,
        records: Vec<TreeRecord<T, NoSummary>>,
        covering: &[Region],
    ) -> TreeResult<usize> {
        // every covering region is checked before anything is stored
        let covered = covering
            .iter()
            .map(|region| self.clip(region))
            .collect::<TreeResult<Vec<_>>>()?;

        let mut records = records;
        records.sort_by_key(|record| record.start);

        let mut count = 0;
        for record in records {
            let start = record.start.max(self.start);
            let end = record.end.min(self.end);
            match record.data {
                RecordData::Raw(data) if start < end => {
                    self.put(start, end, data);
                    count += 1;
                }
                RecordData::Raw(_) => debug!(
                    "Dropping record {}-{} outside {}:{}-{}",
                    record.start, record.end, self.chr, self.start, self.end
                ),
                RecordData::Summary(_) => debug!("Ignoring summary record on {}", self.chr),
            }
        }

        for (start, end) in covered.into_iter().flatten() {
            self.coverage.insert(start, end);
        }
        Ok(count)
    }

    fn traverse_at<F, V>(
        &self,
        query: &Region,
        _resolution: u32,
        mut filter: F,
        mut visitor: V,
        break_on_false: bool,
    ) -> TreeResult<bool>
    where
        F: FnMut(&TreeEntry<'_, T, NoSummary>) -> bool,
        V: FnMut(&TreeEntry<'_, T, NoSummary>) -> bool,
    {
        for entry in self.iter(query)? {
            if !filter(&entry) {
                continue;
            }
            if !visitor(&entry) && break_on_false {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn uncached_ranges(&self, query: &Region, _resolution: u32) -> TreeResult<Vec<Region>> {
        Ok(match self.clip(query)? {
            Some((start, end)) => self
                .coverage
                .gaps(start, end)
                .into_iter()
                .map(|(s, e)| Region::new(&self.chr, s, e))
                .collect(),
            None => Vec::new(),
        })
    }
}
