use std::fmt::Debug;

use give_core::models::Region;

use crate::errors::TreeResult;

///
/// An accumulator of statistics over tree data.
///
/// Raw values are absorbed with [SummaryCtor::add_data], already reduced
/// summaries with [SummaryCtor::add_summary]. Both must be order independent
/// so that a node summary does not depend on how its children were grouped.
///
pub trait SummaryCtor<T>: Clone + Default + Debug {
    /// Absorb one raw value covering `weight` bases.
    fn add_data(&mut self, weight: u32, data: &T);

    /// Absorb an existing summary.
    fn add_summary(&mut self, other: &Self);

    /// The representative value of everything absorbed so far.
    fn value(&self) -> f64;

    fn is_empty(&self) -> bool;

    /// Internal sanity check, used by tree validation.
    fn is_consistent(&self) -> bool {
        true
    }

    /// Equality up to floating point noise.
    fn approx_eq(&self, other: &Self) -> bool;
}

///
/// Identity of a stored entry, used to decide whether an incoming record
/// replaces an existing one with the same span.
///
pub trait EntryIdentity {
    fn same_entry(&self, other: &Self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordData<T, S> {
    Raw(T),
    Summary(S),
}

///
/// One record handed to a tree for insertion, in chromosome coordinates.
///
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord<T, S> {
    pub start: u32,
    pub end: u32,
    pub data: RecordData<T, S>,
}

impl<T, S> TreeRecord<T, S> {
    pub fn raw(start: u32, end: u32, data: T) -> Self {
        TreeRecord {
            start,
            end,
            data: RecordData::Raw(data),
        }
    }

    pub fn summary(start: u32, end: u32, summary: S) -> Self {
        TreeRecord {
            start,
            end,
            data: RecordData::Summary(summary),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum EntryData<'a, T, S> {
    Raw(&'a T),
    Summary(&'a S),
}

// derive would require T: Clone
impl<T, S> Clone for EntryData<'_, T, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, S> Copy for EntryData<'_, T, S> {}

///
/// A borrowed view of something stored in a tree, as handed to visitors.
///
#[derive(Debug, PartialEq)]
pub struct TreeEntry<'a, T, S> {
    pub start: u32,
    pub end: u32,
    pub data: EntryData<'a, T, S>,
}

impl<T, S> Clone for TreeEntry<'_, T, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, S> Copy for TreeEntry<'_, T, S> {}

impl<'a, T, S> TreeEntry<'a, T, S> {
    pub fn region(&self, chr: &str) -> Region {
        Region::new(chr, self.start, self.end)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn is_summary(&self) -> bool {
        matches!(self.data, EntryData::Summary(_))
    }
}

///
/// The operations every per-chromosome tree offers to a track adapter.
///
pub trait GiveTree {
    type Data;
    type Summary;

    /// Create an empty tree covering `[start, end)` of `chr`.
    fn with_span(chr: &str, start: u32, end: u32, config: &crate::TreeConfig) -> Self
    where
        Self: Sized;

    fn chr(&self) -> &str;

    fn span(&self) -> (u32, u32);

    ///
    /// Insert a batch of records. `covering` are the regions the batch was
    /// requested for: afterwards they count as fetched, and any part of them
    /// not covered by a record is known to be empty.
    ///
    /// Returns the number of records stored.
    ///
    fn insert(
        &mut self,
        records: Vec<TreeRecord<Self::Data, Self::Summary>>,
        covering: &[Region],
    ) -> TreeResult<usize>;

    ///
    /// Visit entries overlapping `query` in coordinate order. Entries are
    /// handed to `visitor` only when `filter` accepts them. When
    /// `break_on_false` is set, a `false` from the visitor stops the walk and
    /// `Ok(false)` is returned.
    ///
    fn traverse_at<F, V>(
        &self,
        query: &Region,
        resolution: u32,
        filter: F,
        visitor: V,
        break_on_false: bool,
    ) -> TreeResult<bool>
    where
        F: FnMut(&TreeEntry<'_, Self::Data, Self::Summary>) -> bool,
        V: FnMut(&TreeEntry<'_, Self::Data, Self::Summary>) -> bool;

    fn traverse<V>(&self, query: &Region, visitor: V, break_on_false: bool) -> TreeResult<bool>
    where
        V: FnMut(&TreeEntry<'_, Self::Data, Self::Summary>) -> bool,
    {
        self.traverse_at(query, 1, |_| true, visitor, break_on_false)
    }

    fn traverse_filtered<F, V>(
        &self,
        query: &Region,
        filter: F,
        visitor: V,
        break_on_false: bool,
    ) -> TreeResult<bool>
    where
        F: FnMut(&TreeEntry<'_, Self::Data, Self::Summary>) -> bool,
        V: FnMut(&TreeEntry<'_, Self::Data, Self::Summary>) -> bool,
    {
        self.traverse_at(query, 1, filter, visitor, break_on_false)
    }

    /// Sub-ranges of `query` that have not been fetched at `resolution`.
    fn uncached_ranges(&self, query: &Region, resolution: u32) -> TreeResult<Vec<Region>>;

    fn is_fully_cached(&self, query: &Region, resolution: u32) -> TreeResult<bool> {
        Ok(self.uncached_ranges(query, resolution)?.is_empty())
    }
}
