use give_core::models::Region;
use log::debug;

use crate::TreeConfig;
use crate::coverage::CoverageSet;
use crate::errors::{TreeError, TreeResult};
use crate::traits::{EntryData, GiveTree, RecordData, SummaryCtor, TreeEntry, TreeRecord};
use crate::traversal::Traversal;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot<T> {
    Unfetched,
    Empty,
    Raw(T),
}

#[derive(Debug, Clone)]
pub(crate) struct Segment<T> {
    pub start: u32,
    pub end: u32,
    pub slot: Slot<T>,
}

#[derive(Debug, Clone)]
pub(crate) enum Child<T, S> {
    Segment(Segment<T>),
    Node(Box<PineNode<T, S>>),
}

impl<T, S> Child<T, S> {
    pub fn start(&self) -> u32 {
        match self {
            Child::Segment(seg) => seg.start,
            Child::Node(node) => node.start,
        }
    }

    pub fn end(&self) -> u32 {
        match self {
            Child::Segment(seg) => seg.end,
            Child::Node(node) => node.end,
        }
    }
}

///
/// A non-leaf node. Its children tile `[start, end)` without gaps.
///
/// `summary` is `Some` when the node span is fully known (derived from the
/// children), or when it was handed in by a summary record for exactly this
/// span (`pinned`). A pinned summary survives until the node span changes.
///
#[derive(Debug, Clone)]
pub(crate) struct PineNode<T, S> {
    pub start: u32,
    pub end: u32,
    pub children: Vec<Child<T, S>>,
    pub summary: Option<S>,
    pub pinned: bool,
    /// No unfetched segment anywhere below.
    pub complete: bool,
}

enum Write<T, S> {
    Raw(T),
    Empty,
    Summary(S),
}

impl<T, S> PineNode<T, S> {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Index of the child containing `pos`.
    fn child_index(&self, pos: u32) -> usize {
        self.children.partition_point(|c| c.end() <= pos)
    }

    ///
    /// Whether every part of `[start, end)` below this node holds fetched data.
    ///
    pub fn fetched_within(&self, start: u32, end: u32) -> bool {
        if self.complete {
            return true;
        }
        let first = self.child_index(start);
        self.children[first..]
            .iter()
            .take_while(|c| c.start() < end)
            .all(|c| match c {
                Child::Segment(seg) => !matches!(seg.slot, Slot::Unfetched),
                Child::Node(node) => node.fetched_within(start, end),
            })
    }

    ///
    /// The entry this node is reported as during a traversal at
    /// `resolution`, or `None` when the traversal should descend.
    ///
    pub fn summary_entry(&self, start: u32, end: u32, resolution: u32) -> Option<TreeEntry<'_, T, S>> {
        let summary = self.summary.as_ref()?;
        if self.len() <= resolution || !self.fetched_within(start, end) {
            Some(TreeEntry {
                start: self.start,
                end: self.end,
                data: EntryData::Summary(summary),
            })
        } else {
            None
        }
    }
}

impl<T, S> PineNode<T, S>
where
    T: Clone,
    S: SummaryCtor<T>,
{
    fn unfetched(start: u32, end: u32) -> Self {
        PineNode {
            start,
            end,
            children: vec![Child::Segment(Segment {
                start,
                end,
                slot: Slot::Unfetched,
            })],
            summary: None,
            pinned: false,
            complete: false,
        }
    }

    fn from_children(start: u32, end: u32, children: Vec<Child<T, S>>) -> Self {
        let mut node = PineNode {
            start,
            end,
            children,
            summary: None,
            pinned: false,
            complete: false,
        };
        node.refresh();
        node
    }

    fn pin(&mut self, summary: S) {
        let mut own = S::default();
        own.add_summary(&summary);
        self.summary = Some(own);
        self.pinned = true;
    }

    ///
    /// Write `[start, end)`, which must lie within this node.
    ///
    /// Returns the siblings split off the right end of this node when it
    /// overflowed. The caller places them right after this node.
    ///
    fn write(
        &mut self,
        start: u32,
        end: u32,
        write: Write<T, S>,
        config: &TreeConfig,
    ) -> Vec<PineNode<T, S>> {
        if self.start == start && self.end == end {
            if let Write::Summary(summary) = write {
                self.pin(summary);
                self.refresh();
                return Vec::new();
            }
        }

        let first = self.child_index(start);
        let last = self.child_index(end - 1);
        if first == last {
            if let Child::Node(node) = &mut self.children[first] {
                let exact = node.start == start && node.end == end;
                if !exact || matches!(write, Write::Summary(_)) {
                    let siblings = node.write(start, end, write, config);
                    self.children.splice(
                        first + 1..first + 1,
                        siblings.into_iter().map(|node| Child::Node(Box::new(node))),
                    );
                    self.normalize();
                    return self.split_overflow(config);
                }
            }
        }

        let (at, taken) = self.take_range(first, last, start, end);
        let child = match write {
            Write::Raw(value) => Child::Segment(Segment {
                start,
                end,
                slot: Slot::Raw(value),
            }),
            Write::Empty => Child::Segment(Segment {
                start,
                end,
                slot: Slot::Empty,
            }),
            Write::Summary(summary) => {
                let mut node = PineNode::from_children(start, end, taken);
                node.pin(summary);
                node.normalize();
                node.split_overflow(config);
                Child::Node(Box::new(node))
            }
        };
        self.children.insert(at, child);
        self.normalize();
        self.split_overflow(config)
    }

    ///
    /// Remove the content of `[start, end)` from children `first..=last`,
    /// leaving a hole. Returns where the hole is and what was removed, in
    /// coordinate order.
    ///
    fn take_range(
        &mut self,
        first: usize,
        last: usize,
        start: u32,
        end: u32,
    ) -> (usize, Vec<Child<T, S>>) {
        let drained: Vec<Child<T, S>> = self.children.drain(first..=last).collect();
        let mut taken = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();

        for child in drained {
            if child.start() >= start && child.end() <= end {
                taken.push(child);
                continue;
            }
            match child {
                Child::Segment(seg) => {
                    let inner_start = seg.start.max(start);
                    let inner_end = seg.end.min(end);
                    if seg.start < start {
                        left.push(Child::Segment(Segment {
                            start: seg.start,
                            end: start,
                            slot: seg.slot.clone(),
                        }));
                    }
                    if seg.end > end {
                        right.push(Child::Segment(Segment {
                            start: end,
                            end: seg.end,
                            slot: seg.slot.clone(),
                        }));
                    }
                    taken.push(Child::Segment(Segment {
                        start: inner_start,
                        end: inner_end,
                        slot: seg.slot,
                    }));
                }
                Child::Node(mut node) => {
                    if node.start < start {
                        let end = node.end;
                        taken.extend(node.cut(start, end));
                        left.push(Child::Node(node));
                    } else {
                        let start = node.start;
                        taken.extend(node.cut(start, end));
                        right.push(Child::Node(node));
                    }
                }
            }
        }

        let at = first + left.len();
        self.children
            .splice(first..first, left.into_iter().chain(right));
        (at, taken)
    }

    ///
    /// Remove a prefix or suffix `[start, end)` of this node's span and
    /// return it. The node shrinks and loses any pinned summary.
    ///
    fn cut(&mut self, start: u32, end: u32) -> Vec<Child<T, S>> {
        let first = self.child_index(start);
        let last = self.child_index(end - 1);
        let (_, taken) = self.take_range(first, last, start, end);
        if start == self.start {
            self.start = end;
        } else {
            self.end = start;
        }
        self.pinned = false;
        self.summary = None;
        self.normalize();
        self.refresh();
        taken
    }

    ///
    /// Collapse single-child nodes without their own summary and merge
    /// adjacent segments that carry no data.
    ///
    fn normalize(&mut self) {
        let children = std::mem::take(&mut self.children);
        let mut merged: Vec<Child<T, S>> = Vec::with_capacity(children.len());

        for child in children {
            let child = collapse(child);
            if let (Some(Child::Segment(prev)), Child::Segment(seg)) = (merged.last_mut(), &child) {
                let mergeable = matches!(
                    (&prev.slot, &seg.slot),
                    (Slot::Unfetched, Slot::Unfetched) | (Slot::Empty, Slot::Empty)
                );
                if mergeable && prev.end == seg.start {
                    prev.end = seg.end;
                    continue;
                }
            }
            merged.push(child);
        }

        self.children = merged;
    }

    ///
    /// Bring the fan-out back within `branching_factor` and refresh.
    ///
    /// Runs of `min_branching` children are moved off the right end into new
    /// siblings, which are returned for the parent to adopt. A pinned node
    /// cannot change its span, so it pushes its children one level down
    /// instead and stays the top of its own subtree.
    ///
    fn split_overflow(&mut self, config: &TreeConfig) -> Vec<PineNode<T, S>> {
        if self.children.len() <= config.branching_factor {
            self.refresh();
            return Vec::new();
        }
        if self.pinned {
            let children = std::mem::take(&mut self.children);
            let mut inner = PineNode::from_children(self.start, self.end, children);
            let siblings = inner.split_overflow(config);
            self.children = std::iter::once(inner)
                .chain(siblings)
                .map(|node| Child::Node(Box::new(node)))
                .collect();
            self.refresh();
            return Vec::new();
        }

        let group = config.min_branching.max(1);
        let mut siblings = Vec::new();
        while self.children.len() > config.branching_factor {
            let at = self.children.len() - group;
            let tail = self.children.split_off(at);
            let (start, end) = (tail[0].start(), tail[tail.len() - 1].end());
            siblings.push(PineNode::from_children(start, end, tail));
        }
        siblings.reverse();
        self.end = self.children[self.children.len() - 1].end();
        self.refresh();
        siblings
    }

    ///
    /// Recompute `complete` and the summary from the children.
    ///
    fn refresh(&mut self) {
        self.complete = self.children.iter().all(|c| match c {
            Child::Segment(seg) => !matches!(seg.slot, Slot::Unfetched),
            Child::Node(node) => node.complete,
        });
        if self.derivable() {
            self.summary = Some(self.derive());
        } else if !self.pinned {
            self.summary = None;
        }
    }

    fn derivable(&self) -> bool {
        self.children.iter().all(|c| match c {
            Child::Segment(seg) => !matches!(seg.slot, Slot::Unfetched),
            Child::Node(node) => node.summary.is_some(),
        })
    }

    fn derive(&self) -> S {
        let mut summary = S::default();
        for child in &self.children {
            match child {
                Child::Segment(Segment {
                    start,
                    end,
                    slot: Slot::Raw(value),
                }) => summary.add_data(end - start, value),
                Child::Segment(_) => {}
                Child::Node(node) => {
                    if let Some(inner) = &node.summary {
                        summary.add_summary(inner);
                    }
                }
            }
        }
        summary
    }

    fn summarize(&self, start: u32, end: u32, resolution: u32, acc: &mut S) {
        let first = self.child_index(start);
        for child in self.children[first..].iter().take_while(|c| c.start() < end) {
            match child {
                Child::Segment(Segment {
                    start: s,
                    end: e,
                    slot: Slot::Raw(value),
                }) => {
                    let overlap = (*e).min(end) - (*s).max(start);
                    acc.add_data(overlap, value);
                }
                Child::Segment(_) => {}
                Child::Node(node) => match &node.summary {
                    Some(summary)
                        if (start <= node.start && node.end <= end)
                            || node.len() <= resolution =>
                    {
                        acc.add_summary(summary)
                    }
                    _ => node.summarize(start, end, resolution, acc),
                },
            }
        }
    }

    fn collect_uncached(&self, start: u32, end: u32, resolution: u32, out: &mut CoverageSet) {
        if self.complete || (self.summary.is_some() && self.len() <= resolution) {
            return;
        }
        let first = self.child_index(start);
        for child in self.children[first..].iter().take_while(|c| c.start() < end) {
            match child {
                Child::Segment(seg) if matches!(seg.slot, Slot::Unfetched) => {
                    out.insert(seg.start.max(start), seg.end.min(end));
                }
                Child::Segment(_) => {}
                Child::Node(node) => node.collect_uncached(start, end, resolution, out),
            }
        }
    }

    fn validate(&self, chr: &str, config: &TreeConfig) -> TreeResult<()> {
        let here = || Region::new(chr, self.start, self.end).to_string();

        if self.children.is_empty() || self.children.len() > config.branching_factor {
            return Err(TreeError::InconsistentSummary(format!(
                "{} has {} children",
                here(),
                self.children.len()
            )));
        }
        let mut cursor = self.start;
        for child in &self.children {
            if child.start() != cursor || child.end() <= child.start() {
                return Err(TreeError::InconsistentSummary(format!(
                    "{} children do not tile the node",
                    here()
                )));
            }
            cursor = child.end();
            if let Child::Node(node) = child {
                node.validate(chr, config)?;
            }
        }
        if cursor != self.end {
            return Err(TreeError::InconsistentSummary(format!(
                "{} children end at {}",
                here(),
                cursor
            )));
        }

        match &self.summary {
            Some(summary) if !summary.is_consistent() => Err(TreeError::InconsistentSummary(
                format!("{} has min > max", here()),
            )),
            Some(summary) if self.derivable() && !summary.approx_eq(&self.derive()) => Err(
                TreeError::InconsistentSummary(format!("{} summary is stale", here())),
            ),
            None if self.derivable() => Err(TreeError::InconsistentSummary(format!(
                "{} is fully known but has no summary",
                here()
            ))),
            Some(_) if !self.derivable() && !self.pinned => Err(TreeError::InconsistentSummary(
                format!("{} has a summary over unfetched data", here()),
            )),
            _ => Ok(()),
        }
    }

    fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                Child::Node(node) => node.depth(),
                Child::Segment(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

fn collapse<T, S>(child: Child<T, S>) -> Child<T, S> {
    match child {
        Child::Node(mut node) if node.children.len() == 1 && !node.pinned => {
            match node.children.pop() {
                Some(only) => collapse(only),
                None => Child::Node(node),
            }
        }
        other => other,
    }
}

///
/// A summarizing tree over one chromosome.
///
/// The chromosome span is partitioned into segments that are either not yet
/// fetched, known to be empty, or hold one raw value. Non-leaf nodes carry
/// summaries so that coarse queries stop early.
///
#[derive(Debug, Clone)]
pub struct PineTree<T, S> {
    chr: String,
    root: PineNode<T, S>,
    config: TreeConfig,
}

impl<T, S> PineTree<T, S>
where
    T: Clone,
    S: SummaryCtor<T>,
{
    pub fn new(chr: &str, start: u32, end: u32, config: &TreeConfig) -> Self {
        PineTree {
            chr: chr.to_string(),
            root: PineNode::unfetched(start, end.max(start + 1)),
            config: config.normalized(),
        }
    }

    ///
    /// Clip `query` to the tree span. `None` when nothing is left.
    ///
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
        let start = query.start.max(self.root.start);
        let end = query.end.min(self.root.end);
        Ok((start < end).then_some((start, end)))
    }

    ///
    /// A lazy traversal of the entries overlapping `query`. Non-leaf nodes
    /// whose span is at most `resolution` are reported as one summary entry.
    ///
    pub fn iter(&self, query: &Region, resolution: u32) -> TreeResult<Traversal<'_, T, S>> {
        Ok(match self.clip(query)? {
            Some((start, end)) => Traversal::new(&self.root, start, end, resolution.max(1)),
            None => Traversal::empty(),
        })
    }

    ///
    /// Summary of everything stored within `query`, descending no deeper
    /// than nodes whose span is at most `resolution`.
    ///
    pub fn summary_in_range(&self, query: &Region, resolution: u32) -> TreeResult<S> {
        let mut acc = S::default();
        if let Some((start, end)) = self.clip(query)? {
            match &self.root.summary {
                Some(summary)
                    if (start <= self.root.start && self.root.end <= end)
                        || self.root.len() <= resolution =>
                {
                    acc.add_summary(summary)
                }
                _ => self.root.summarize(start, end, resolution.max(1), &mut acc),
            }
        }
        Ok(acc)
    }

    ///
    /// Check every structural and summary invariant of the tree.
    ///
    pub fn validate(&self) -> TreeResult<()> {
        self.root.validate(&self.chr, &self.config)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    ///
    /// Write below the root. Siblings split off the root are gathered under
    /// a new root, the only place the tree grows in height.
    ///
    fn write(&mut self, start: u32, end: u32, write: Write<T, S>) {
        let (span_start, span_end) = (self.root.start, self.root.end);
        let mut siblings = self.root.write(start, end, write, &self.config);
        while !siblings.is_empty() {
            let left = std::mem::replace(&mut self.root, PineNode::unfetched(span_start, span_end));
            let children = std::iter::once(left)
                .chain(siblings)
                .map(|node| Child::Node(Box::new(node)))
                .collect();
            self.root = PineNode::from_children(span_start, span_end, children);
            siblings = self.root.split_overflow(&self.config);
        }
    }
}

impl<T, S> GiveTree for PineTree<T, S>
where
    T: Clone,
    S: SummaryCtor<T>,
{
    type Data = T;
    type Summary = S;

    fn with_span(chr: &str, start: u32, end: u32, config: &TreeConfig) -> Self {
        PineTree::new(chr, start, end, config)
    }

    fn chr(&self) -> &str {
        &self.chr
    }

    fn span(&self) -> (u32, u32) {
        (self.root.start, self.root.end)
    }

    fn insert(
        &mut self,
        records: Vec<TreeRecord<T, S>>,
        covering: &[Region],
    ) -> TreeResult<usize> {
        let (span_start, span_end) = self.span();

        let mut records: Vec<TreeRecord<T, S>> = records
            .into_iter()
            .filter_map(|mut record| {
                record.start = record.start.max(span_start);
                record.end = record.end.min(span_end);
                if record.start < record.end {
                    Some(record)
                } else {
                    debug!(
                        "Dropping record outside {}:{}-{}",
                        self.chr, span_start, span_end
                    );
                    None
                }
            })
            .collect();
        records.sort_by_key(|record| record.start);

        // every covering region is checked before anything is written
        let covered = covering
            .iter()
            .map(|region| self.clip(region))
            .collect::<TreeResult<Vec<_>>>()?;

        let mut written = CoverageSet::new();
        for record in &records {
            written.insert(record.start, record.end);
        }
        for (start, end) in covered.into_iter().flatten() {
            for (gap_start, gap_end) in written.gaps(start, end) {
                self.write(gap_start, gap_end, Write::Empty);
            }
        }

        let count = records.len();
        for record in records {
            let write = match record.data {
                RecordData::Raw(value) => Write::Raw(value),
                RecordData::Summary(summary) => Write::Summary(summary),
            };
            self.write(record.start, record.end, write);
        }
        Ok(count)
    }

    fn traverse_at<F, V>(
        &self,
        query: &Region,
        resolution: u32,
        mut filter: F,
        mut visitor: V,
        break_on_false: bool,
    ) -> TreeResult<bool>
    where
        F: FnMut(&TreeEntry<'_, T, S>) -> bool,
        V: FnMut(&TreeEntry<'_, T, S>) -> bool,
    {
        for entry in self.iter(query, resolution)? {
            if !filter(&entry) {
                continue;
            }
            if !visitor(&entry) && break_on_false {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn uncached_ranges(&self, query: &Region, resolution: u32) -> TreeResult<Vec<Region>> {
        let mut out = CoverageSet::new();
        if let Some((start, end)) = self.clip(query)? {
            self.root
                .collect_uncached(start, end, resolution.max(1), &mut out);
        }
        Ok(out
            .ranges()
            .iter()
            .map(|&(start, end)| Region::new(&self.chr, start, end))
            .collect())
    }
}
