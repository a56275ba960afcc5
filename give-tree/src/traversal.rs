use crate::pine_tree::{Child, PineNode, Slot};
use crate::traits::{EntryData, TreeEntry};

///
/// Lazy, in-order walk over a [crate::PineTree].
///
/// Descends depth first and prunes children outside the query. A node whose
/// span is at most `resolution`, or whose data is not fetched yet, is reported
/// as a single summary entry when it carries one.
///
pub struct Traversal<'a, T, S> {
    root: Option<&'a PineNode<T, S>>,
    stack: Vec<(&'a PineNode<T, S>, usize)>,
    head: Option<TreeEntry<'a, T, S>>,
    start: u32,
    end: u32,
    resolution: u32,
}

impl<'a, T, S> Traversal<'a, T, S> {
    pub(crate) fn new(root: &'a PineNode<T, S>, start: u32, end: u32, resolution: u32) -> Self {
        let mut traversal = Traversal {
            root: Some(root),
            stack: Vec::new(),
            head: None,
            start,
            end,
            resolution,
        };
        traversal.restart();
        traversal
    }

    pub(crate) fn empty() -> Self {
        Traversal {
            root: None,
            stack: Vec::new(),
            head: None,
            start: 0,
            end: 0,
            resolution: 1,
        }
    }

    /// Rewind to the first entry of the query.
    pub fn restart(&mut self) {
        self.stack.clear();
        self.head = None;
        let Some(root) = self.root else {
            return;
        };
        match root.summary_entry(self.start, self.end, self.resolution) {
            Some(entry) => self.head = Some(entry),
            None => self.push(root),
        }
    }

    fn push(&mut self, node: &'a PineNode<T, S>) {
        let start = self.start;
        let first = node.children.partition_point(|c| c.end() <= start);
        self.stack.push((node, first));
    }
}

impl<'a, T, S> Iterator for Traversal<'a, T, S> {
    type Item = TreeEntry<'a, T, S>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.head.take() {
            return Some(entry);
        }
        loop {
            let (node, index) = self.stack.last_mut()?;
            let node: &'a PineNode<T, S> = *node;
            let Some(child) = node.children.get(*index) else {
                self.stack.pop();
                continue;
            };
            if child.start() >= self.end {
                self.stack.pop();
                continue;
            }
            *index += 1;

            match child {
                Child::Segment(seg) => {
                    if let Slot::Raw(value) = &seg.slot {
                        return Some(TreeEntry {
                            start: seg.start,
                            end: seg.end,
                            data: EntryData::Raw(value),
                        });
                    }
                }
                Child::Node(inner) => {
                    match inner.summary_entry(self.start, self.end, self.resolution) {
                        Some(entry) => return Some(entry),
                        None => self.push(inner),
                    }
                }
            }
        }
    }
}
