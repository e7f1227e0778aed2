//! Cross-partition iteration.
//!
//! Each partition store hands out clonable cursors over its own ordered
//! key/row space; [`MergeCursor`] k-way merges one cursor per partition under
//! the table's key or row order, and [`StackedCursor`] concatenates them when
//! the caller accepts arbitrary ordering. A key lives in at most one
//! partition, so the merge never has to resolve duplicates — ties between
//! sources pick the lowest source index.

use std::cmp::Ordering;

use crate::row::RowDef;
use crate::Result;

/// A clonable stream over one partition's keys or rows.
///
/// Cloning copies the cursor position, so two traversals proceed
/// independently. Cursors observe their partition's state as of cursor
/// construction.
pub trait Cursor: Send {
    type Item;

    fn next(&mut self) -> Result<Option<Self::Item>>;

    fn clone_boxed(&self) -> Box<dyn Cursor<Item = Self::Item>>;
}

impl<T> Clone for Box<dyn Cursor<Item = T>> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Comparator used by the merge: the row-def key order for key streams, the
/// derived row order for row streams.
pub type MergeCompare<T> = fn(&RowDef, &T, &T) -> Ordering;

/// K-way merge across per-partition cursors.
pub struct MergeCursor<T> {
    sources: Vec<Box<dyn Cursor<Item = T>>>,
    pending: Vec<Option<T>>,
    rowdef: RowDef,
    compare: MergeCompare<T>,
    ascending: bool,
}

impl<T: Clone> MergeCursor<T> {
    pub fn new(
        sources: Vec<Box<dyn Cursor<Item = T>>>,
        rowdef: RowDef,
        compare: MergeCompare<T>,
        ascending: bool,
    ) -> Self {
        let pending = sources.iter().map(|_| None).collect();
        Self {
            sources,
            pending,
            rowdef,
            compare,
            ascending,
        }
    }

    /// The next item in merged order, or `None` when every source is dry.
    pub fn next(&mut self) -> Result<Option<T>> {
        for (index, source) in self.sources.iter_mut().enumerate() {
            if self.pending[index].is_none() {
                self.pending[index] = source.next()?;
            }
        }

        let mut best: Option<usize> = None;
        for (index, pending) in self.pending.iter().enumerate() {
            let Some(item) = pending.as_ref() else {
                continue;
            };
            match best {
                None => best = Some(index),
                Some(best_index) => {
                    let cmp = (self.compare)(
                        &self.rowdef,
                        item,
                        self.pending[best_index].as_ref().expect("pending item"),
                    );
                    let wins = if self.ascending {
                        cmp == Ordering::Less
                    } else {
                        cmp == Ordering::Greater
                    };
                    if wins {
                        best = Some(index);
                    }
                }
            }
        }

        Ok(best.and_then(|index| self.pending[index].take()))
    }
}

impl<T: Clone> Clone for MergeCursor<T> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            pending: self.pending.clone(),
            rowdef: self.rowdef,
            compare: self.compare,
            ascending: self.ascending,
        }
    }
}

/// Concatenation of per-partition cursors in registry order.
///
/// Yields every item exactly once but in no particular cross-partition order.
pub struct StackedCursor<T> {
    sources: Vec<Box<dyn Cursor<Item = T>>>,
    current: usize,
}

impl<T> StackedCursor<T> {
    pub fn new(sources: Vec<Box<dyn Cursor<Item = T>>>) -> Self {
        Self {
            sources,
            current: 0,
        }
    }

    pub fn next(&mut self) -> Result<Option<T>> {
        while self.current < self.sources.len() {
            if let Some(item) = self.sources[self.current].next()? {
                return Ok(Some(item));
            }
            self.current += 1;
        }
        Ok(None)
    }
}

impl<T> Clone for StackedCursor<T> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            current: self.current,
        }
    }
}
