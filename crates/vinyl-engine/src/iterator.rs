// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use crate::heap::{HeapEntry, MergeHeap};
use crate::source::Source;
use crate::upsert::UpsertApplier;
use crate::Stream;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};
use vinyl_core::{ColumnMask, KeyDef, RefTracker, Result, Statement, StatementKind, Version};
#[cfg(test)]
use vinyl_core::Error;

/// Merges memory levels and runs into a single ordered stream of
/// statements, squashing per-key upsert chains and pruning tombstones and
/// no-op secondary-index updates below the read horizon.
///
/// Single-owner and non-reentrant: drive one from construction to drop on
/// one thread. Multiple iterators may run concurrently over disjoint
/// sources since none of them share mutable state.
pub struct WriteIterator {
    key_def: Arc<dyn KeyDef>,
    upsert_applier: Box<dyn UpsertApplier>,
    ref_tracker: Box<dyn RefTracker>,
    sources: Vec<Option<Source>>,
    heap: MergeHeap,
    current: Option<Statement>,
    current_refable: bool,
    is_primary: bool,
    index_column_mask: ColumnMask,
    is_last_level: bool,
    oldest_vlsn: Version,
    #[cfg(test)]
    fail_next_sentinel_push: bool,
}

impl WriteIterator {
    pub fn new(
        key_def: Arc<dyn KeyDef>,
        upsert_applier: Box<dyn UpsertApplier>,
        ref_tracker: Box<dyn RefTracker>,
        is_primary: bool,
        index_column_mask: ColumnMask,
        is_last_level: bool,
        oldest_vlsn: Version,
    ) -> Self {
        Self {
            key_def,
            upsert_applier,
            ref_tracker,
            sources: Vec::new(),
            heap: MergeHeap::new(),
            current: None,
            current_refable: false,
            is_primary,
            index_column_mask,
            is_last_level,
            oldest_vlsn,
            #[cfg(test)]
            fail_next_sentinel_push: false,
        }
    }

    /// Register a refable input (an in-memory level, in production; any
    /// `Stream` in tests). Must be called before the first
    /// [`WriteIterator::next`]; not enforced at runtime.
    pub fn add_memory(&mut self, stream: impl Stream + 'static) -> Result<()> {
        self.add_source(Box::new(stream), true)
    }

    /// Register a non-refable input (an on-disk run, in production; any
    /// `Stream` in tests). Must be called before the first
    /// [`WriteIterator::next`]; not enforced at runtime.
    pub fn add_run(&mut self, stream: impl Stream + 'static) -> Result<()> {
        self.add_source(Box::new(stream), false)
    }

    fn add_source(&mut self, stream: Box<dyn Stream>, refable: bool) -> Result<()> {
        let mut source = Source::new(stream, refable);
        if let Err(err) = source.advance() {
            source.close();
            return Err(err);
        }
        if source.current.is_none() {
            trace!(refable, "source empty on add, discarding");
            return Ok(());
        }
        let idx = self.sources.len();
        self.sources.push(Some(source));
        let mut less = Self::make_less(&self.sources, &self.current, self.key_def.as_ref());
        self.heap.push(HeapEntry::Source(idx), &mut less);
        debug!(idx, refable, "source added");
        Ok(())
    }

    /// Pull the next statement to write, or `None` at end-of-stream.
    pub fn next(&mut self) -> Result<Option<Statement>> {
        loop {
            let Some(top) = self.heap.peek_top() else {
                return Ok(None);
            };
            let idx = match top {
                HeapEntry::Source(idx) => idx,
                HeapEntry::Sentinel => unreachable!("sentinel only exists during a squash"),
            };
            let candidate = self.source_statement(idx).clone();
            let refable = self.sources[idx].as_ref().expect("heap entry references live source").refable;
            self.step()?;
            self.set_current(Some(candidate.clone()), refable);

            if candidate.version() > self.oldest_vlsn {
                trace!(?candidate, "above horizon, yielding unchanged");
                return Ok(Some(candidate));
            }

            if !self.is_primary
                && !self.index_column_mask.is_empty()
                && candidate.kind().is_terminal()
                && candidate.column_mask().can_skip(self.index_column_mask)
            {
                debug!(?candidate, "elided, disjoint from secondary index columns");
                continue;
            }

            self.squash_current_key()?;
            let squashed = self.current.clone().expect("squash always leaves a current statement");

            if squashed.kind() == StatementKind::Delete && self.is_last_level {
                debug!(?squashed, "tombstone elided at last level");
                continue;
            }

            return Ok(Some(squashed));
        }
    }

    /// Advance whatever source is currently on top of the heap, re-sifting
    /// it on a fresh statement or dropping it on exhaustion. A no-op when
    /// the top is the sentinel.
    fn step(&mut self) -> Result<()> {
        let Some(top) = self.heap.peek_top() else {
            return Ok(());
        };
        let HeapEntry::Source(idx) = top else {
            return Ok(());
        };
        let source = self.sources[idx].as_mut().expect("heap entry references live source");
        source.advance()?;
        let exhausted = source.current.is_none();
        if exhausted {
            self.sources[idx] = None;
            let mut less = Self::make_less(&self.sources, &self.current, self.key_def.as_ref());
            self.heap.pop_top(&mut less);
            debug!(idx, "source exhausted, removed from heap");
        } else {
            let mut less = Self::make_less(&self.sources, &self.current, self.key_def.as_ref());
            self.heap.notify_top_changed(&mut less);
        }
        Ok(())
    }

    /// Fold any further statements for the current key into a single
    /// terminal (or, absent a base and not at the last level, a single
    /// remaining upsert), leaving the heap positioned past every
    /// statement for that key.
    fn squash_current_key(&mut self) -> Result<()> {
        #[cfg(test)]
        if self.fail_next_sentinel_push {
            self.fail_next_sentinel_push = false;
            return Err(Error::OutOfMemory);
        }

        {
            let mut less = Self::make_less(&self.sources, &self.current, self.key_def.as_ref());
            self.heap.push(HeapEntry::Sentinel, &mut less);
        }
        trace!("squash started");

        let result = self.squash_loop();

        {
            let mut less = Self::make_less(&self.sources, &self.current, self.key_def.as_ref());
            self.heap.remove_sentinel(&mut less);
        }
        trace!(?result, "squash ended");
        result
    }

    fn squash_loop(&mut self) -> Result<()> {
        loop {
            let top = self.heap.peek_top().expect("sentinel is always present during squash");
            let top_is_sentinel = matches!(top, HeapEntry::Sentinel);
            let is_upsert = matches!(self.current.as_ref().map(Statement::kind), Some(StatementKind::Upsert));

            if is_upsert && (!top_is_sentinel || self.is_last_level) {
                let base = match top {
                    HeapEntry::Source(idx) => Some(self.source_statement(idx).clone()),
                    HeapEntry::Sentinel => None,
                };
                let upsert = self.current.clone().expect("checked above");
                let applied = self.upsert_applier.apply(&upsert, base.as_ref(), self.key_def.as_ref())?;
                trace!(?applied, has_base = base.is_some(), "upsert folded");
                self.set_current(Some(applied), false);
            }

            if top_is_sentinel {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// The single writer of `current`: releases the prior refable
    /// statement, stores the new one, and acquires it if its source is
    /// refable.
    fn set_current(&mut self, new: Option<Statement>, refable: bool) {
        if let Some(prev) = self.current.take() {
            if self.current_refable {
                self.ref_tracker.release(&prev);
            }
        }
        debug_assert!(match (&self.current, &new) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(prev), Some(next)) =>
                self.key_def.compare(prev.key(), next.key()) == Ordering::Less || prev.version() >= next.version(),
        });
        if let Some(ref statement) = new {
            if refable {
                self.ref_tracker.acquire(statement);
            }
        }
        self.current = new;
        self.current_refable = refable;
    }

    fn source_statement(&self, idx: usize) -> &Statement {
        self.sources[idx]
            .as_ref()
            .expect("heap entry references live source")
            .current
            .as_ref()
            .expect("a live source always has a current statement")
    }

    fn make_less<'a>(
        sources: &'a [Option<Source>],
        current: &'a Option<Statement>,
        key_def: &'a dyn KeyDef,
    ) -> impl FnMut(HeapEntry, HeapEntry) -> bool + 'a {
        move |a, b| Self::entry_order(sources, current, key_def, a, b) == Ordering::Less
    }

    /// Key ascending, then version descending, then non-upsert before
    /// upsert; the sentinel sorts as the current key's key but strictly
    /// after every real node at that key.
    fn entry_order(
        sources: &[Option<Source>],
        current: &Option<Statement>,
        key_def: &dyn KeyDef,
        a: HeapEntry,
        b: HeapEntry,
    ) -> Ordering {
        match (a, b) {
            (HeapEntry::Sentinel, HeapEntry::Sentinel) => Ordering::Equal,
            (HeapEntry::Source(i), HeapEntry::Source(j)) => {
                let sa = sources[i].as_ref().unwrap().current.as_ref().unwrap();
                let sb = sources[j].as_ref().unwrap().current.as_ref().unwrap();
                key_def
                    .compare(sa.key(), sb.key())
                    .then_with(|| sb.version().cmp(&sa.version()))
                    .then_with(|| terminal_rank(sa.kind()).cmp(&terminal_rank(sb.kind())))
            }
            (HeapEntry::Source(i), HeapEntry::Sentinel) => {
                let sa = sources[i].as_ref().unwrap().current.as_ref().unwrap();
                let key = current.as_ref().expect("sentinel compared without an active key").key();
                match key_def.compare(sa.key(), key) {
                    Ordering::Equal => Ordering::Less,
                    other => other,
                }
            }
            (HeapEntry::Sentinel, HeapEntry::Source(_)) => {
                Self::entry_order(sources, current, key_def, b, a).reverse()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn simulate_sentinel_push_failure(&mut self) {
        self.fail_next_sentinel_push = true;
    }
}

fn terminal_rank(kind: StatementKind) -> u8 {
    if kind.is_terminal() {
        0
    } else {
        1
    }
}

impl Drop for WriteIterator {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            if self.current_refable {
                self.ref_tracker.release(&current);
            }
        }
        for slot in self.sources.iter_mut() {
            if let Some(source) = slot {
                source.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinyl_core::{ByteOrderKeyDef, EncodedKey, NoopRefTracker};
    use vinyl_testing::RecordingUpsertApplier;

    fn key(bytes: &[u8]) -> EncodedKey {
        EncodedKey::new(bytes.to_vec())
    }

    #[test]
    fn entry_order_ranks_smaller_key_first() {
        let sources = vec![
            Some(Source::new(Box::new(vinyl_testing::FakeStream::new(vec![])), false)),
            Some(Source::new(Box::new(vinyl_testing::FakeStream::new(vec![])), false)),
        ];
        let mut sources = sources;
        sources[0].as_mut().unwrap().current =
            Some(Statement::new(key(b"b"), Version(1), StatementKind::Replace, ColumnMask::NONE, b"".to_vec()));
        sources[1].as_mut().unwrap().current =
            Some(Statement::new(key(b"a"), Version(1), StatementKind::Replace, ColumnMask::NONE, b"".to_vec()));

        let key_def = ByteOrderKeyDef;
        let order = WriteIterator::entry_order(&sources, &None, &key_def, HeapEntry::Source(0), HeapEntry::Source(1));
        assert_eq!(order, Ordering::Greater);
    }

    #[test]
    fn simple_merge_across_two_runs_yields_ascending_keys() {
        let mut it = WriteIterator::new(
            Arc::new(ByteOrderKeyDef),
            Box::new(RecordingUpsertApplier::default()),
            Box::new(NoopRefTracker),
            true,
            ColumnMask::NONE,
            false,
            Version(100),
        );

        let run_a = crate::Run::builder()
            .push(key(b"a"), Version(5), StatementKind::Replace, ColumnMask::NONE, b"a5".to_vec())
            .push(key(b"c"), Version(5), StatementKind::Replace, ColumnMask::NONE, b"c5".to_vec())
            .build();
        let run_b = crate::Run::builder()
            .push(key(b"b"), Version(5), StatementKind::Replace, ColumnMask::NONE, b"b5".to_vec())
            .build();

        it.add_run(run_a.stream()).unwrap();
        it.add_run(run_b.stream()).unwrap();

        let mut keys = Vec::new();
        while let Some(statement) = it.next().unwrap() {
            keys.push(statement.key().as_bytes().to_vec());
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn sentinel_push_failure_aborts_squash_without_mutating_current() {
        let mut it = WriteIterator::new(
            Arc::new(ByteOrderKeyDef),
            Box::new(RecordingUpsertApplier::default()),
            Box::new(NoopRefTracker),
            true,
            ColumnMask::NONE,
            true,
            Version(100),
        );
        let run = crate::Run::builder()
            .push(key(b"a"), Version(10), StatementKind::Upsert, ColumnMask::NONE, b"+1".to_vec())
            .build();
        it.add_run(run.stream()).unwrap();

        it.simulate_sentinel_push_failure();
        let err = it.next().unwrap_err();
        assert!(matches!(err, Error::OutOfMemory));
        assert_eq!(it.current.as_ref().unwrap().kind(), StatementKind::Upsert);
    }
}
