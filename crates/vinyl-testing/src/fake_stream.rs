// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vinyl_core::{Error, Result, SimulatedFailure, Statement};
use vinyl_engine::Stream;

/// A scripted [`Stream`]: yields a fixed sequence of statements, optionally
/// failing once a configured call index is reached.
///
/// The closed flag lives behind an `Arc` so a test can keep a handle
/// ([`FakeStream::closed_handle`]) to observe it after the stream itself
/// has been handed to a `WriteIterator` and is no longer reachable.
pub struct FakeStream {
    queue: VecDeque<Statement>,
    fail_at_call: Option<usize>,
    calls: usize,
    closed: Arc<AtomicBool>,
}

impl FakeStream {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { queue: statements.into(), fail_at_call: None, calls: 0, closed: Arc::new(AtomicBool::new(false)) }
    }

    /// Fail on the `n`th call to `next` (0-indexed) instead of yielding.
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at_call = Some(n);
        self
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// A handle that keeps reporting `was_closed`-equivalent state after
    /// this stream has been moved into a `WriteIterator`.
    pub fn closed_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl Stream for FakeStream {
    fn next(&mut self) -> Result<Option<Statement>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at_call == Some(call) {
            return Err(Error::stream(SimulatedFailure(format!("simulated failure on call {call}"))));
        }
        Ok(self.queue.pop_front())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
