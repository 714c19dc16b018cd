// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use vinyl_core::{Result, Statement};

/// A lazy, ordered producer of statements over one source. Streams are
/// pull-only; the write iterator never assumes fairness or blocking
/// semantics, so an implementation may block internally on I/O.
pub trait Stream: Send {
    /// Advance and return the next statement, or `None` at exhaustion.
    fn next(&mut self) -> Result<Option<Statement>>;

    /// Idempotent release of any resources the stream holds. Called once
    /// a stream exhausts and again (safely) when the write iterator is
    /// dropped.
    fn close(&mut self) {}
}
