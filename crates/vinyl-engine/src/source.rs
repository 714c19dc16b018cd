// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use crate::Stream;
use vinyl_core::Statement;

/// One input to the merge: a stream together with whatever statement it
/// most recently produced, plus whether statements from this source are
/// refable and therefore need to go through the ref-tracking protocol
/// before the write iterator may hold onto one past the source's next
/// advance.
pub(crate) struct Source {
    pub stream: Box<dyn Stream>,
    pub current: Option<Statement>,
    pub refable: bool,
    closed: bool,
}

impl Source {
    pub fn new(stream: Box<dyn Stream>, refable: bool) -> Self {
        Self { stream, current: None, refable, closed: false }
    }

    /// Pull the next statement into `current`. Closes the underlying
    /// stream exactly once on exhaustion.
    pub fn advance(&mut self) -> vinyl_core::Result<()> {
        if self.closed {
            self.current = None;
            return Ok(());
        }
        match self.stream.next()? {
            Some(statement) => self.current = Some(statement),
            None => {
                self.current = None;
                self.close();
            }
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.stream.close();
            self.closed = true;
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        self.close();
    }
}
