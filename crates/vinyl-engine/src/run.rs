// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use crate::Stream;
use std::sync::Arc;
use vinyl_core::{ColumnMask, EncodedKey, Result, Statement, StatementKind, Version};

/// A pre-sorted stand-in for an on-disk sorted run. Real page I/O and
/// decompression are external collaborators (§6 of the spec); this models
/// the decode step as a pure function over rows already resident in
/// memory, which is all the write iterator's merge logic depends on.
#[derive(Clone)]
pub struct Run {
    rows: Arc<Vec<Statement>>,
}

impl Run {
    /// Build a run from statements that are already in ascending key order
    /// (as any real sorted run would be on disk).
    pub fn from_sorted(rows: Vec<Statement>) -> Self {
        Self { rows: Arc::new(rows) }
    }

    pub fn builder() -> RunBuilder {
        RunBuilder::default()
    }

    pub fn stream(&self) -> RunStream {
        RunStream { run: self.rows.clone(), pos: 0 }
    }
}

/// Convenience builder mirroring how a dump assembles a run row by row.
#[derive(Default)]
pub struct RunBuilder {
    rows: Vec<Statement>,
}

impl RunBuilder {
    pub fn push(
        mut self,
        key: EncodedKey,
        version: Version,
        kind: StatementKind,
        column_mask: ColumnMask,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        self.rows.push(Statement::new(key, version, kind, column_mask, payload));
        self
    }

    pub fn build(self) -> Run {
        Run::from_sorted(self.rows)
    }
}

/// A [`Stream`] over a [`Run`]. Every call decodes (here: clones) a fresh
/// row, so the statement it returns is non-refable in spirit — nothing
/// about holding it past the next call aliases stream-internal state —
/// and no acquire/release protocol is needed to retain it.
pub struct RunStream {
    run: Arc<Vec<Statement>>,
    pos: usize,
}

impl Stream for RunStream {
    fn next(&mut self) -> Result<Option<Statement>> {
        let Some(statement) = self.run.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        Ok(Some(statement.clone()))
    }
}
