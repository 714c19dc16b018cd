// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use crate::{EncodedKey, Version};
use std::fmt;
use std::sync::Arc;

/// The closed set of statement types a write iterator ever sees.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StatementKind {
    Replace,
    Delete,
    Upsert,
}

impl StatementKind {
    /// Non-upsert statements are terminal: they fully determine a key's
    /// value without reference to prior state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, StatementKind::Upsert)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Replace => f.write_str("REPLACE"),
            StatementKind::Delete => f.write_str("DELETE"),
            StatementKind::Upsert => f.write_str("UPSERT"),
        }
    }
}

/// A 64-bit set of logical columns touched by an update. Zero on
/// statements that are not the output of an update operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct ColumnMask(pub u64);

impl ColumnMask {
    pub const NONE: ColumnMask = ColumnMask(0);

    /// `true` when this update's columns are disjoint from `index_mask`,
    /// meaning a secondary index built on `index_mask` did not change and
    /// this statement can be elided from that index's run.
    pub fn can_skip(self, index_mask: ColumnMask) -> bool {
        (index_mask.0 & self.0) == 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

struct StatementBody {
    key: EncodedKey,
    version: Version,
    kind: StatementKind,
    column_mask: ColumnMask,
    payload: Vec<u8>,
}

/// An immutable statement. Cheap to clone (an `Arc` bump) regardless of
/// whether its originating source is refable or not — see the ownership
/// discussion in `DESIGN.md` for why the refable/non-refable split is
/// handled at the `Source`/`RefTracker` layer rather than here.
#[derive(Clone)]
pub struct Statement(Arc<StatementBody>);

impl Statement {
    pub fn new(
        key: EncodedKey,
        version: Version,
        kind: StatementKind,
        column_mask: ColumnMask,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Statement(Arc::new(StatementBody {
            key,
            version,
            kind,
            column_mask,
            payload: payload.into(),
        }))
    }

    pub fn key(&self) -> &EncodedKey {
        &self.0.key
    }

    pub fn version(&self) -> Version {
        self.0.version
    }

    pub fn kind(&self) -> StatementKind {
        self.0.kind
    }

    pub fn column_mask(&self) -> ColumnMask {
        self.0.column_mask
    }

    pub fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    /// An opaque pointer identity, used by `RefTracker` implementations to
    /// key their acquire/release bookkeeping without caring about the
    /// statement's contents.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("key", &self.0.key)
            .field("version", &self.0.version)
            .field("kind", &self.0.kind)
            .field("column_mask", &self.0.column_mask.0)
            .finish()
    }
}
