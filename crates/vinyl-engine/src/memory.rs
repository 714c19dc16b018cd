// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use crate::Stream;
use crossbeam_skiplist::SkipMap;
use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::Arc;
use vinyl_core::{ColumnMask, EncodedKey, Result, Statement, StatementKind, Version};

/// Orders a level's entries by key ascending, then version descending, so
/// multiple versions of the same key sit together with the newest first —
/// the order a memory level naturally produces for a dump.
#[derive(Clone, Eq, PartialEq)]
struct LevelKey(EncodedKey, Version);

impl Ord for LevelKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0).then_with(|| other.1.cmp(&self.1))
    }
}

impl PartialOrd for LevelKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered in-memory container of statements awaiting dump. Backed by a
/// lock-free skip list so a level can keep accepting writes from other
/// threads while a compaction worker drains it through a [`MemoryStream`].
#[derive(Clone, Default)]
pub struct MemoryLevel {
    entries: Arc<SkipMap<LevelKey, Statement>>,
}

impl MemoryLevel {
    pub fn new() -> Self {
        Self { entries: Arc::new(SkipMap::new()) }
    }

    pub fn insert(
        &self,
        key: EncodedKey,
        version: Version,
        kind: StatementKind,
        column_mask: ColumnMask,
        payload: impl Into<Vec<u8>>,
    ) {
        let statement = Statement::new(key.clone(), version, kind, column_mask, payload);
        self.entries.insert(LevelKey(key, version), statement);
    }

    pub fn stream(&self) -> MemoryStream {
        MemoryStream { level: self.entries.clone(), last: None }
    }
}

/// A [`Stream`] over a [`MemoryLevel`]. Statements it yields are refable:
/// the level itself still owns the backing `Statement`, so the write
/// iterator must go through the ref-tracking acquire/release protocol to
/// retain one past the stream's next advance.
pub struct MemoryStream {
    level: Arc<SkipMap<LevelKey, Statement>>,
    last: Option<LevelKey>,
}

impl Stream for MemoryStream {
    fn next(&mut self) -> Result<Option<Statement>> {
        let bound = match &self.last {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let Some(entry) = self.level.range((bound, Bound::Unbounded)).next() else {
            return Ok(None);
        };
        self.last = Some(entry.key().clone());
        Ok(Some(entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_in_key_then_version_descending_order() {
        let level = MemoryLevel::new();
        level.insert(EncodedKey::new(b"b".to_vec()), Version(1), StatementKind::Replace, ColumnMask::NONE, b"b1".to_vec());
        level.insert(EncodedKey::new(b"a".to_vec()), Version(2), StatementKind::Replace, ColumnMask::NONE, b"a2".to_vec());
        level.insert(EncodedKey::new(b"a".to_vec()), Version(1), StatementKind::Replace, ColumnMask::NONE, b"a1".to_vec());

        let mut stream = level.stream();
        let s1 = stream.next().unwrap().unwrap();
        assert_eq!(s1.key().as_bytes(), b"a");
        assert_eq!(s1.version(), Version(2));

        let s2 = stream.next().unwrap().unwrap();
        assert_eq!(s2.key().as_bytes(), b"a");
        assert_eq!(s2.version(), Version(1));

        let s3 = stream.next().unwrap().unwrap();
        assert_eq!(s3.key().as_bytes(), b"b");

        assert!(stream.next().unwrap().is_none());
    }
}
