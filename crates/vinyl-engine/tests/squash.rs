// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use std::sync::Arc;
use vinyl_core::{ByteOrderKeyDef, ColumnMask, EncodedKey, NoopRefTracker, StatementKind, Version};
use vinyl_engine::{Run, WriteIterator};
use vinyl_testing::RecordingUpsertApplier;

fn key(bytes: &[u8]) -> EncodedKey {
    EncodedKey::new(bytes.to_vec())
}

fn iterator(is_last_level: bool, oldest_vlsn: u64) -> WriteIterator {
    WriteIterator::new(
        Arc::new(ByteOrderKeyDef),
        Box::new(RecordingUpsertApplier::default()),
        Box::new(NoopRefTracker),
        true,
        ColumnMask::NONE,
        is_last_level,
        Version(oldest_vlsn),
    )
}

#[test]
fn horizon_squash_silently_drops_the_shadowed_replace() {
    let mut it = iterator(false, 100);

    let newer = Run::builder()
        .push(key(b"a"), Version(10), StatementKind::Replace, ColumnMask::NONE, b"new".to_vec())
        .build();
    let older = Run::builder()
        .push(key(b"a"), Version(5), StatementKind::Replace, ColumnMask::NONE, b"old".to_vec())
        .build();

    it.add_run(newer.stream()).unwrap();
    it.add_run(older.stream()).unwrap();

    let only = it.next().unwrap().unwrap();
    assert_eq!(only.version(), Version(10));
    assert_eq!(only.payload(), b"new");
    assert!(it.next().unwrap().is_none());
}

#[test]
fn upsert_folds_onto_base_when_not_at_last_level() {
    let mut it = iterator(false, 100);

    let upsert = Run::builder()
        .push(key(b"a"), Version(10), StatementKind::Upsert, ColumnMask::NONE, b"+1".to_vec())
        .build();
    let base = Run::builder()
        .push(key(b"a"), Version(5), StatementKind::Replace, ColumnMask::NONE, b"base".to_vec())
        .build();

    it.add_run(upsert.stream()).unwrap();
    it.add_run(base.stream()).unwrap();

    let folded = it.next().unwrap().unwrap();
    assert_eq!(folded.kind(), StatementKind::Replace);
    assert_eq!(folded.version(), Version(10));
    assert_eq!(folded.payload(), b"base+1");
    assert!(it.next().unwrap().is_none());
}

#[test]
fn upsert_folds_against_nil_base_at_the_last_level() {
    let mut it = iterator(true, 100);

    let upsert = Run::builder()
        .push(key(b"a"), Version(10), StatementKind::Upsert, ColumnMask::NONE, b"+1".to_vec())
        .build();
    it.add_run(upsert.stream()).unwrap();

    let folded = it.next().unwrap().unwrap();
    assert_eq!(folded.kind(), StatementKind::Replace);
    assert_eq!(folded.payload(), b"+1");
    assert!(it.next().unwrap().is_none());
}

#[test]
fn upsert_above_horizon_is_not_folded() {
    let mut it = iterator(true, 0);

    let upsert = Run::builder()
        .push(key(b"a"), Version(10), StatementKind::Upsert, ColumnMask::NONE, b"+1".to_vec())
        .build();
    it.add_run(upsert.stream()).unwrap();

    let unchanged = it.next().unwrap().unwrap();
    assert_eq!(unchanged.kind(), StatementKind::Upsert);
    assert_eq!(unchanged.payload(), b"+1");
}
