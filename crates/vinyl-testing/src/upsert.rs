// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use std::sync::Mutex;
use vinyl_core::{ColumnMask, KeyDef, Result, Statement, StatementKind};
use vinyl_engine::UpsertApplier;

/// An [`UpsertApplier`] that records every fold it is asked to perform, in
/// order, so tests can assert both the fold order and its inputs.
///
/// Its fold rule is deterministic but otherwise arbitrary: the result's
/// kind mirrors the base's kind (or `Replace` with no base), and its
/// payload is the base payload with the upsert payload appended, which is
/// enough to distinguish folded-from-nil, folded-once, and folded-twice
/// outcomes in assertions without modeling real column decoding.
#[derive(Default)]
pub struct RecordingUpsertApplier {
    calls: Mutex<Vec<(Statement, Option<Statement>)>>,
}

impl RecordingUpsertApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(Statement, Option<Statement>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UpsertApplier for RecordingUpsertApplier {
    fn apply(&self, upsert: &Statement, base: Option<&Statement>, _key_def: &dyn KeyDef) -> Result<Statement> {
        self.calls.lock().unwrap().push((upsert.clone(), base.cloned()));

        let kind = match base {
            Some(base) if !base.kind().is_terminal() => StatementKind::Upsert,
            Some(base) => base.kind(),
            None => StatementKind::Replace,
        };
        let mut payload = base.map(|base| base.payload().to_vec()).unwrap_or_default();
        payload.extend_from_slice(upsert.payload());

        Ok(Statement::new(upsert.key().clone(), upsert.version(), kind, ColumnMask::NONE, payload))
    }
}
