// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use std::sync::Arc;
use vinyl_core::{KeyDef, Result, Statement};

/// Folds an upsert statement onto the base row beneath it, producing the
/// resulting row. Injected so the fold logic (column decode, default
/// application, expression evaluation) stays outside the merge core and
/// can be driven by a deterministic fake in tests.
///
/// `base` is `None` exactly when the upsert reached the bottom of the
/// level stack with nothing underneath it — the last-level, no-base case
/// the fold must still resolve into a terminal row. `key_def` is passed
/// through for appliers whose fold depends on how the key decodes (e.g.
/// extracting a partition or shard component from it); simple value folds
/// can ignore it.
pub trait UpsertApplier: Send {
    fn apply(&self, upsert: &Statement, base: Option<&Statement>, key_def: &dyn KeyDef) -> Result<Statement>;
}

/// Lets a shared, externally observed applier (an `Arc` a test keeps a
/// handle to) be passed wherever an `UpsertApplier` is expected.
impl<T: UpsertApplier + ?Sized + Sync> UpsertApplier for Arc<T> {
    fn apply(&self, upsert: &Statement, base: Option<&Statement>, key_def: &dyn KeyDef) -> Result<Statement> {
        (**self).apply(upsert, base, key_def)
    }
}
