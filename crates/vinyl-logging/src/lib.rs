// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

//! Minimal `tracing` subscriber setup for binaries that embed the write
//! iterator. The iterator and its collaborators emit `trace`/`debug`
//! events only, so a compaction worker's log stays quiet unless the
//! caller raises `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that writes to stdout, filtered by the
/// `RUST_LOG` environment variable (defaulting to `info` when unset).
/// Safe to call once at process start; calling it twice panics, matching
/// `tracing_subscriber`'s own global-subscriber contract.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
