// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

#![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Primitives shared by the vinyl write iterator: encoded keys, statement
//! versions, the statement type itself, and the error taxonomy the
//! surrounding crates propagate.

pub use error::{Error, SimulatedFailure};
pub use key::{ByteOrderKeyDef, EncodedKey, KeyDef};
pub use reftrack::{NoopRefTracker, RefTracker};
pub use statement::{ColumnMask, Statement, StatementKind};
pub use version::Version;

mod error;
mod key;
mod reftrack;
mod statement;
mod version;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
