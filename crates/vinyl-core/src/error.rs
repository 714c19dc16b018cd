// Copyright (c) reifydb.com 2025
// This file is licensed under the AGPL-3.0-or-later

use std::fmt;

/// The three error kinds the write iterator and its collaborators can
/// raise. No retry is ever performed at this layer; every error
/// propagates to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Allocation failed while growing the merge heap or a source.
    #[error("out of memory")]
    OutOfMemory,

    /// An underlying stream failed to decode or read its next statement.
    #[error("stream read failed: {source}")]
    Stream {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Folding an upsert onto its base statement failed.
    #[error("upsert apply failed: {reason}")]
    Apply { reason: String },
}

impl Error {
    /// Wrap an arbitrary stream failure as an [`Error::Stream`].
    pub fn stream(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Stream { source: Box::new(source) }
    }

    /// Build an [`Error::Apply`] from a plain message, the common case for
    /// malformed-upsert detection where there is no underlying error type.
    pub fn apply(reason: impl Into<String>) -> Self {
        Error::Apply { reason: reason.into() }
    }
}

/// A minimal `std::error::Error` implementor used by test doubles that
/// need to simulate a stream failure without pulling in a real I/O error.
#[derive(Debug)]
pub struct SimulatedFailure(pub String);

impl fmt::Display for SimulatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SimulatedFailure {}
