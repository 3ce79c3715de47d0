// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A specialized `Result` type for plant catalog operations
/// that return a catalog [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error originating in the plant catalog.
///
/// Failures of the remote sort order lookup never show up here: they are absorbed by the sort
/// order cache, which falls back to an empty order. Future versions may add additional enum
/// variants.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A request to the plant service failed.
    #[error("plant service request failed: {0}")]
    Network(String),

    /// The plant store could not serve a query or apply a write.
    #[error("plant store failure: {0}")]
    Storage(String),

    /// A sort offloaded to the blocking pool panicked or was cancelled.
    #[error("background sort did not complete")]
    Background(#[from] tokio::task::JoinError),

    /// A JSON document (fixture data or configuration) could not be decoded.
    #[error("malformed JSON document")]
    Decode(#[from] serde_json::Error),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
