//! Error types produced while acquiring a snapshot.

use std::io;

use camino::Utf8PathBuf;
use planetkeeper_core::{ExternalToolError, PreconditionError};
use thiserror::Error;

/// Failures reported by an [`super::ObjectStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ObjectStoreError {
    /// Listing the bucket failed.
    #[error("failed to list bucket {bucket:?} under prefix {prefix:?}: {source}")]
    List {
        /// Bucket being listed.
        bucket: String,
        /// Key prefix filter.
        prefix: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Downloading an object failed.
    #[error("failed to download {bucket}/{key} to {target:?}: {source}")]
    Download {
        /// Bucket holding the object.
        bucket: String,
        /// Object key.
        key: String,
        /// Local destination.
        target: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors produced by the acquisition strategies.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AcquisitionError {
    /// The target is already occupied; nothing was transferred.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// The HTTP transfer tool failed.
    #[error("transfer from {url} failed: {source}")]
    Transfer {
        /// Source URL.
        url: String,
        /// Tool failure.
        #[source]
        source: ExternalToolError,
    },
    /// No object key matched the configured pattern.
    #[error("no object in bucket {bucket:?} under prefix {prefix:?} matches {pattern:?}")]
    NoMatchingObject {
        /// Bucket searched.
        bucket: String,
        /// Prefix searched.
        prefix: String,
        /// Pattern applied to each key.
        pattern: String,
    },
    /// No object-store client is configured.
    #[error("no object store client is configured for bucket {bucket:?}; supply a mirror")]
    MissingCredentials {
        /// Bucket that was requested.
        bucket: String,
    },
    /// The key pattern is not a valid regular expression.
    #[error("invalid object key pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },
    /// The object store failed while listing or downloading.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}
