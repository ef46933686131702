//! Error type for the update pipelines.

use std::io;

use camino::Utf8PathBuf;
use planetkeeper_core::{ExternalToolError, PreconditionError, ResolutionError};
use thiserror::Error;

use super::lookup::LookupError;
use super::properties::PropertiesError;

/// Errors produced while bringing a snapshot up to date.
///
/// Every failure aborts the run. The workdir configuration and state stay
/// on disk, so the next run skips the bootstrap phases. Fetching always
/// starts from the recorded position; see [`super::WorkDir`] for what that
/// means after a failed apply.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpdateError {
    /// A path precondition failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// Creating the workdir failed.
    #[error("failed to create workdir {path:?}: {source}")]
    CreateWorkdir {
        /// Workdir path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a workdir file failed.
    #[error("failed to write {path:?}: {source}")]
    WriteWorkdirFile {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a workdir file failed.
    #[error("failed to read {path:?}: {source}")]
    ReadWorkdirFile {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing an applied changeset failed.
    #[error("failed to remove {path:?}: {source}")]
    RemoveWorkdirFile {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A workdir file did not have the expected keys.
    #[error("malformed {path:?}: {source}")]
    MalformedWorkdirFile {
        /// File path.
        path: Utf8PathBuf,
        /// Parsing failure.
        #[source]
        source: PropertiesError,
    },
    /// The snapshot timestamp could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// The sequence lookup failed.
    #[error("replication sequence lookup failed: {0}")]
    Lookup(#[from] LookupError),
    /// An external tool failed during `step`.
    #[error("{step} failed: {source}")]
    Tool {
        /// Pipeline step that invoked the tool.
        step: &'static str,
        /// Tool failure.
        #[source]
        source: ExternalToolError,
    },
}
