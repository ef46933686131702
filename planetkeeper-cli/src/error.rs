//! Error types emitted by the planetkeeper CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use planetkeeper_core::{PreconditionError, RegionError, UnknownGrain};
use planetkeeper_data::acquire::AcquisitionError;
use planetkeeper_data::extract::{ExtractionError, UnknownExtractionStrategy};
use planetkeeper_data::replication::{LookupError, UnknownUpdateStrategy, UpdateError};
use thiserror::Error;

/// Errors emitted by the planetkeeper CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Options selecting different sources were combined.
    #[error("--{first} cannot be combined with --{second}")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },
    /// Dry runs only cover commands that go through external tools.
    #[error("--dry-run is not available for {action}")]
    DryRunUnsupported { action: &'static str },
    /// The extraction strategy name is not recognised.
    #[error(transparent)]
    ExtractionStrategy(#[from] UnknownExtractionStrategy),
    /// The update strategy name is not recognised.
    #[error(transparent)]
    UpdateStrategy(#[from] UnknownUpdateStrategy),
    /// The replication grain name is not recognised.
    #[error(transparent)]
    Grain(#[from] UnknownGrain),
    /// A region definition was rejected.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// Reading the regions file failed.
    #[error("failed to read regions file {path:?}: {source}")]
    ReadRegionsFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The regions file is not valid JSON.
    #[error("failed to parse regions file {path:?}: {source}")]
    ParseRegionsFile {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory { path: Utf8PathBuf },
    /// Creating an output directory failed.
    #[error("failed to create directory {path:?}: {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A path precondition failed before any work started.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// Acquisition failed.
    #[error("acquisition failed: {0}")]
    Acquire(#[from] AcquisitionError),
    /// Extraction failed.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractionError),
    /// Constructing the sequence lookup client failed.
    #[error("failed to build sequence lookup for {base_url:?}: {source}")]
    BuildLookup {
        base_url: String,
        #[source]
        source: LookupError,
    },
    /// The update failed.
    #[error("update failed: {0}")]
    Update(#[from] UpdateError),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
