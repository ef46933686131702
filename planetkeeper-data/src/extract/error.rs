//! Error types produced by the extraction strategies.

use std::io;
use std::path::PathBuf;

use planetkeeper_core::{
    ExternalToolError, GeometryError, GeometryKind, PreconditionError, RegionName,
};
use thiserror::Error;

/// A single region that failed during sequential extraction.
#[derive(Debug)]
pub struct RegionFailure {
    /// Region whose extraction failed.
    pub region: RegionName,
    /// Converter failure for that region.
    pub source: ExternalToolError,
}

/// Errors produced while extracting regions from a snapshot.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    /// The region set was empty.
    #[error("no regions were supplied for extraction")]
    NoRegions,
    /// The snapshot could not be read.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// A rectangle-only strategy was handed another geometry kind.
    #[error("region {region}: the {strategy} strategy only accepts rectangles, found {kind}")]
    UnsupportedGeometry {
        /// Offending region.
        region: RegionName,
        /// Strategy that rejected the region.
        strategy: &'static str,
        /// Kind that was supplied.
        kind: GeometryKind,
    },
    /// A region's geometry failed validation.
    #[error("region {region}: {source}")]
    InvalidRegion {
        /// Offending region.
        region: RegionName,
        /// Validation failure.
        #[source]
        source: GeometryError,
    },
    /// The extraction tool failed.
    #[error("{strategy} extraction failed: {source}")]
    Tool {
        /// Strategy that invoked the tool.
        strategy: &'static str,
        /// Tool failure.
        #[source]
        source: ExternalToolError,
    },
    /// One or more regions failed while the rest were still attempted.
    #[error("extraction failed for {}", failed_names(.failures))]
    RegionsFailed {
        /// Every failed region, in the order attempted.
        failures: Vec<RegionFailure>,
    },
    /// Writing the temporary extract manifest failed.
    #[error("failed to write extract manifest: {source}")]
    WriteManifest {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The temporary manifest landed on a path that is not valid UTF-8.
    #[error("extract manifest path {path:?} is not valid UTF-8")]
    NonUtf8Manifest {
        /// Path of the temporary manifest.
        path: PathBuf,
    },
    /// Serialising the extract manifest failed.
    #[error("failed to encode extract manifest: {source}")]
    EncodeManifest {
        /// Serialisation failure.
        #[source]
        source: serde_json::Error,
    },
}

fn failed_names(failures: &[RegionFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.region, failure.source))
        .collect::<Vec<_>>()
        .join("; ")
}
