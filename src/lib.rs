//! Facade crate for planetkeeper, a toolkit that keeps OpenStreetMap planet
//! snapshots current.
//!
//! This crate re-exports the domain types from `planetkeeper-core` together
//! with the acquisition, extraction and replication workflows from
//! `planetkeeper-data`. Test doubles are available behind the `test-support`
//! feature.

#![forbid(unsafe_code)]

pub use planetkeeper_core::{
    Bounds, CommandRunner, ExternalToolError, GeometryError, GeometryKind, GeometrySource,
    Invocation, PreconditionError, ProcessRunner, RecordingRunner, RegionError, RegionName,
    RegionSet, ReplicationGrain, ResolutionError, Snapshot, SnapshotTimestamp, TimestampResolver,
    ToolPaths,
};

pub use planetkeeper_data::acquire::{
    AcquisitionError, AcquisitionReport, AcquisitionStrategy, Acquirer, LocalMirrorStore,
    ObjectQuery, ObjectStore,
};
pub use planetkeeper_data::extract::{ExtractRequest, ExtractionError, ExtractionStrategy, Extractor};
pub use planetkeeper_data::replication::{
    HttpSequenceLookup, IntervalUpdater, SequenceLookup, UpToDateUpdater, UpdateError,
    UpdatePhase, UpdateReport, UpdateStrategy, Updater, WorkDir,
};

#[cfg(feature = "test-support")]
pub use planetkeeper_data::test_support;
