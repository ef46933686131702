//! Core domain types for planetkeeper.
//!
//! This crate holds everything that does not touch the network: region
//! geometries and their validation, the snapshot and its timestamp, the
//! replication grain, and the [`CommandRunner`] abstraction through which
//! every external tool is invoked.

#![forbid(unsafe_code)]

mod command;
mod geometry;
mod grain;
mod region;
mod snapshot;
mod timestamp;
mod tools;

pub use command::{CommandRunner, ExternalToolError, Invocation, ProcessRunner, RecordingRunner};
pub use geometry::{Bounds, GeometryError, GeometryKind, GeometrySource, validate_bbox};
pub use grain::{REPLICATION_ROOT, ReplicationGrain, UnknownGrain};
pub use region::{RegionError, RegionName, RegionSet};
pub use snapshot::{PreconditionError, Snapshot, WORKDIR_SUFFIX, inspect};
pub use timestamp::{ResolutionError, SnapshotTimestamp, TimestampResolver};
pub use tools::ToolPaths;
