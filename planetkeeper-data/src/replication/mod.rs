//! Keep a snapshot current with upstream replication diffs.
//!
//! Two backends are available. [`IntervalUpdater`] runs the four-phase
//! osmosis pipeline and persists its position in a [`WorkDir`];
//! [`UpToDateUpdater`] delegates the whole job to `pyosmium-up-to-date`.

mod error;
mod lookup;
mod pipeline;
mod properties;
mod single;
mod workdir;

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use planetkeeper_core::Snapshot;
use thiserror::Error;

pub use error::UpdateError;
pub use lookup::{
    DEFAULT_LOOKUP_URL, DEFAULT_USER_AGENT, HttpSequenceLookup, HttpSequenceLookupConfig,
    LookupError, SequenceLookup,
};
pub use pipeline::{IntervalUpdater, PhaseOutcome};
pub use properties::PropertiesError;
pub use single::{DEFAULT_CACHE_SIZE, UpToDateUpdater};
pub use workdir::{
    CHANGESET_FILE, CONFIGURATION_FILE, ReplicationConfig, ReplicationState, STATE_FILE,
    UpdatePhase, WorkDir,
};

/// Which update backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Four-phase osmosis pipeline with a persisted workdir.
    #[default]
    Interval,
    /// One `pyosmium-up-to-date` call.
    SingleCall,
}

impl UpdateStrategy {
    /// Name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::SingleCall => "single-call",
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown update strategy.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown update strategy {0:?}; expected interval or single-call")]
pub struct UnknownUpdateStrategy(pub String);

impl FromStr for UpdateStrategy {
    type Err = UnknownUpdateStrategy;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "interval" | "osmosis" => Ok(Self::Interval),
            "single-call" | "pyosmium" => Ok(Self::SingleCall),
            _ => Err(UnknownUpdateStrategy(input.to_owned())),
        }
    }
}

/// Outcome of a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Path of the updated snapshot.
    pub output: Utf8PathBuf,
    /// Replication sequence now recorded in the workdir, when known.
    pub sequence_number: Option<u64>,
}

/// A configured update backend.
#[derive(Debug)]
pub enum Updater<'a> {
    /// Interval pipeline.
    Interval(IntervalUpdater<'a>),
    /// Single-call backend.
    SingleCall(UpToDateUpdater<'a>),
}

impl Updater<'_> {
    /// Bring `snapshot` up to date, writing the result to `output`.
    pub fn update(&self, snapshot: &Snapshot, output: &Utf8Path) -> Result<UpdateReport, UpdateError> {
        match self {
            Self::Interval(updater) => updater.update(snapshot, output),
            Self::SingleCall(updater) => updater.update(snapshot, output),
        }
    }
}
