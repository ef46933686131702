//! The four-phase interval update pipeline driven by osmosis.
//!
//! ```text
//! Uninitialized -> WorkdirReady -> StateReady -> ChangesetFetched -> Applied
//! ```
//!
//! The first two phases are skipped when their artefact already exists;
//! fetching and applying always run. A failure anywhere aborts the run and
//! leaves the artefacts of completed phases in place for the next attempt.
//! The changeset is scratch: a successful apply deletes it, returning the
//! workdir to `StateReady`.

use std::fmt;

use camino::Utf8Path;
use log::{debug, info, warn};
use planetkeeper_core::{
    CommandRunner, PreconditionError, ReplicationGrain, Snapshot, TimestampResolver, ToolPaths,
    inspect,
};
use planetkeeper_fs::PathKind;

use super::lookup::SequenceLookup;
use super::workdir::{ReplicationConfig, UpdatePhase, WorkDir};
use super::{UpdateError, UpdateReport};

/// Whether a bootstrap phase did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The phase ran.
    Ran,
    /// The phase's artefact already existed.
    Skipped,
}

/// Incremental updater following a replication feed through a workdir.
pub struct IntervalUpdater<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
    lookup: &'a dyn SequenceLookup,
    workdir: WorkDir,
    changeset_url: String,
}

impl fmt::Debug for IntervalUpdater<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalUpdater")
            .field("tools", &self.tools)
            .field("workdir", &self.workdir)
            .field("changeset_url", &self.changeset_url)
            .finish_non_exhaustive()
    }
}

impl<'a> IntervalUpdater<'a> {
    /// Create an updater following the minutely feed.
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        tools: &'a ToolPaths,
        lookup: &'a dyn SequenceLookup,
        workdir: WorkDir,
    ) -> Self {
        Self {
            runner,
            tools,
            lookup,
            workdir,
            changeset_url: ReplicationGrain::default().replication_url(),
        }
    }

    /// Follow the public feed for `grain`.
    #[must_use]
    pub fn with_grain(self, grain: ReplicationGrain) -> Self {
        self.with_changeset_url(grain.replication_url())
    }

    /// Follow an explicit replication feed.
    #[must_use]
    pub fn with_changeset_url(mut self, url: impl Into<String>) -> Self {
        self.changeset_url = url.into();
        self
    }

    /// The workdir this updater maintains.
    #[must_use]
    pub const fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// Run every phase, writing the updated snapshot to `output`.
    ///
    /// # Errors
    ///
    /// [`PreconditionError::SnapshotMissing`] when the snapshot is absent;
    /// otherwise the error of the first failing phase.
    pub fn update(&self, snapshot: &Snapshot, output: &Utf8Path) -> Result<UpdateReport, UpdateError> {
        snapshot.require_exists()?;
        self.bootstrap_workdir()?;
        self.bootstrap_state(snapshot)?;
        self.fetch_changeset()?;
        self.apply_changeset(snapshot, output)?;
        let sequence_number = match self.workdir.read_state() {
            Ok(state) => {
                info!(
                    "replication advanced to sequence {} ({})",
                    state.sequence_number, state.timestamp
                );
                Some(state.sequence_number)
            }
            Err(err) => {
                warn!("could not read replication position: {err}");
                None
            }
        };
        Ok(UpdateReport {
            output: output.to_path_buf(),
            sequence_number,
        })
    }

    /// Create the workdir and its configuration unless already present.
    pub fn bootstrap_workdir(&self) -> Result<PhaseOutcome, UpdateError> {
        let path = self.workdir.path();
        match inspect(path)? {
            PathKind::Missing | PathKind::Directory => {}
            PathKind::File | PathKind::Other => {
                return Err(PreconditionError::NotADirectory {
                    path: path.to_path_buf(),
                }
                .into());
            }
        }
        let configuration = self.workdir.configuration_path();
        if inspect(&configuration)?.exists() {
            info!("{configuration} exists; skipping workdir bootstrap");
            return Ok(PhaseOutcome::Skipped);
        }
        planetkeeper_fs::create_dir_all(path).map_err(|source| UpdateError::CreateWorkdir {
            path: path.to_path_buf(),
            source,
        })?;
        let invocation = self.tools.osmosis().args([
            "--read-replication-interval-init".to_owned(),
            format!("workingDirectory={path}"),
        ]);
        self.run_step("workdir initialisation", &invocation)?;
        self.workdir
            .write_configuration(&ReplicationConfig::new(self.changeset_url.as_str()))?;
        info!("{} reached {}", path, UpdatePhase::WorkdirReady);
        Ok(PhaseOutcome::Ran)
    }

    /// Record the replication position matching the snapshot unless
    /// already present.
    pub fn bootstrap_state(&self, snapshot: &Snapshot) -> Result<PhaseOutcome, UpdateError> {
        let state = self.workdir.state_path();
        if inspect(&state)?.exists() {
            info!("{state} exists; skipping state bootstrap");
            return Ok(PhaseOutcome::Skipped);
        }
        let timestamp = TimestampResolver::new(self.runner, self.tools).resolve(snapshot)?;
        info!("snapshot {} is current to {timestamp}", snapshot.path());
        let blob = self.lookup.state_for(&timestamp)?;
        self.workdir.write_state(&blob)?;
        info!("{} reached {}", self.workdir.path(), UpdatePhase::StateReady);
        Ok(PhaseOutcome::Ran)
    }

    /// Download the changes since the recorded position.
    ///
    /// Advances `state.txt` as a side effect of the tool run.
    pub fn fetch_changeset(&self) -> Result<(), UpdateError> {
        let invocation = self.tools.osmosis().args([
            "--read-replication-interval".to_owned(),
            format!("workingDirectory={}", self.workdir.path()),
            "--simplify-change".to_owned(),
            "--write-xml-change".to_owned(),
            self.workdir.changeset_path().into_string(),
        ]);
        self.run_step("changeset fetch", &invocation)?;
        info!(
            "{} reached {}",
            self.workdir.path(),
            UpdatePhase::ChangesetFetched
        );
        Ok(())
    }

    /// Merge the fetched changeset into `snapshot`, writing `output`.
    ///
    /// The changeset is removed once the tool succeeds and kept when it
    /// fails.
    pub fn apply_changeset(&self, snapshot: &Snapshot, output: &Utf8Path) -> Result<(), UpdateError> {
        let invocation = self.tools.osmosis().args([
            "--read-xml-change".to_owned(),
            self.workdir.changeset_path().into_string(),
            "--read-pbf".to_owned(),
            snapshot.path().to_string(),
            "--apply-change".to_owned(),
            "--write-pbf".to_owned(),
            output.to_string(),
        ]);
        self.run_step("changeset application", &invocation)?;
        if self.workdir.discard_changeset()? {
            debug!("removed applied changeset {}", self.workdir.changeset_path());
        }
        info!("{output} reached {}", UpdatePhase::Applied);
        Ok(())
    }

    fn run_step(
        &self,
        step: &'static str,
        invocation: &planetkeeper_core::Invocation,
    ) -> Result<(), UpdateError> {
        self.runner
            .run(invocation)
            .map(drop)
            .map_err(|source| UpdateError::Tool { step, source })
    }
}
