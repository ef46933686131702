//! The replication working directory and the state persisted in it.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use planetkeeper_core::{PreconditionError, Snapshot, inspect};
use planetkeeper_fs::PathKind;

use super::UpdateError;
use super::properties::{Properties, PropertiesError};

/// Replication configuration file, written once at bootstrap.
pub const CONFIGURATION_FILE: &str = "configuration.txt";
/// Replication position file, advanced by each changeset fetch.
pub const STATE_FILE: &str = "state.txt";
/// Scratch file holding the most recently fetched changeset.
pub const CHANGESET_FILE: &str = "changeset.osm.gz";

/// Where an interval update pipeline stands for a given workdir.
///
/// Phases are detected purely from which artefacts exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdatePhase {
    /// No configuration yet.
    Uninitialized,
    /// Configuration written; no replication position.
    WorkdirReady,
    /// Replication position recorded; no changeset fetched.
    StateReady,
    /// A fetched changeset has not been applied yet.
    ChangesetFetched,
    /// The changeset was applied to produce the output snapshot.
    Applied,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::WorkdirReady => "workdir-ready",
            Self::StateReady => "state-ready",
            Self::ChangesetFetched => "changeset-fetched",
            Self::Applied => "applied",
        })
    }
}

/// Contents of `configuration.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Replication feed the workdir follows.
    pub base_url: String,
    /// Upper bound on the span of one fetch, in seconds; `0` means unbounded.
    pub max_interval: u64,
}

impl ReplicationConfig {
    /// Configuration following `base_url` with no interval bound.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_interval: 0,
        }
    }

    /// Render the file body.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "baseUrl={}\nmaxInterval={}\n",
            self.base_url, self.max_interval
        )
    }

    /// Parse a file body.
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let properties = Properties::parse(text);
        Ok(Self {
            base_url: properties.require("baseUrl")?.to_owned(),
            max_interval: properties.number("maxInterval")?.unwrap_or_default(),
        })
    }
}

/// Contents of `state.txt`: a position in the replication stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationState {
    /// Sequence number of the last applied replication diff.
    pub sequence_number: u64,
    /// Timestamp of that diff, unescaped.
    pub timestamp: String,
}

impl ReplicationState {
    /// Parse a state document as written by osmosis or the lookup service.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_data::replication::ReplicationState;
    ///
    /// let state = ReplicationState::parse("sequenceNumber=42\ntimestamp=2024-05-01T00\\:00\\:00Z\n")?;
    /// assert_eq!(state.sequence_number, 42);
    /// assert_eq!(state.timestamp, "2024-05-01T00:00:00Z");
    /// # Ok::<(), planetkeeper_data::replication::PropertiesError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let properties = Properties::parse(text);
        let sequence_number = properties
            .number("sequenceNumber")?
            .ok_or(PropertiesError::MissingKey {
                key: "sequenceNumber",
            })?;
        Ok(Self {
            sequence_number,
            timestamp: properties.require("timestamp")?.to_owned(),
        })
    }
}

/// Replication working directory.
///
/// A workdir belongs to exactly one snapshot. Running two pipelines against
/// the same workdir at once corrupts `state.txt`; callers must serialise
/// access themselves.
///
/// Fetching a changeset advances `state.txt` before the changeset is
/// applied. If applying then fails, the next run fetches again from the
/// advanced position and overwrites the unapplied changeset, so the
/// changes it held never reach the output. Keep a copy of
/// `changeset.osm.gz` before retrying when that window matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    path: Utf8PathBuf,
}

impl WorkDir {
    /// Use `path` as the workdir.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default workdir beside `snapshot`.
    #[must_use]
    pub fn for_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(snapshot.default_workdir())
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Path of `configuration.txt`.
    #[must_use]
    pub fn configuration_path(&self) -> Utf8PathBuf {
        self.path.join(CONFIGURATION_FILE)
    }

    /// Path of `state.txt`.
    #[must_use]
    pub fn state_path(&self) -> Utf8PathBuf {
        self.path.join(STATE_FILE)
    }

    /// Path of the changeset scratch file.
    #[must_use]
    pub fn changeset_path(&self) -> Utf8PathBuf {
        self.path.join(CHANGESET_FILE)
    }

    /// Detect the pipeline phase from the artefacts present.
    ///
    /// Never reports [`UpdatePhase::Applied`]; the applied output lives
    /// outside the workdir.
    pub fn phase(&self) -> Result<UpdatePhase, PreconditionError> {
        match inspect(&self.path)? {
            PathKind::Missing => return Ok(UpdatePhase::Uninitialized),
            PathKind::Directory => {}
            PathKind::File | PathKind::Other => {
                return Err(PreconditionError::NotADirectory {
                    path: self.path.clone(),
                });
            }
        }
        let phase = if !inspect(&self.configuration_path())?.exists() {
            UpdatePhase::Uninitialized
        } else if !inspect(&self.state_path())?.exists() {
            UpdatePhase::WorkdirReady
        } else if !inspect(&self.changeset_path())?.exists() {
            UpdatePhase::StateReady
        } else {
            UpdatePhase::ChangesetFetched
        };
        Ok(phase)
    }

    /// Read back `configuration.txt`.
    pub fn read_configuration(&self) -> Result<ReplicationConfig, UpdateError> {
        let path = self.configuration_path();
        let text = planetkeeper_fs::read_to_string(&path).map_err(|source| {
            UpdateError::ReadWorkdirFile {
                path: path.clone(),
                source,
            }
        })?;
        ReplicationConfig::parse(&text).map_err(|source| UpdateError::MalformedWorkdirFile {
            path,
            source,
        })
    }

    /// Read `state.txt`.
    pub fn read_state(&self) -> Result<ReplicationState, UpdateError> {
        let path = self.state_path();
        let text = planetkeeper_fs::read_to_string(&path).map_err(|source| {
            UpdateError::ReadWorkdirFile {
                path: path.clone(),
                source,
            }
        })?;
        ReplicationState::parse(&text).map_err(|source| UpdateError::MalformedWorkdirFile {
            path,
            source,
        })
    }

    pub(super) fn write_configuration(&self, config: &ReplicationConfig) -> Result<(), UpdateError> {
        let path = self.configuration_path();
        planetkeeper_fs::write_file(&path, config.render().as_bytes())
            .map_err(|source| UpdateError::WriteWorkdirFile { path, source })
    }

    pub(super) fn write_state(&self, blob: &str) -> Result<(), UpdateError> {
        let path = self.state_path();
        planetkeeper_fs::write_new_file(&path, blob.as_bytes())
            .map_err(|source| UpdateError::WriteWorkdirFile { path, source })
    }

    pub(super) fn discard_changeset(&self) -> Result<bool, UpdateError> {
        let path = self.changeset_path();
        planetkeeper_fs::remove_file_if_exists(&path)
            .map_err(|source| UpdateError::RemoveWorkdirFile { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    #[rstest]
    fn phase_follows_artefacts(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let workdir = WorkDir::new(root.join("planet.osm.pbf.workdir"));
        assert_eq!(workdir.phase().expect("phase"), UpdatePhase::Uninitialized);

        std::fs::create_dir(workdir.path()).expect("mkdir");
        assert_eq!(workdir.phase().expect("phase"), UpdatePhase::Uninitialized);

        workdir
            .write_configuration(&ReplicationConfig::new("https://example.org/minute"))
            .expect("configuration");
        assert_eq!(workdir.phase().expect("phase"), UpdatePhase::WorkdirReady);

        workdir
            .write_state("sequenceNumber=1\ntimestamp=2024-01-01T00\\:00\\:00Z\n")
            .expect("state");
        assert_eq!(workdir.phase().expect("phase"), UpdatePhase::StateReady);

        std::fs::write(workdir.changeset_path(), b"").expect("changeset");
        assert_eq!(workdir.phase().expect("phase"), UpdatePhase::ChangesetFetched);
    }

    #[rstest]
    fn phase_rejects_file_in_place_of_workdir(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let path = root.join("workdir");
        std::fs::write(&path, b"").expect("file");
        assert!(matches!(
            WorkDir::new(path).phase(),
            Err(PreconditionError::NotADirectory { .. })
        ));
    }

    #[rstest]
    fn configuration_round_trips_through_disk(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let workdir = WorkDir::new(root);
        let config = ReplicationConfig::new("https://planet.openstreetmap.org/replication/hour");
        workdir.write_configuration(&config).expect("write");
        assert_eq!(
            std::fs::read_to_string(workdir.configuration_path()).expect("raw"),
            "baseUrl=https://planet.openstreetmap.org/replication/hour\nmaxInterval=0\n"
        );
        assert_eq!(workdir.read_configuration().expect("read"), config);
    }

    #[rstest]
    fn state_is_never_overwritten(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let workdir = WorkDir::new(root);
        workdir
            .write_state("sequenceNumber=7\ntimestamp=x\n")
            .expect("first write");
        assert!(matches!(
            workdir.write_state("sequenceNumber=8\ntimestamp=y\n"),
            Err(UpdateError::WriteWorkdirFile { .. })
        ));
        assert_eq!(workdir.read_state().expect("state").sequence_number, 7);
    }

    #[rstest]
    fn default_workdir_sits_beside_snapshot() {
        let workdir = WorkDir::for_snapshot(&Snapshot::new("/data/planet.osm.pbf"));
        assert_eq!(workdir.path(), "/data/planet.osm.pbf.workdir");
        assert_eq!(
            workdir.state_path(),
            "/data/planet.osm.pbf.workdir/state.txt"
        );
    }
}
