//! The managed planet snapshot and its path preconditions.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use planetkeeper_fs::{PathKind, path_kind};
use thiserror::Error;

/// Suffix appended to the snapshot file name to derive its workdir.
pub const WORKDIR_SUFFIX: &str = ".workdir";

/// Violations of the path preconditions guarding each operation.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// An operation that reads the snapshot found nothing at its path.
    #[error("snapshot {path:?} does not exist")]
    SnapshotMissing {
        /// Expected snapshot location.
        path: Utf8PathBuf,
    },
    /// The snapshot path is occupied by something other than a file.
    #[error("snapshot {path:?} is not a regular file")]
    SnapshotNotFile {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// Acquisition would overwrite an existing file.
    #[error("{path:?} already exists; refusing to overwrite")]
    AlreadyExists {
        /// Occupied target path.
        path: Utf8PathBuf,
    },
    /// A workdir path exists but is not a directory.
    #[error("workdir {path:?} exists and is not a directory")]
    NotADirectory {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// Inspecting a path failed.
    #[error("failed to inspect {path:?}: {source}")]
    Inspect {
        /// Path being inspected.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Classify `path`, mapping IO failures to [`PreconditionError::Inspect`].
pub fn inspect(path: &Utf8Path) -> Result<PathKind, PreconditionError> {
    path_kind(path).map_err(|source| PreconditionError::Inspect {
        path: path.to_path_buf(),
        source,
    })
}

/// A planet snapshot identified by its path.
///
/// The timestamp is never cached here; resolve it through
/// [`crate::TimestampResolver`] each time it is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    path: Utf8PathBuf,
}

impl Snapshot {
    /// Wrap a snapshot path.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Default replication workdir: `<dir>/<file name>.workdir`.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::Snapshot;
    ///
    /// let snapshot = Snapshot::new("/data/planet.osm.pbf");
    /// assert_eq!(snapshot.default_workdir(), "/data/planet.osm.pbf.workdir");
    /// ```
    #[must_use]
    pub fn default_workdir(&self) -> Utf8PathBuf {
        let name = self.path.file_name().unwrap_or("planet");
        let parent = self.path.parent().unwrap_or_else(|| Utf8Path::new(""));
        parent.join(format!("{name}{WORKDIR_SUFFIX}"))
    }

    /// Fail unless the snapshot exists as a regular file.
    pub fn require_exists(&self) -> Result<(), PreconditionError> {
        match inspect(&self.path)? {
            PathKind::File => Ok(()),
            PathKind::Missing => Err(PreconditionError::SnapshotMissing {
                path: self.path.clone(),
            }),
            PathKind::Directory | PathKind::Other => Err(PreconditionError::SnapshotNotFile {
                path: self.path.clone(),
            }),
        }
    }

    /// Fail if anything already exists at the snapshot path.
    pub fn require_absent(&self) -> Result<(), PreconditionError> {
        if inspect(&self.path)?.exists() {
            return Err(PreconditionError::AlreadyExists {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, path)
    }

    #[rstest]
    fn derives_relative_workdir() {
        let snapshot = Snapshot::new("planet.osm.pbf");
        assert_eq!(snapshot.default_workdir(), "planet.osm.pbf.workdir");
    }

    #[rstest]
    fn existing_file_satisfies_require_exists(root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = root;
        let path = root.join("planet.osm.pbf");
        std::fs::write(&path, b"pbf").expect("write snapshot");
        let snapshot = Snapshot::new(path);
        snapshot.require_exists().expect("snapshot exists");
        assert!(matches!(
            snapshot.require_absent(),
            Err(PreconditionError::AlreadyExists { .. })
        ));
    }

    #[rstest]
    fn missing_file_satisfies_require_absent(root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = root;
        let snapshot = Snapshot::new(root.join("planet.osm.pbf"));
        snapshot.require_absent().expect("snapshot absent");
        assert!(matches!(
            snapshot.require_exists(),
            Err(PreconditionError::SnapshotMissing { .. })
        ));
    }

    #[rstest]
    fn directory_is_not_a_snapshot(root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = root;
        let snapshot = Snapshot::new(root.clone());
        assert!(matches!(
            snapshot.require_exists(),
            Err(PreconditionError::SnapshotNotFile { .. })
        ));
    }
}
