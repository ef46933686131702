//! Object-store listing and latest-key selection.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use regex::Regex;

use super::{AcquisitionError, ObjectStoreError};

/// Default bucket holding planet snapshots.
pub const DEFAULT_BUCKET: &str = "osm-pds";

/// Default pattern selecting planet snapshot keys.
pub const DEFAULT_KEY_PATTERN: &str = ".*(planet[-_:T0-9]+.osm.pbf)$";

/// Minimal object-store capability: list keys and download one.
pub trait ObjectStore {
    /// List every key in `bucket` starting with `prefix`.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    /// Download `key` from `bucket` into a new file at `target`.
    ///
    /// Returns the number of bytes written.
    fn download(&self, bucket: &str, key: &str, target: &Utf8Path)
    -> Result<u64, ObjectStoreError>;
}

/// Which objects to consider and how to recognise a snapshot among them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectQuery {
    /// Bucket to list.
    pub bucket: String,
    /// Key prefix filter.
    pub prefix: String,
    /// Regular expression matched from the start of each key.
    pub pattern: String,
}

impl Default for ObjectQuery {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_owned(),
            prefix: String::new(),
            pattern: DEFAULT_KEY_PATTERN.to_owned(),
        }
    }
}

impl ObjectQuery {
    /// Compile the pattern, anchored at the start of the key.
    pub(super) fn matcher(&self) -> Result<Regex, AcquisitionError> {
        Regex::new(&format!("^(?:{})", self.pattern)).map_err(|source| {
            AcquisitionError::InvalidPattern {
                pattern: self.pattern.clone(),
                source,
            }
        })
    }
}

/// Pick the lexicographically greatest key matching `matcher`.
#[must_use]
pub fn select_latest<I>(keys: I, matcher: &Regex) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    keys.into_iter()
        .filter(|key| matcher.is_match(key))
        .inspect(|key| debug!("candidate snapshot {key}"))
        .max()
}

/// Filesystem-backed object store: each bucket is a subdirectory of `root`
/// and keys are `/`-separated paths inside it.
#[derive(Debug, Clone)]
pub struct LocalMirrorStore {
    root: Utf8PathBuf,
}

impl LocalMirrorStore {
    /// Serve buckets from subdirectories of `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Utf8PathBuf {
        self.root.join(bucket)
    }
}

impl ObjectStore for LocalMirrorStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let keys = planetkeeper_fs::list_files(&self.bucket_dir(bucket)).map_err(|source| {
            ObjectStoreError::List {
                bucket: bucket.to_owned(),
                prefix: prefix.to_owned(),
                source,
            }
        })?;
        Ok(keys
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn download(
        &self,
        bucket: &str,
        key: &str,
        target: &Utf8Path,
    ) -> Result<u64, ObjectStoreError> {
        let object_path = self.bucket_dir(bucket).join(key);
        planetkeeper_fs::copy_to_new_file(&object_path, target).map_err(|source| {
            ObjectStoreError::Download {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                target: target.to_path_buf(),
                source,
            }
        })
    }
}
