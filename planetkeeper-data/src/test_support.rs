//! In-memory collaborators for unit and behaviour tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;

use camino::Utf8Path;
use planetkeeper_core::SnapshotTimestamp;

use crate::acquire::{ObjectStore, ObjectStoreError};
use crate::replication::{LookupError, SequenceLookup};

/// [`SequenceLookup`] answering every timestamp with a fixed state.
#[derive(Debug, Default)]
pub struct StubLookup {
    state: Option<String>,
    calls: RefCell<Vec<String>>,
}

impl StubLookup {
    /// Answer every lookup with `state`.
    pub fn returning(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            calls: RefCell::default(),
        }
    }

    /// Fail every lookup with a network error.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Timestamps looked up so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl SequenceLookup for StubLookup {
    fn state_for(&self, timestamp: &SnapshotTimestamp) -> Result<String, LookupError> {
        self.calls.borrow_mut().push(timestamp.to_string());
        self.state.clone().ok_or_else(|| LookupError::Network {
            url: format!("stub://lookup?{timestamp}"),
            message: "lookup service unreachable".to_owned(),
        })
    }
}

/// [`ObjectStore`] backed by in-memory buckets.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    downloads: RefCell<Vec<String>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object.
    #[must_use]
    pub fn with_object(
        mut self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        self.buckets
            .entry(bucket.into())
            .or_default()
            .insert(key.into(), contents.into());
        self
    }

    /// `bucket/key` of every download so far.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.borrow().clone()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self
            .buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn download(
        &self,
        bucket: &str,
        key: &str,
        target: &Utf8Path,
    ) -> Result<u64, ObjectStoreError> {
        let failure = |source| ObjectStoreError::Download {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            target: target.to_path_buf(),
            source,
        };
        let contents = self
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| failure(io::Error::from(io::ErrorKind::NotFound)))?;
        planetkeeper_fs::write_new_file(target, contents).map_err(failure)?;
        self.downloads.borrow_mut().push(format!("{bucket}/{key}"));
        Ok(u64::try_from(contents.len()).unwrap_or(u64::MAX))
    }
}
