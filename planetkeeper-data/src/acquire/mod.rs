//! Obtain a fresh snapshot.
//!
//! Both strategies refuse to touch an existing target: the precondition is
//! checked before any transfer starts.

mod direct;
mod error;
mod object_store;

use std::fmt;

use camino::Utf8PathBuf;
use log::info;
use planetkeeper_core::{CommandRunner, Snapshot, ToolPaths};

pub use error::{AcquisitionError, ObjectStoreError};
pub use object_store::{
    DEFAULT_BUCKET, DEFAULT_KEY_PATTERN, LocalMirrorStore, ObjectQuery, ObjectStore,
    select_latest,
};

/// Default URL of the latest full planet.
pub const DEFAULT_PLANET_URL: &str = "https://planet.openstreetmap.org/pbf/planet-latest.osm.pbf";

/// How a snapshot is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// Fetch one URL with `curl`.
    Direct {
        /// Source URL.
        url: String,
    },
    /// Download the newest matching object from an object store.
    ObjectStore(ObjectQuery),
}

impl Default for AcquisitionStrategy {
    fn default() -> Self {
        Self::Direct {
            url: DEFAULT_PLANET_URL.to_owned(),
        }
    }
}

/// Where an acquired snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionReport {
    /// Path of the new snapshot.
    pub target: Utf8PathBuf,
    /// URL or `bucket/key` the snapshot was fetched from.
    pub origin: String,
}

/// Runs acquisition strategies.
///
/// The object-store client is optional; requesting the object-store
/// strategy without one fails with [`AcquisitionError::MissingCredentials`].
pub struct Acquirer<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
    store: Option<&'a dyn ObjectStore>,
}

impl fmt::Debug for Acquirer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquirer")
            .field("tools", &self.tools)
            .field("store", &self.store.map(|_| "<object store>"))
            .finish_non_exhaustive()
    }
}

impl<'a> Acquirer<'a> {
    /// Create an acquirer without an object-store client.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a ToolPaths) -> Self {
        Self {
            runner,
            tools,
            store: None,
        }
    }

    /// Attach the object-store client.
    #[must_use]
    pub fn with_object_store(mut self, store: &'a dyn ObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Acquire a snapshot at `target` using `strategy`.
    ///
    /// # Errors
    ///
    /// [`AcquisitionError::Precondition`] when `target` already exists, and
    /// a strategy-specific error when the transfer fails.
    pub fn acquire(
        &self,
        strategy: &AcquisitionStrategy,
        target: &Snapshot,
    ) -> Result<AcquisitionReport, AcquisitionError> {
        target.require_absent()?;
        let origin = match strategy {
            AcquisitionStrategy::Direct { url } => self.fetch_direct(url, target)?,
            AcquisitionStrategy::ObjectStore(query) => self.fetch_latest_object(query, target)?,
        };
        Ok(AcquisitionReport {
            target: target.path().to_path_buf(),
            origin,
        })
    }

    fn fetch_direct(&self, url: &str, target: &Snapshot) -> Result<String, AcquisitionError> {
        info!("downloading {url} to {}", target.path());
        let invocation = direct::invocation(self.tools.curl(), target, url);
        self.runner
            .run(&invocation)
            .map_err(|source| AcquisitionError::Transfer {
                url: url.to_owned(),
                source,
            })?;
        Ok(url.to_owned())
    }

    fn fetch_latest_object(
        &self,
        query: &ObjectQuery,
        target: &Snapshot,
    ) -> Result<String, AcquisitionError> {
        let store = self.store.ok_or_else(|| AcquisitionError::MissingCredentials {
            bucket: query.bucket.clone(),
        })?;
        let matcher = query.matcher()?;
        let keys = store.list(&query.bucket, &query.prefix)?;
        let key = select_latest(keys, &matcher).ok_or_else(|| {
            AcquisitionError::NoMatchingObject {
                bucket: query.bucket.clone(),
                prefix: query.prefix.clone(),
                pattern: query.pattern.clone(),
            }
        })?;
        info!("downloading {}/{key} to {}", query.bucket, target.path());
        let bytes = store.download(&query.bucket, &key, target.path())?;
        info!("wrote {bytes} bytes to {}", target.path());
        Ok(format!("{}/{key}", query.bucket))
    }
}

#[cfg(test)]
mod tests;
