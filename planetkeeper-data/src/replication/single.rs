//! Single-call update through `pyosmium-up-to-date`.

use camino::Utf8Path;
use log::info;
use planetkeeper_core::{CommandRunner, Snapshot, ToolPaths};

use super::{UpdateError, UpdateReport};

/// Default cache size passed to `-s`, in megabytes.
pub const DEFAULT_CACHE_SIZE: u32 = 1024;

/// Brings a snapshot current in one external call.
///
/// The tool tracks its own replication position inside the snapshot
/// header, so no workdir is involved.
pub struct UpToDateUpdater<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
    size: u32,
}

impl std::fmt::Debug for UpToDateUpdater<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpToDateUpdater")
            .field("tools", &self.tools)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<'a> UpToDateUpdater<'a> {
    /// Create an updater with the default cache size.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a ToolPaths) -> Self {
        Self {
            runner,
            tools,
            size: DEFAULT_CACHE_SIZE,
        }
    }

    /// Override the cache size.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Write an updated copy of `snapshot` to `output`.
    pub fn update(&self, snapshot: &Snapshot, output: &Utf8Path) -> Result<UpdateReport, UpdateError> {
        snapshot.require_exists()?;
        let invocation = self.tools.up_to_date().args([
            "-s".to_owned(),
            self.size.to_string(),
            "-v".to_owned(),
            snapshot.path().to_string(),
            "-o".to_owned(),
            output.to_string(),
        ]);
        self.runner
            .run(&invocation)
            .map_err(|source| UpdateError::Tool {
                step: "single-call update",
                source,
            })?;
        info!("updated {} into {output}", snapshot.path());
        Ok(UpdateReport {
            output: output.to_path_buf(),
            sequence_number: None,
        })
    }
}
