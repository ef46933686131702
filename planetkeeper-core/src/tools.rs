//! Locations of the external executables.

use crate::command::Invocation;

/// Program names or paths for each external tool.
///
/// Defaults resolve the tools through `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Streaming OSM processor used for tee extraction and replication.
    pub osmosis: String,
    /// Converter used for timestamps and sequential extraction.
    pub osmconvert: String,
    /// Extractor driven by a JSON manifest.
    pub osmium: String,
    /// Transfer tool for direct downloads.
    pub curl: String,
    /// Single-call updater.
    pub up_to_date: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            osmosis: "osmosis".to_owned(),
            osmconvert: "osmconvert".to_owned(),
            osmium: "osmium".to_owned(),
            curl: "curl".to_owned(),
            up_to_date: "pyosmium-up-to-date".to_owned(),
        }
    }
}

impl ToolPaths {
    /// Start an `osmosis` invocation.
    #[must_use]
    pub fn osmosis(&self) -> Invocation {
        Invocation::new(self.osmosis.as_str())
    }

    /// Start an `osmconvert` invocation.
    #[must_use]
    pub fn osmconvert(&self) -> Invocation {
        Invocation::new(self.osmconvert.as_str())
    }

    /// Start an `osmium` invocation.
    #[must_use]
    pub fn osmium(&self) -> Invocation {
        Invocation::new(self.osmium.as_str())
    }

    /// Start a `curl` invocation.
    #[must_use]
    pub fn curl(&self) -> Invocation {
        Invocation::new(self.curl.as_str())
    }

    /// Start a `pyosmium-up-to-date` invocation.
    #[must_use]
    pub fn up_to_date(&self) -> Invocation {
        Invocation::new(self.up_to_date.as_str())
    }
}
