//! Resolve the effective timestamp of a snapshot.
//!
//! The converter's direct timestamp mode reads the file header. Some
//! encodings omit that header, in which case the converter answers with a
//! message containing `invalid`; the resolver then falls back to the
//! statistics mode and reads the `timestamp max` line.

use std::fmt;

use camino::Utf8PathBuf;
use log::debug;
use thiserror::Error;

use crate::command::{CommandRunner, ExternalToolError};
use crate::snapshot::Snapshot;
use crate::tools::ToolPaths;

const INVALID_MARKER: &str = "invalid";
const STATISTICS_KEY: &str = "timestamp max";

/// Errors raised while resolving a snapshot timestamp.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The converter failed.
    #[error("timestamp lookup for {path:?} failed: {source}")]
    Tool {
        /// Snapshot being inspected.
        path: Utf8PathBuf,
        /// Converter failure.
        #[source]
        source: ExternalToolError,
    },
    /// Neither the header nor the statistics carried a timestamp.
    #[error("no timestamp found for {path:?} in the header or the statistics")]
    Missing {
        /// Snapshot being inspected.
        path: Utf8PathBuf,
    },
}

/// The effective timestamp of a snapshot, as printed by the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTimestamp(String);

impl SnapshotTimestamp {
    /// Wrap a timestamp string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Consume the wrapper and return the inner [`String`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SnapshotTimestamp {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives snapshot timestamps through the converter.
pub struct TimestampResolver<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
}

impl fmt::Debug for TimestampResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampResolver")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl<'a> TimestampResolver<'a> {
    /// Build a resolver that invokes the converter through `runner`.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a ToolPaths) -> Self {
        Self { runner, tools }
    }

    /// Resolve the timestamp of `snapshot`.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::{RecordingRunner, Snapshot, TimestampResolver, ToolPaths};
    ///
    /// let runner = RecordingRunner::new()
    ///     .respond_to("--out-timestamp", "(invalid timestamp)\n")
    ///     .respond_to("--out-statistics", "lon min: -180\ntimestamp max: 2024-05-01T00:00:00Z\n");
    /// let tools = ToolPaths::default();
    /// let resolver = TimestampResolver::new(&runner, &tools);
    /// let timestamp = resolver.resolve(&Snapshot::new("planet.osm.pbf"))?;
    /// assert_eq!(timestamp.as_ref(), "2024-05-01T00:00:00Z");
    /// # Ok::<(), planetkeeper_core::ResolutionError>(())
    /// ```
    pub fn resolve(&self, snapshot: &Snapshot) -> Result<SnapshotTimestamp, ResolutionError> {
        let direct = self.convert(snapshot, "--out-timestamp")?;
        let trimmed = direct.trim();
        if !trimmed.is_empty() && !trimmed.contains(INVALID_MARKER) {
            return Ok(SnapshotTimestamp::new(trimmed));
        }

        debug!("no header timestamp in {}; reading statistics", snapshot.path());
        let statistics = self.convert(snapshot, "--out-statistics")?;
        parse_statistics(&statistics)
            .map(SnapshotTimestamp::new)
            .ok_or_else(|| ResolutionError::Missing {
                path: snapshot.path().to_path_buf(),
            })
    }

    fn convert(&self, snapshot: &Snapshot, mode: &str) -> Result<String, ResolutionError> {
        let invocation = self
            .tools
            .osmconvert()
            .arg(snapshot.path().as_str())
            .arg(mode);
        self.runner
            .run(&invocation)
            .map_err(|source| ResolutionError::Tool {
                path: snapshot.path().to_path_buf(),
                source,
            })
    }
}

/// Extract the value of the first `timestamp max` line.
///
/// The value is everything after the first colon, trimmed; an empty value
/// counts as absent.
pub(crate) fn parse_statistics(statistics: &str) -> Option<&str> {
    statistics
        .lines()
        .find(|line| line.starts_with(STATISTICS_KEY))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RecordingRunner;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tools() -> ToolPaths {
        ToolPaths::default()
    }

    #[fixture]
    fn snapshot() -> Snapshot {
        Snapshot::new("/data/planet.osm.pbf")
    }

    #[rstest]
    fn trims_direct_timestamp(tools: ToolPaths, snapshot: Snapshot) {
        let runner = RecordingRunner::new().respond_to("--out-timestamp", "2024-05-01T00:00:00Z\n");
        let timestamp = TimestampResolver::new(&runner, &tools)
            .resolve(&snapshot)
            .expect("timestamp");
        assert_eq!(timestamp.as_ref(), "2024-05-01T00:00:00Z");
        let invocations = runner.into_invocations();
        assert_eq!(invocations.len(), 1, "no fallback expected");
        assert_eq!(
            invocations.first().map(|inv| inv.argv()),
            Some(vec!["osmconvert", "/data/planet.osm.pbf", "--out-timestamp"])
        );
    }

    #[rstest]
    fn falls_back_to_statistics(tools: ToolPaths, snapshot: Snapshot) {
        let statistics = "timestamp min: 2007-01-01T00:00:00Z\n\
                          timestamp max: 2024-05-01T12:30:00Z \n\
                          lon min: -180.0000000\n";
        let runner = RecordingRunner::new()
            .respond_to("--out-timestamp", "(invalid timestamp)")
            .respond_to("--out-statistics", statistics);
        let timestamp = TimestampResolver::new(&runner, &tools)
            .resolve(&snapshot)
            .expect("timestamp");
        assert_eq!(timestamp.as_ref(), "2024-05-01T12:30:00Z");
        let modes: Vec<_> = runner
            .invocations()
            .iter()
            .filter_map(|inv| inv.arguments().last().cloned())
            .collect();
        assert_eq!(modes, ["--out-timestamp", "--out-statistics"]);
    }

    #[rstest]
    fn reports_missing_statistic(tools: ToolPaths, snapshot: Snapshot) {
        let runner = RecordingRunner::new()
            .respond_to("--out-timestamp", "invalid")
            .respond_to("--out-statistics", "lon min: -180\n");
        let err = TimestampResolver::new(&runner, &tools)
            .resolve(&snapshot)
            .expect_err("no timestamp");
        assert!(matches!(err, ResolutionError::Missing { .. }));
    }

    #[rstest]
    fn surfaces_converter_failure(tools: ToolPaths, snapshot: Snapshot) {
        let runner = RecordingRunner::new().fail_on("osmconvert");
        let err = TimestampResolver::new(&runner, &tools)
            .resolve(&snapshot)
            .expect_err("tool failure");
        assert!(matches!(err, ResolutionError::Tool { .. }));
    }

    #[rstest]
    #[case("timestamp max: 2024-01-01T00:00:00Z", Some("2024-01-01T00:00:00Z"))]
    #[case("timestamp max:", None)]
    #[case("timestamp min: 2024-01-01T00:00:00Z", None)]
    #[case("", None)]
    fn parses_statistics_lines(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_statistics(input), expected);
    }
}
