//! Replication cadence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root of the public planet replication feeds.
pub const REPLICATION_ROOT: &str = "https://planet.openstreetmap.org/replication";

/// Granularity of the remote change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationGrain {
    /// Minutely diffs.
    #[default]
    Minute,
    /// Hourly diffs.
    Hour,
    /// Daily diffs.
    Day,
}

impl ReplicationGrain {
    /// Lower-case name used in replication URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Public replication feed for this grain.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::ReplicationGrain;
    ///
    /// assert_eq!(
    ///     ReplicationGrain::Hour.replication_url(),
    ///     "https://planet.openstreetmap.org/replication/hour",
    /// );
    /// ```
    #[must_use]
    pub fn replication_url(self) -> String {
        format!("{REPLICATION_ROOT}/{}", self.as_str())
    }
}

impl fmt::Display for ReplicationGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a grain name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown replication grain {0:?} (expected minute, hour or day)")]
pub struct UnknownGrain(pub String);

impl FromStr for ReplicationGrain {
    type Err = UnknownGrain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            _ => Err(UnknownGrain(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minute", ReplicationGrain::Minute)]
    #[case("Hour", ReplicationGrain::Hour)]
    #[case(" day ", ReplicationGrain::Day)]
    fn parses_names(#[case] input: &str, #[case] expected: ReplicationGrain) {
        assert_eq!(input.parse::<ReplicationGrain>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_names() {
        assert!("weekly".parse::<ReplicationGrain>().is_err());
    }

    #[rstest]
    fn defaults_to_minute() {
        assert_eq!(
            ReplicationGrain::default().replication_url(),
            "https://planet.openstreetmap.org/replication/minute"
        );
    }
}
