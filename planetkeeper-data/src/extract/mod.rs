//! Carve named regions out of a snapshot.
//!
//! Three interchangeable strategies are supported:
//!
//! - [`ExtractionStrategy::Tee`] reads the snapshot once and writes every
//!   rectangle in a single `osmosis` pipeline.
//! - [`ExtractionStrategy::Sequential`] runs `osmconvert` once per
//!   rectangle, attempting every region even after a failure.
//! - [`ExtractionStrategy::ConfigFile`] hands `osmium extract` a manifest
//!   and is the only strategy accepting polygons and lines.
//!
//! Each region is written to `<output_dir>/<name>.osm.pbf`.

mod error;
mod manifest;
mod sequential;
mod tee;

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use planetkeeper_core::{
    Bounds, CommandRunner, GeometrySource, RegionName, RegionSet, Snapshot, ToolPaths,
    validate_bbox,
};
use thiserror::Error;

pub use error::{ExtractionError, RegionFailure};

/// Default `osmium extract` strategy.
pub const DEFAULT_OSMIUM_STRATEGY: &str = "complete_ways";

/// The backend used to cut regions out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// One multiplexed `osmosis` run.
    Tee,
    /// One `osmconvert` run per region.
    Sequential,
    /// One `osmium extract` run driven by a manifest.
    ConfigFile {
        /// Value passed to `osmium extract -s`.
        osmium_strategy: String,
    },
}

impl ExtractionStrategy {
    /// Manifest-driven extraction with the default osmium strategy.
    #[must_use]
    pub fn config_file() -> Self {
        Self::ConfigFile {
            osmium_strategy: DEFAULT_OSMIUM_STRATEGY.to_owned(),
        }
    }

    /// Short name used on the command line and in messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tee => "tee",
            Self::Sequential => "sequential",
            Self::ConfigFile { .. } => "config",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown extraction strategy {0:?}; expected tee, sequential or config")]
pub struct UnknownExtractionStrategy(pub String);

impl FromStr for ExtractionStrategy {
    type Err = UnknownExtractionStrategy;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "tee" => Ok(Self::Tee),
            "sequential" => Ok(Self::Sequential),
            "config" | "config-file" => Ok(Self::config_file()),
            _ => Err(UnknownExtractionStrategy(input.to_owned())),
        }
    }
}

/// Inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Snapshot to read.
    pub snapshot: &'a Snapshot,
    /// Regions to write.
    pub regions: &'a RegionSet,
    /// Directory receiving `<name>.osm.pbf` files.
    pub output_dir: &'a Utf8Path,
    /// Worker hint for the tee strategy.
    pub workers: NonZeroUsize,
}

/// Runs extraction strategies through a [`CommandRunner`].
pub struct Extractor<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
}

impl fmt::Debug for Extractor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl<'a> Extractor<'a> {
    /// Create an extractor invoking tools through `runner`.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a ToolPaths) -> Self {
        Self { runner, tools }
    }

    /// Extract every region in `request` using `strategy`.
    ///
    /// Returns the paths of the written extracts, ordered by region name.
    ///
    /// # Errors
    ///
    /// Fails before spawning anything when the snapshot is missing, the set
    /// is empty, or a region cannot be handled by `strategy`.
    ///
    /// # Examples
    /// ```
    /// use std::num::NonZeroUsize;
    /// use camino::Utf8Path;
    /// use planetkeeper_core::{RecordingRunner, RegionSet, Snapshot, ToolPaths};
    /// use planetkeeper_data::extract::{ExtractRequest, ExtractionStrategy, Extractor};
    ///
    /// # let dir = tempfile::tempdir()?;
    /// # let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("planet.osm.pbf")).unwrap();
    /// # std::fs::write(&path, b"")?;
    /// let snapshot = Snapshot::new(path);
    /// let mut regions = RegionSet::new();
    /// regions.insert_assignment("soho=-0.14,51.51,-0.13,51.52")?;
    /// let runner = RecordingRunner::new();
    /// let tools = ToolPaths::default();
    /// let request = ExtractRequest {
    ///     snapshot: &snapshot,
    ///     regions: &regions,
    ///     output_dir: Utf8Path::new("out"),
    ///     workers: NonZeroUsize::MIN,
    /// };
    /// let written = Extractor::new(&runner, &tools).extract(&ExtractionStrategy::Tee, &request)?;
    /// assert_eq!(written, ["out/soho.osm.pbf"]);
    /// assert_eq!(runner.invocations().len(), 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn extract(
        &self,
        strategy: &ExtractionStrategy,
        request: &ExtractRequest<'_>,
    ) -> Result<Vec<Utf8PathBuf>, ExtractionError> {
        if request.regions.is_empty() {
            return Err(ExtractionError::NoRegions);
        }
        request.snapshot.require_exists()?;
        info!(
            "extracting {} region(s) from {} with the {strategy} strategy",
            request.regions.len(),
            request.snapshot.path()
        );
        match strategy {
            ExtractionStrategy::Tee => self.extract_tee(request),
            ExtractionStrategy::Sequential => self.extract_sequential(request),
            ExtractionStrategy::ConfigFile { osmium_strategy } => {
                self.extract_config_file(osmium_strategy, request)
            }
        }?;
        Ok(output_paths(request))
    }

    fn extract_tee(&self, request: &ExtractRequest<'_>) -> Result<(), ExtractionError> {
        let rectangles = rectangles(request.regions, "tee")?;
        let invocation = tee::invocation(self.tools.osmosis(), request, &rectangles);
        self.runner
            .run(&invocation)
            .map(drop)
            .map_err(|source| ExtractionError::Tool {
                strategy: "tee",
                source,
            })
    }

    fn extract_sequential(&self, request: &ExtractRequest<'_>) -> Result<(), ExtractionError> {
        let rectangles = rectangles(request.regions, "sequential")?;
        let mut failures = Vec::new();
        for (name, bounds) in rectangles {
            let invocation = sequential::invocation(
                self.tools.osmconvert(),
                request.snapshot,
                name,
                bounds,
                request.output_dir,
            );
            if let Err(source) = self.runner.run(&invocation) {
                warn!("extraction of region {name} failed: {source}");
                failures.push(RegionFailure {
                    region: name.clone(),
                    source,
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExtractionError::RegionsFailed { failures })
        }
    }

    fn extract_config_file(
        &self,
        osmium_strategy: &str,
        request: &ExtractRequest<'_>,
    ) -> Result<(), ExtractionError> {
        let manifest = manifest::Manifest::build(request.regions, request.output_dir)?;
        let file = manifest.write_temporary()?;
        let manifest_path = utf8_manifest_path(file.path())?;
        let invocation = self.tools.osmium().args([
            "extract",
            "-s",
            osmium_strategy,
            "-c",
            manifest_path.as_str(),
            request.snapshot.path().as_str(),
        ]);
        let outcome = self.runner.run(&invocation);
        // Dropping the guard deletes the manifest on both paths.
        drop(file);
        outcome.map(drop).map_err(|source| ExtractionError::Tool {
            strategy: "config",
            source,
        })
    }
}

fn utf8_manifest_path(path: &Path) -> Result<&Utf8Path, ExtractionError> {
    Utf8Path::from_path(path).ok_or_else(|| ExtractionError::NonUtf8Manifest {
        path: path.to_path_buf(),
    })
}

/// Collect and validate every region as a rectangle.
fn rectangles<'r>(
    regions: &'r RegionSet,
    strategy: &'static str,
) -> Result<Vec<(&'r RegionName, &'r Bounds)>, ExtractionError> {
    regions
        .iter()
        .map(|(name, geometry)| match geometry {
            GeometrySource::Rectangle(bounds) => validate_bbox(bounds)
                .map(|()| (name, bounds))
                .map_err(|source| ExtractionError::InvalidRegion {
                    region: name.clone(),
                    source,
                }),
            other => Err(ExtractionError::UnsupportedGeometry {
                region: name.clone(),
                strategy,
                kind: other.kind(),
            }),
        })
        .collect()
}

fn output_paths(request: &ExtractRequest<'_>) -> Vec<Utf8PathBuf> {
    request
        .regions
        .iter()
        .map(|(name, _)| request.output_dir.join(name.output_file_name()))
        .collect()
}
