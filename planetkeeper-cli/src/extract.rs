//! `extract` command implementation.

use std::io::Write;
use std::num::NonZeroUsize;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use planetkeeper_core::{CommandRunner, RecordingRunner, RegionSet, Snapshot, ToolPaths};
use planetkeeper_data::extract::{ExtractRequest, ExtractionStrategy, Extractor};
use planetkeeper_fs::PathKind;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DRY_RUN, ARG_EXTRACT_STRATEGY, ARG_OUT, ARG_REGION, ARG_REGIONS_FILE, ARG_SNAPSHOT,
    ARG_STRATEGY, ARG_WORKERS, CliError, ENV_EXTRACT_SNAPSHOT, write_invocations,
};

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Write one <name>.osm.pbf extract per region. Regions are \
                 given as NAME=GEOMETRY pairs, where GEOMETRY is either \
                 left,bottom,right,top or a GeoJSON geometry, or loaded from \
                 a JSON file keyed by region name. The tee and sequential \
                 strategies accept rectangles only; the config strategy also \
                 accepts polygons.",
    about = "Cut regional extracts out of a snapshot"
)]
#[ortho_config(prefix = "PLANETKEEPER")]
pub(crate) struct ExtractArgs {
    /// Snapshot to read.
    #[arg(long = ARG_SNAPSHOT, value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Extraction strategy: tee, sequential or config (default tee).
    #[arg(long = ARG_STRATEGY, value_name = "name")]
    #[serde(default)]
    pub(crate) strategy: Option<String>,
    /// Region as NAME=GEOMETRY; repeat for several regions.
    #[arg(long = ARG_REGION, value_name = "NAME=GEOMETRY")]
    #[serde(default)]
    pub(crate) region: Vec<String>,
    /// JSON object mapping region names to geometries.
    #[arg(long = ARG_REGIONS_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) regions_file: Option<Utf8PathBuf>,
    /// Directory receiving the extracts (default: current directory).
    #[arg(long = ARG_OUT, value_name = "dir")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
    /// Worker threads for the tee strategy (default 1).
    #[arg(long = ARG_WORKERS, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<NonZeroUsize>,
    /// Osmium strategy used by the config strategy.
    #[arg(long = ARG_EXTRACT_STRATEGY, value_name = "name")]
    #[serde(default)]
    pub(crate) extract_strategy: Option<String>,
    /// Print the extraction commands instead of running them.
    #[arg(long = ARG_DRY_RUN)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) dry_run: bool,
}

impl ExtractArgs {
    pub(crate) fn into_config(self) -> Result<ExtractConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractConfig::try_from(merged)
    }
}

/// Resolved `extract` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractConfig {
    pub(crate) snapshot: Snapshot,
    pub(crate) strategy: ExtractionStrategy,
    pub(crate) regions: RegionSet,
    pub(crate) output_dir: Utf8PathBuf,
    pub(crate) workers: NonZeroUsize,
    pub(crate) dry_run: bool,
}

impl TryFrom<ExtractArgs> for ExtractConfig {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_EXTRACT_SNAPSHOT,
        })?;
        let strategy = resolve_strategy(args.strategy.as_deref(), args.extract_strategy)?;
        let mut regions = RegionSet::new();
        if let Some(path) = &args.regions_file {
            load_regions_file(path, &mut regions)?;
        }
        for assignment in &args.region {
            regions.insert_assignment(assignment)?;
        }
        Ok(Self {
            snapshot: Snapshot::new(snapshot),
            strategy,
            regions,
            output_dir: args.out.unwrap_or_else(|| Utf8PathBuf::from(".")),
            workers: args.workers.unwrap_or(NonZeroUsize::MIN),
            dry_run: args.dry_run,
        })
    }
}

fn resolve_strategy(
    name: Option<&str>,
    osmium_strategy: Option<String>,
) -> Result<ExtractionStrategy, CliError> {
    let strategy = name.map_or(Ok(ExtractionStrategy::Tee), ExtractionStrategy::from_str)?;
    Ok(match (strategy, osmium_strategy) {
        (ExtractionStrategy::ConfigFile { .. }, Some(osmium_strategy)) => {
            ExtractionStrategy::ConfigFile { osmium_strategy }
        }
        (other, _) => other,
    })
}

/// Load a JSON regions document into `regions`.
pub(crate) fn load_regions_file(path: &Utf8Path, regions: &mut RegionSet) -> Result<(), CliError> {
    let contents =
        planetkeeper_fs::read_to_string(path).map_err(|source| CliError::ReadRegionsFile {
            path: path.to_path_buf(),
            source,
        })?;
    let document: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| CliError::ParseRegionsFile {
            path: path.to_path_buf(),
            source,
        })?;
    regions.extend_from_json(&document)?;
    Ok(())
}

pub(crate) fn run_extract_with(
    args: ExtractArgs,
    runner: &dyn CommandRunner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_extract(&config, runner, writer)
}

pub(crate) fn execute_extract(
    config: &ExtractConfig,
    runner: &dyn CommandRunner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let tools = ToolPaths::default();
    let request = ExtractRequest {
        snapshot: &config.snapshot,
        regions: &config.regions,
        output_dir: &config.output_dir,
        workers: config.workers,
    };
    if config.dry_run {
        let recorder = RecordingRunner::new();
        Extractor::new(&recorder, &tools).extract(&config.strategy, &request)?;
        return write_invocations(writer, &recorder.into_invocations());
    }

    prepare_output_dir(&config.output_dir)?;
    let written = Extractor::new(runner, &tools).extract(&config.strategy, &request)?;
    for path in written {
        writeln!(writer, "{path}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

fn prepare_output_dir(path: &Utf8Path) -> Result<(), CliError> {
    match planetkeeper_core::inspect(path)? {
        PathKind::Directory => Ok(()),
        PathKind::Missing => {
            planetkeeper_fs::create_dir_all(path).map_err(|source| CliError::CreateDirectory {
                path: path.to_path_buf(),
                source,
            })
        }
        PathKind::File | PathKind::Other => Err(CliError::OutputDirectoryNotDirectory {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExtractConfig, CliError> {
    let merged = ExtractArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExtractConfig::try_from(merged)
}
