//! `update` command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use planetkeeper_core::{CommandRunner, ReplicationGrain, Snapshot, ToolPaths};
use planetkeeper_data::replication::{
    DEFAULT_CACHE_SIZE, DEFAULT_LOOKUP_URL, HttpSequenceLookup, HttpSequenceLookupConfig,
    IntervalUpdater, SequenceLookup, UpToDateUpdater, UpdateReport, UpdateStrategy, Updater,
    WorkDir,
};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CHANGESET_URL, ARG_GRAIN, ARG_LOOKUP_URL, ARG_OUT, ARG_SIZE, ARG_SNAPSHOT, ARG_STRATEGY,
    ARG_WORKDIR, CliError, ENV_UPDATE_OUT, ENV_UPDATE_SNAPSHOT,
};

/// CLI arguments for the `update` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Bring a snapshot up to date with the replication feed. \
                 The interval strategy keeps its position in a workdir next \
                 to the snapshot and resumes from whichever phase an earlier \
                 run reached; the single-call strategy delegates to \
                 pyosmium-up-to-date.",
    about = "Apply replication diffs to a snapshot"
)]
#[ortho_config(prefix = "PLANETKEEPER")]
pub(crate) struct UpdateArgs {
    /// Snapshot to update.
    #[arg(long = ARG_SNAPSHOT, value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Update strategy: interval or single-call (default interval).
    #[arg(long = ARG_STRATEGY, value_name = "name")]
    #[serde(default)]
    pub(crate) strategy: Option<String>,
    /// Replication grain: minute, hour or day (default minute).
    #[arg(long = ARG_GRAIN, value_name = "grain")]
    #[serde(default)]
    pub(crate) grain: Option<String>,
    /// Path of the updated snapshot.
    #[arg(long = ARG_OUT, value_name = "path")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
    /// Replication workdir (default: `<snapshot>.workdir`).
    #[arg(long = ARG_WORKDIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) workdir: Option<Utf8PathBuf>,
    /// Replication feed overriding the grain's public feed.
    #[arg(long = ARG_CHANGESET_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) changeset_url: Option<String>,
    /// Service mapping timestamps to replication positions.
    #[arg(long = ARG_LOOKUP_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) lookup_url: Option<String>,
    /// Cache size in megabytes for the single-call strategy.
    #[arg(long = ARG_SIZE, value_name = "megabytes")]
    #[serde(default)]
    pub(crate) size: Option<u32>,
}

impl UpdateArgs {
    pub(crate) fn into_config(self) -> Result<UpdateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        UpdateConfig::try_from(merged)
    }
}

/// Resolved `update` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateConfig {
    pub(crate) snapshot: Snapshot,
    pub(crate) strategy: UpdateStrategy,
    pub(crate) output: Utf8PathBuf,
    pub(crate) workdir: WorkDir,
    pub(crate) changeset_url: String,
    pub(crate) lookup_url: String,
    pub(crate) size: u32,
}

impl TryFrom<UpdateArgs> for UpdateConfig {
    type Error = CliError;

    fn try_from(args: UpdateArgs) -> Result<Self, Self::Error> {
        let snapshot = Snapshot::new(args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_UPDATE_SNAPSHOT,
        })?);
        let output = args.out.ok_or(CliError::MissingArgument {
            field: ARG_OUT,
            env: ENV_UPDATE_OUT,
        })?;
        let strategy = args
            .strategy
            .as_deref()
            .map_or(Ok(UpdateStrategy::default()), str::parse)?;
        let grain = args
            .grain
            .as_deref()
            .map_or(Ok(ReplicationGrain::default()), str::parse)?;
        let workdir = args
            .workdir
            .map_or_else(|| WorkDir::for_snapshot(&snapshot), WorkDir::new);
        Ok(Self {
            snapshot,
            strategy,
            output,
            workdir,
            changeset_url: args
                .changeset_url
                .unwrap_or_else(|| grain.replication_url()),
            lookup_url: args
                .lookup_url
                .unwrap_or_else(|| DEFAULT_LOOKUP_URL.to_owned()),
            size: args.size.unwrap_or(DEFAULT_CACHE_SIZE),
        })
    }
}

/// Builds the sequence lookup used by the interval strategy.
pub(crate) trait LookupBuilder {
    fn build(&self, base_url: &str) -> Result<Box<dyn SequenceLookup>, CliError>;
}

/// Queries the lookup service over HTTP.
pub(crate) struct HttpLookupBuilder;

impl LookupBuilder for HttpLookupBuilder {
    fn build(&self, base_url: &str) -> Result<Box<dyn SequenceLookup>, CliError> {
        let lookup = HttpSequenceLookup::with_config(HttpSequenceLookupConfig::new(base_url))
            .map_err(|source| CliError::BuildLookup {
                base_url: base_url.to_owned(),
                source,
            })?;
        Ok(Box::new(lookup))
    }
}

pub(crate) fn run_update_with(
    args: UpdateArgs,
    runner: &dyn CommandRunner,
    lookups: &dyn LookupBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_update(&config, runner, lookups)?;
    write_report(writer, &report)
}

pub(crate) fn execute_update(
    config: &UpdateConfig,
    runner: &dyn CommandRunner,
    lookups: &dyn LookupBuilder,
) -> Result<UpdateReport, CliError> {
    let tools = ToolPaths::default();
    let report = match config.strategy {
        UpdateStrategy::Interval => {
            let lookup = lookups.build(&config.lookup_url)?;
            let updater = IntervalUpdater::new(runner, &tools, lookup.as_ref(), config.workdir.clone())
                .with_changeset_url(config.changeset_url.as_str());
            Updater::Interval(updater).update(&config.snapshot, &config.output)?
        }
        UpdateStrategy::SingleCall => {
            let updater = UpToDateUpdater::new(runner, &tools).with_size(config.size);
            Updater::SingleCall(updater).update(&config.snapshot, &config.output)?
        }
    };
    Ok(report)
}

fn write_report(writer: &mut dyn Write, report: &UpdateReport) -> Result<(), CliError> {
    match report.sequence_number {
        Some(sequence) => writeln!(writer, "{}\tsequence {sequence}", report.output),
        None => writeln!(writer, "{}", report.output),
    }
    .map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<UpdateConfig, CliError> {
    let merged = UpdateArgs::merge_from_layers(layers).map_err(CliError::from)?;
    UpdateConfig::try_from(merged)
}
