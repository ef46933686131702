//! `acquire` command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use planetkeeper_core::{CommandRunner, RecordingRunner, Snapshot, ToolPaths};
use planetkeeper_data::acquire::{
    AcquisitionReport, AcquisitionStrategy, Acquirer, DEFAULT_PLANET_URL, LocalMirrorStore,
    ObjectQuery,
};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BUCKET, ARG_DRY_RUN, ARG_MATCH, ARG_MIRROR, ARG_OUT, ARG_PREFIX, ARG_URL, CliError,
    ENV_ACQUIRE_OUT, write_invocations,
};

/// CLI arguments for the `acquire` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download a planet snapshot to a new file. Either fetch a \
                 single URL with curl, or pick the newest key matching a \
                 pattern from an object store bucket. An existing file at \
                 the target path is never overwritten.",
    about = "Download a fresh snapshot"
)]
#[ortho_config(prefix = "PLANETKEEPER")]
pub(crate) struct AcquireArgs {
    /// Path the snapshot is written to; must not exist yet.
    #[arg(long = ARG_OUT, value_name = "path")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
    /// URL to download (defaults to the latest full planet).
    #[arg(long = ARG_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Object store bucket to search.
    #[arg(long = ARG_BUCKET, value_name = "name")]
    #[serde(default)]
    pub(crate) bucket: Option<String>,
    /// Key prefix limiting the bucket listing.
    #[arg(long = ARG_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) prefix: Option<String>,
    /// Regular expression keys must match, anchored at the start.
    #[arg(long = ARG_MATCH, value_name = "regex")]
    #[serde(default)]
    pub(crate) key_pattern: Option<String>,
    /// Directory serving buckets as subdirectories.
    #[arg(long = ARG_MIRROR, value_name = "dir")]
    #[serde(default)]
    pub(crate) mirror: Option<Utf8PathBuf>,
    /// Print the download command instead of running it.
    #[arg(long = ARG_DRY_RUN)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) dry_run: bool,
}

impl AcquireArgs {
    pub(crate) fn into_config(self) -> Result<AcquireConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AcquireConfig::try_from(merged)
    }

    const fn uses_object_store(&self) -> Option<&'static str> {
        if self.bucket.is_some() {
            Some(ARG_BUCKET)
        } else if self.prefix.is_some() {
            Some(ARG_PREFIX)
        } else if self.key_pattern.is_some() {
            Some(ARG_MATCH)
        } else if self.mirror.is_some() {
            Some(ARG_MIRROR)
        } else {
            None
        }
    }
}

/// Resolved `acquire` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AcquireConfig {
    pub(crate) target: Utf8PathBuf,
    pub(crate) strategy: AcquisitionStrategy,
    pub(crate) mirror: Option<Utf8PathBuf>,
    pub(crate) dry_run: bool,
}

impl TryFrom<AcquireArgs> for AcquireConfig {
    type Error = CliError;

    fn try_from(args: AcquireArgs) -> Result<Self, Self::Error> {
        let object_store_flag = args.uses_object_store();
        let target = args.out.ok_or(CliError::MissingArgument {
            field: ARG_OUT,
            env: ENV_ACQUIRE_OUT,
        })?;
        let strategy = match (args.url, object_store_flag) {
            (Some(_), Some(flag)) => {
                return Err(CliError::ConflictingOptions {
                    first: ARG_URL,
                    second: flag,
                });
            }
            (url, None) => AcquisitionStrategy::Direct {
                url: url.unwrap_or_else(|| DEFAULT_PLANET_URL.to_owned()),
            },
            (None, Some(_)) => {
                let defaults = ObjectQuery::default();
                AcquisitionStrategy::ObjectStore(ObjectQuery {
                    bucket: args.bucket.unwrap_or(defaults.bucket),
                    prefix: args.prefix.unwrap_or(defaults.prefix),
                    pattern: args.key_pattern.unwrap_or(defaults.pattern),
                })
            }
        };
        if args.dry_run && matches!(strategy, AcquisitionStrategy::ObjectStore(_)) {
            return Err(CliError::DryRunUnsupported {
                action: "object store downloads",
            });
        }
        Ok(Self {
            target,
            strategy,
            mirror: args.mirror,
            dry_run: args.dry_run,
        })
    }
}

pub(crate) fn run_acquire_with(
    args: AcquireArgs,
    runner: &dyn CommandRunner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_acquire(&config, runner, writer)
}

pub(crate) fn execute_acquire(
    config: &AcquireConfig,
    runner: &dyn CommandRunner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let tools = ToolPaths::default();
    let snapshot = Snapshot::new(config.target.clone());
    if config.dry_run {
        let recorder = RecordingRunner::new();
        Acquirer::new(&recorder, &tools).acquire(&config.strategy, &snapshot)?;
        return write_invocations(writer, &recorder.into_invocations());
    }

    snapshot.require_absent()?;
    planetkeeper_fs::ensure_parent_dir(&config.target).map_err(|source| {
        CliError::CreateDirectory {
            path: config.target.parent().map(ToOwned::to_owned).unwrap_or_default(),
            source,
        }
    })?;
    let mirror = config.mirror.clone().map(LocalMirrorStore::new);
    let mut acquirer = Acquirer::new(runner, &tools);
    if let Some(store) = &mirror {
        acquirer = acquirer.with_object_store(store);
    }
    let report = acquirer.acquire(&config.strategy, &snapshot)?;
    write_report(writer, &report)
}

fn write_report(writer: &mut dyn Write, report: &AcquisitionReport) -> Result<(), CliError> {
    info!("acquired {} from {}", report.target, report.origin);
    writeln!(writer, "{}\t{}", report.target, report.origin).map_err(CliError::WriteOutput)
}
