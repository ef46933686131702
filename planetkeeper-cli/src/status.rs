//! `status` command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use planetkeeper_core::Snapshot;
use planetkeeper_data::replication::{UpdatePhase, WorkDir};
use serde::{Deserialize, Serialize};

use crate::{ARG_SNAPSHOT, ARG_WORKDIR, CliError, ENV_STATUS_SNAPSHOT};

/// CLI arguments for the `status` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Show the update phase of a snapshot's workdir")]
#[ortho_config(prefix = "PLANETKEEPER")]
pub(crate) struct StatusArgs {
    /// Snapshot whose workdir is inspected.
    #[arg(long = ARG_SNAPSHOT, value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Replication workdir (default: `<snapshot>.workdir`).
    #[arg(long = ARG_WORKDIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) workdir: Option<Utf8PathBuf>,
}

impl StatusArgs {
    fn into_workdir(self) -> Result<WorkDir, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        workdir_from(merged)
    }
}

pub(crate) fn workdir_from(args: StatusArgs) -> Result<WorkDir, CliError> {
    if let Some(path) = args.workdir {
        return Ok(WorkDir::new(path));
    }
    let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
        field: ARG_SNAPSHOT,
        env: ENV_STATUS_SNAPSHOT,
    })?;
    Ok(WorkDir::for_snapshot(&Snapshot::new(snapshot)))
}

pub(crate) fn run_status_with(args: StatusArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let workdir = args.into_workdir()?;
    write_status(writer, &workdir)
}

pub(crate) fn write_status(writer: &mut dyn Write, workdir: &WorkDir) -> Result<(), CliError> {
    let phase = workdir.phase()?;
    writeln!(writer, "{}\t{phase}", workdir.path()).map_err(CliError::WriteOutput)?;
    if phase >= UpdatePhase::WorkdirReady {
        let config = workdir.read_configuration().map_err(CliError::Update)?;
        writeln!(writer, "feed\t{}", config.base_url).map_err(CliError::WriteOutput)?;
    }
    if phase >= UpdatePhase::StateReady {
        let state = workdir.read_state().map_err(CliError::Update)?;
        writeln!(
            writer,
            "sequence\t{}\t{}",
            state.sequence_number, state.timestamp
        )
        .map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
