//! Command-line interface for acquiring, extracting and updating planet
//! snapshots.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use planetkeeper_core::{Invocation, ProcessRunner};

mod acquire;
mod error;
mod extract;
mod status;
mod update;

pub use error::CliError;

use acquire::AcquireArgs;
use extract::ExtractArgs;
use status::StatusArgs;
use update::{HttpLookupBuilder, UpdateArgs};

pub(crate) const ARG_OUT: &str = "out";
pub(crate) const ARG_URL: &str = "url";
pub(crate) const ARG_BUCKET: &str = "bucket";
pub(crate) const ARG_PREFIX: &str = "prefix";
pub(crate) const ARG_MATCH: &str = "match";
pub(crate) const ARG_MIRROR: &str = "mirror";
pub(crate) const ARG_DRY_RUN: &str = "dry-run";
pub(crate) const ARG_SNAPSHOT: &str = "snapshot";
pub(crate) const ARG_STRATEGY: &str = "strategy";
pub(crate) const ARG_REGION: &str = "region";
pub(crate) const ARG_REGIONS_FILE: &str = "regions-file";
pub(crate) const ARG_WORKERS: &str = "workers";
pub(crate) const ARG_EXTRACT_STRATEGY: &str = "extract-strategy";
pub(crate) const ARG_GRAIN: &str = "grain";
pub(crate) const ARG_WORKDIR: &str = "workdir";
pub(crate) const ARG_CHANGESET_URL: &str = "changeset-url";
pub(crate) const ARG_LOOKUP_URL: &str = "lookup-url";
pub(crate) const ARG_SIZE: &str = "size";

pub(crate) const ENV_ACQUIRE_OUT: &str = "PLANETKEEPER_CMDS_ACQUIRE_OUT";
pub(crate) const ENV_EXTRACT_SNAPSHOT: &str = "PLANETKEEPER_CMDS_EXTRACT_SNAPSHOT";
pub(crate) const ENV_UPDATE_SNAPSHOT: &str = "PLANETKEEPER_CMDS_UPDATE_SNAPSHOT";
pub(crate) const ENV_UPDATE_OUT: &str = "PLANETKEEPER_CMDS_UPDATE_OUT";
pub(crate) const ENV_STATUS_SNAPSHOT: &str = "PLANETKEEPER_CMDS_STATUS_SNAPSHOT";

/// Run the planetkeeper CLI with the current process arguments and
/// environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Acquire(args) => acquire::run_acquire_with(args, &ProcessRunner, &mut stdout),
        Command::Extract(args) => extract::run_extract_with(args, &ProcessRunner, &mut stdout),
        Command::Update(args) => {
            update::run_update_with(args, &ProcessRunner, &HttpLookupBuilder, &mut stdout)
        }
        Command::Status(args) => status::run_status_with(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "planetkeeper",
    about = "Acquire, extract and update OpenStreetMap planet snapshots",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download a fresh snapshot from a URL or an object store.
    Acquire(AcquireArgs),
    /// Cut regional extracts out of a snapshot.
    Extract(ExtractArgs),
    /// Apply replication diffs to bring a snapshot up to date.
    Update(UpdateArgs),
    /// Report which update phase a snapshot's workdir has reached.
    Status(StatusArgs),
}

/// Print each recorded invocation on its own line.
pub(crate) fn write_invocations(
    writer: &mut dyn Write,
    invocations: &[Invocation],
) -> Result<(), CliError> {
    for invocation in invocations {
        writeln!(writer, "{invocation}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
