//! The single chokepoint through which external tools are invoked.
//!
//! Every argument travels as a discrete vector element; nothing is ever
//! joined into a shell command line, so snapshot paths and region names
//! cannot inject extra commands.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::process::{Command, Stdio};

use log::debug;
use thiserror::Error;

/// A program plus its argument vector.
///
/// # Examples
/// ```
/// use planetkeeper_core::Invocation;
///
/// let invocation = Invocation::new("osmconvert")
///     .arg("planet.osm.pbf")
///     .arg("--out-timestamp");
/// assert_eq!(invocation.argv(), ["osmconvert", "planet.osm.pbf", "--out-timestamp"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments following the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Whether `needle` is the program or one of the arguments.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.program == needle || self.args.iter().any(|arg| arg == needle)
    }

    /// Full argument vector including the program.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.argv().into_iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            if part.is_empty() || part.contains(char::is_whitespace) {
                write!(f, "{part:?}")?;
            } else {
                f.write_str(part)?;
            }
        }
        Ok(())
    }
}

/// Failures reported by a [`CommandRunner`].
#[derive(Debug, Error)]
pub enum ExternalToolError {
    /// The program could not be started at all.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with {}\n{stderr}{stdout}", describe_status(.status))]
    Failed {
        /// The failed command line, rendered for display.
        command: String,
        /// Exit code, absent when terminated by a signal.
        status: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "a signal".to_owned(), |code| format!("status {code}"))
}

/// Runs external programs.
///
/// Implementations block until the program exits and return its standard
/// output.
pub trait CommandRunner {
    /// Run `invocation`, returning captured standard output.
    fn run(&self, invocation: &Invocation) -> Result<String, ExternalToolError>;
}

/// [`CommandRunner`] that spawns real processes without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, ExternalToolError> {
        debug!("running {invocation}");
        let output = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExternalToolError::Spawn {
                program: invocation.program().to_owned(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        Err(ExternalToolError::Failed {
            command: invocation.to_string(),
            status: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// [`CommandRunner`] that records invocations instead of executing them.
///
/// Used for dry runs and for exercising whole pipelines without any external
/// binary present. Canned output and simulated failures are keyed by a
/// marker matched against the program and each argument.
///
/// # Examples
/// ```
/// use planetkeeper_core::{CommandRunner, Invocation, RecordingRunner};
///
/// let runner = RecordingRunner::new().respond_to("--out-timestamp", "2024-05-01T00:00:00Z\n");
/// let stdout = runner.run(&Invocation::new("osmconvert").arg("--out-timestamp"))?;
/// assert_eq!(stdout, "2024-05-01T00:00:00Z\n");
/// assert_eq!(runner.invocations().len(), 1);
/// # Ok::<(), planetkeeper_core::ExternalToolError>(())
/// ```
#[derive(Debug, Default)]
pub struct RecordingRunner {
    log: RefCell<Vec<Invocation>>,
    responses: Vec<(String, String)>,
    failures: Vec<String>,
}

impl RecordingRunner {
    /// Create a runner that returns empty output for every invocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` for invocations mentioning `marker`.
    ///
    /// The first matching marker wins.
    #[must_use]
    pub fn respond_to(mut self, marker: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.responses.push((marker.into(), stdout.into()));
        self
    }

    /// Simulate a non-zero exit for invocations mentioning `marker`.
    #[must_use]
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.failures.push(marker.into());
        self
    }

    /// Snapshot of the invocations recorded so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.borrow().clone()
    }

    /// Consume the runner and return the recorded invocations.
    #[must_use]
    pub fn into_invocations(self) -> Vec<Invocation> {
        self.log.into_inner()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, ExternalToolError> {
        debug!("recording {invocation}");
        self.log.borrow_mut().push(invocation.clone());
        if self
            .failures
            .iter()
            .any(|marker| invocation.mentions(marker))
        {
            return Err(ExternalToolError::Failed {
                command: invocation.to_string(),
                status: Some(1),
                stdout: String::new(),
                stderr: "simulated failure".to_owned(),
            });
        }
        Ok(self
            .responses
            .iter()
            .find(|(marker, _)| invocation.mentions(marker))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default())
    }
}
