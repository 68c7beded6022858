//! Builder for running external tools to completion.
//!
//! Tools run with inherited stdio so that progress output of `scp` and the
//! encoder reaches the operator's terminal. No timeout is applied; a hung
//! tool blocks until someone kills it.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::{Error, Result};

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use dvrflow_av::ToolCommand;
///
/// let status = ToolCommand::new("scp")
///     .arg("pvr.lan:/data/show.ts")
///     .arg("/tmp/recording.ts")
///     .status()?;
/// println!("scp exited with {status}");
/// # Ok::<(), dvrflow_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Create a new command for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, s: impl Into<OsString>) -> Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, iter: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command and wait for it, returning its exit status whatever
    /// it is. Only a failure to start the process is an error.
    pub fn status(&self) -> Result<ExitStatus> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Running {}", self);

        Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(self.program_name())
                } else {
                    Error::tool_failed(self.program_name(), format!("failed to spawn: {e}"))
                }
            })
    }

    /// Run the command and require a zero exit status.
    pub fn run(&self) -> Result<()> {
        let status = self.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::tool_failed(
                self.program_name(),
                format!("exited with {status}"),
            ))
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
