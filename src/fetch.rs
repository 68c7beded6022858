//! Copying recordings from the capture host.

use dvrflow_av::ToolCommand;
use dvrflow_common::FetchLocation;
use std::path::{Path, PathBuf};

/// Copies a recording to a local path.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        location: &FetchLocation,
        recording_file: &str,
        dest: &Path,
    ) -> dvrflow_av::Result<()>;
}

/// Fetches with `scp [user@]host:<prefix><file> <dest>`.
///
/// Authentication is whatever the ssh configuration of the running user
/// provides. Batch mode keeps a missing key from hanging on a password
/// prompt.
#[derive(Debug, Clone)]
pub struct ScpFetcher {
    program: PathBuf,
}

impl ScpFetcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command(&self, location: &FetchLocation, recording_file: &str, dest: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .args(["-o", "BatchMode=yes"])
            .arg(location.remote_spec(recording_file))
            .arg(dest)
    }
}

impl Default for ScpFetcher {
    fn default() -> Self {
        Self::new("scp")
    }
}

impl Fetcher for ScpFetcher {
    fn fetch(
        &self,
        location: &FetchLocation,
        recording_file: &str,
        dest: &Path,
    ) -> dvrflow_av::Result<()> {
        tracing::info!(
            "Fetching {} to {:?}",
            location.remote_spec(recording_file),
            dest
        );
        self.command(location, recording_file, dest).run()
    }
}

/// Remove a staged file, ignoring one that is already gone.
pub fn remove_staged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed staged file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove staged file {:?}: {}", path, e),
    }
}
