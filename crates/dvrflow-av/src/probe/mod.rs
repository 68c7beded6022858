//! Media file probing.
//!
//! Probing goes through the [`Prober`] trait so that callers can substitute
//! canned results in tests. [`FfprobeProber`] is the production backend.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_json, probe_with_ffprobe};
pub use types::*;

use crate::Result;
use std::path::{Path, PathBuf};

/// A media file prober.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe a media file at the given path.
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// Prober backed by the `ffprobe` command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        probe_with_ffprobe(&self.program, path)
    }
}
