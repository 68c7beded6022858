//! # dvrflow-av
//!
//! The thin layer between dvrflow and the external media tools it drives.
//!
//! This crate provides functionality for:
//! - Probing recordings for dimensions, codec and field order (ffprobe)
//! - Detecting which external tools are installed
//! - Running tools to completion with inherited stdio
//! - Substituting `{input}`-style variables into configured command lines
//!
//! ## Features
//!
//! - `tracing` - Log tool invocations through `tracing`
//!
//! ## Example
//!
//! ```no_run
//! use dvrflow_av::{FfprobeProber, Prober};
//! use std::path::Path;
//!
//! let info = FfprobeProber::default().probe(Path::new("/tmp/recording.ts"))?;
//! if let Some(video) = info.primary_video() {
//!     println!("{}x{} {:?}", video.width, video.height, video.field_order);
//! }
//! # Ok::<(), dvrflow_av::Error>(())
//! ```

mod command;
mod error;
pub mod probe;
pub mod template;
pub mod tools;

// Re-exports
pub use command::ToolCommand;
pub use error::{Error, Result};
pub use probe::{FfprobeProber, MediaInfo, Prober, ScanType, VideoTrack};
pub use template::TemplateContext;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
