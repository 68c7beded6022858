//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// Container format as reported by the prober (e.g., "mpegts").
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
}

impl MediaInfo {
    /// The first video track, if any.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index among video tracks.
    pub index: u32,
    /// Video codec (e.g., "mpeg2video", "h264").
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// Scan type and field order.
    pub field_order: ScanType,
}

/// Scan type of a video stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Progressive,
    /// Interlaced, top field displayed first.
    TopFieldFirst,
    /// Interlaced, bottom field displayed first.
    BottomFieldFirst,
    /// The prober could not tell.
    Unknown,
}

impl ScanType {
    /// Map ffprobe's `field_order` value.
    ///
    /// The second letter of the two-letter codes is the display order: `tt`
    /// and `bt` show the top field first, `bb` and `tb` the bottom field.
    pub fn from_ffprobe(field_order: &str) -> Self {
        match field_order.trim().to_ascii_lowercase().as_str() {
            "progressive" => ScanType::Progressive,
            "tt" | "bt" => ScanType::TopFieldFirst,
            "bb" | "tb" => ScanType::BottomFieldFirst,
            _ => ScanType::Unknown,
        }
    }

    pub fn is_interlaced(&self) -> bool {
        matches!(self, ScanType::TopFieldFirst | ScanType::BottomFieldFirst)
    }
}
