//! FFprobe-based media probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    field_order: Option<String>,
}

/// Probe a media file using the given ffprobe executable.
pub fn probe_with_ffprobe(program: &Path, path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = Command::new(program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(program.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_json(path, &json_str)
}

/// Parse ffprobe's `-print_format json -show_format -show_streams` output.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    Ok(parse_ffprobe_output(path, output))
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> MediaInfo {
    let duration = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64);

    let video_tracks = output
        .streams
        .into_iter()
        .filter(|s| s.codec_type == "video")
        .enumerate()
        .map(|(i, stream)| VideoTrack {
            index: i as u32,
            codec: stream.codec_name.unwrap_or_default(),
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            frame_rate: stream.r_frame_rate.and_then(|s| parse_frame_rate(&s)),
            field_order: stream
                .field_order
                .as_deref()
                .map(ScanType::from_ffprobe)
                .unwrap_or(ScanType::Unknown),
        })
        .collect();

    MediaInfo {
        file_path: path.to_path_buf(),
        container: output.format.format_name,
        duration,
        video_tracks,
    }
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
    }
    rate_str.parse().ok()
}
