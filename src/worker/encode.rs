use crate::derive::upscale_target;
use crate::config::{UpscaleRule, WorkerConfig};
use dvrflow_av::ToolCommand;
use dvrflow_common::{Resolution, WorkOrder};
use std::path::{Path, PathBuf};

/// Runs the encoder to completion.
pub trait Encoder: Send + Sync {
    /// Run with the given arguments. Non-zero exit is an error.
    fn encode(&self, args: &[String]) -> dvrflow_av::Result<()>;
}

/// Encoder invoked as a subprocess with inherited stdio.
#[derive(Debug, Clone)]
pub struct ProcessEncoder {
    program: PathBuf,
}

impl ProcessEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Encoder for ProcessEncoder {
    fn encode(&self, args: &[String]) -> dvrflow_av::Result<()> {
        let command = ToolCommand::new(&self.program).args(args);
        tracing::info!("Running {}", command);
        let status = command.status()?;
        tracing::info!("Encoder finished with {}", status);
        if status.success() {
            Ok(())
        } else {
            Err(dvrflow_av::Error::tool_failed(
                self.program.display().to_string(),
                format!("exited with {status}"),
            ))
        }
    }
}

/// Worker-side knobs for building an encoder command line.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub base_args: Vec<String>,
    pub output_dir: PathBuf,
    pub default_bitrate: u32,
    pub upscale: Vec<UpscaleRule>,
}

impl From<&WorkerConfig> for EncodeSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            base_args: config.encoder.base_args.clone(),
            output_dir: config.output_dir.clone(),
            default_bitrate: config.default_bitrate,
            upscale: config.upscale.clone(),
        }
    }
}

/// Build the encoder arguments for a work order.
///
/// Layout: base args, `--vbr`, input, output, then crop, deinterlace and
/// output resolution when they apply. Deinterlacing is dropped whenever a
/// crop is present. An explicit output resolution wins over the upscale
/// table, which is keyed on the probed `source` resolution.
pub fn build_encoder_args(
    order: &WorkOrder,
    staged: &Path,
    source: Option<Resolution>,
    settings: &EncodeSettings,
) -> Vec<String> {
    let mut args = settings.base_args.clone();

    let bitrate = order.bitrate.unwrap_or(settings.default_bitrate);
    args.extend(["--vbr".to_string(), bitrate.to_string()]);
    args.extend(["-i".to_string(), staged.display().to_string()]);

    let output = settings.output_dir.join(&order.preferred_output_filename);
    args.extend(["-o".to_string(), output.display().to_string()]);

    if let Some(crop) = order.crop_settings {
        args.extend(["--crop".to_string(), crop.to_string()]);
    }
    if let Some(field_order) = order.effective_deinterlace() {
        args.extend([
            "--vpp-yadif".to_string(),
            "--interlace".to_string(),
            field_order.to_string(),
        ]);
    }

    let output_res = order
        .output_res
        .or_else(|| source.and_then(|res| upscale_target(res, &settings.upscale)));
    if let Some(res) = output_res {
        args.extend([
            "--output-res".to_string(),
            format!("{}:{}", res.width, res.height),
        ]);
    }

    args
}
