//! Settings derivation: turns one validated recording (plus an optional
//! local copy of it) into encode parameters.
//!
//! Each step either continues with a value or aborts the whole job. Only the
//! crop step can abort, when the operator chooses to skip the recording.

mod crop;
mod deinterlace;
mod filename;
mod inspector;
mod resolution;

pub use crop::{derive_crop, normalize_crop};
pub use deinterlace::{derive_deinterlace, field_order_from_scan};
pub use filename::{derive_output_filename, sanitize_filename};
pub use inspector::{CropAnswer, CropInspector, ScriptedInspector, TerminalInspector};
pub use resolution::{derive_output_res, upscale_target};

use crate::config::{PublisherConfig, ResolutionOverride};
use dvrflow_av::Prober;
use dvrflow_common::{CropRect, FieldOrder, Recording, Resolution};
use std::path::Path;

/// Result of a derivation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation<T> {
    Continue(T),
    /// The operator asked to skip this recording.
    Abort,
}

impl<T> Derivation<T> {
    pub fn is_abort(&self) -> bool {
        matches!(self, Derivation::Abort)
    }

    pub fn continued(self) -> Option<T> {
        match self {
            Derivation::Continue(v) => Some(v),
            Derivation::Abort => None,
        }
    }
}

/// Heuristic tables driving derivation.
#[derive(Debug, Clone)]
pub struct DeriveRules {
    pub letterbox_free_prefixes: Vec<String>,
    pub interlaced_channels: Vec<String>,
    pub resolution_overrides: Vec<ResolutionOverride>,
}

impl From<&PublisherConfig> for DeriveRules {
    fn from(config: &PublisherConfig) -> Self {
        Self {
            letterbox_free_prefixes: config.letterbox_free_prefixes.clone(),
            interlaced_channels: config.interlaced_channels.clone(),
            resolution_overrides: config.resolution_overrides.clone(),
        }
    }
}

impl Default for DeriveRules {
    fn default() -> Self {
        Self::from(&PublisherConfig::default())
    }
}

/// Everything derivation decides for one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSettings {
    pub crop: Option<CropRect>,
    pub deinterlace: Option<FieldOrder>,
    pub output_res: Option<Resolution>,
    pub output_filename: String,
}

/// Run crop, deinterlace, resolution and filename derivation in that order.
///
/// `sample` is the staged local copy. Without one, crop inspection and the
/// field-order probe are skipped and only the name-based rules apply.
pub fn derive_settings(
    recording: &Recording,
    sample: Option<&Path>,
    rules: &DeriveRules,
    inspector: &dyn CropInspector,
    prober: Option<&dyn Prober>,
) -> Derivation<DerivedSettings> {
    let crop = match sample {
        Some(sample) => match derive_crop(
            &recording.title,
            sample,
            &rules.letterbox_free_prefixes,
            inspector,
        ) {
            Derivation::Continue(crop) => crop,
            Derivation::Abort => return Derivation::Abort,
        },
        None => None,
    };

    let probe = sample.zip(prober);
    let deinterlace = derive_deinterlace(&recording.channel_name, probe, &rules.interlaced_channels);
    let output_res = derive_output_res(&recording.title, &rules.resolution_overrides);
    let output_filename = derive_output_filename(recording);

    tracing::debug!(
        "Derived settings for {}: crop={:?} deinterlace={:?} res={:?} file={}",
        recording.uuid,
        crop,
        deinterlace,
        output_res,
        output_filename
    );

    Derivation::Continue(DerivedSettings {
        crop,
        deinterlace,
        output_res,
        output_filename,
    })
}
