use super::inspector::{CropAnswer, CropInspector};
use super::Derivation;
use dvrflow_common::CropRect;
use std::path::Path;

/// Decide the crop rectangle for a recording.
///
/// Titles starting with a letterbox-free prefix are never inspected.
pub fn derive_crop(
    title: &str,
    sample: &Path,
    letterbox_free_prefixes: &[String],
    inspector: &dyn CropInspector,
) -> Derivation<Option<CropRect>> {
    if letterbox_free_prefixes
        .iter()
        .any(|p| !p.is_empty() && title.starts_with(p.as_str()))
    {
        tracing::debug!("'{}' is letterbox free, no crop", title);
        return Derivation::Continue(None);
    }

    match inspector.inspect(title, sample) {
        CropAnswer::Crop(values) => Derivation::Continue(normalize_crop(values)),
        CropAnswer::Skip => {
            tracing::info!("Operator skipped '{}'", title);
            Derivation::Abort
        }
        CropAnswer::Unavailable => {
            tracing::warn!("Crop inspection unavailable for '{}', not cropping", title);
            Derivation::Continue(None)
        }
    }
}

/// Map operator-entered values to a crop rectangle.
///
/// Any negative value means "no crop", as does an all-zero rectangle.
pub fn normalize_crop(values: [i64; 4]) -> Option<CropRect> {
    if values.iter().any(|v| *v < 0) {
        return None;
    }
    let [left, top, right, bottom] = values.map(|v| u32::try_from(v).unwrap_or(u32::MAX));
    Some(CropRect::new(left, top, right, bottom)).filter(|c| !c.is_empty())
}
