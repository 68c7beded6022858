use dvrflow_av::{Prober, ScanType};
use dvrflow_common::FieldOrder;
use std::path::Path;

/// Decide whether and how to deinterlace.
///
/// The probed field order of the sample wins. When the probe is unavailable
/// or inconclusive the channel allow-list decides, and a match there means
/// top field first.
pub fn derive_deinterlace(
    channel_name: &str,
    probe: Option<(&Path, &dyn Prober)>,
    interlaced_channels: &[String],
) -> Option<FieldOrder> {
    if let Some((sample, prober)) = probe {
        match prober.probe(sample) {
            Ok(info) => match info.primary_video().map(|v| v.field_order) {
                Some(ScanType::Unknown) | None => {
                    tracing::debug!("{} could not tell the field order", prober.name());
                }
                Some(scan) => return field_order_from_scan(scan),
            },
            Err(e) => tracing::warn!("Probing {:?} failed: {}", sample, e),
        }
    }

    let channel = channel_name.to_lowercase();
    interlaced_channels
        .iter()
        .filter(|c| !c.is_empty())
        .any(|c| channel.contains(&c.to_lowercase()))
        .then_some(FieldOrder::Tff)
}

/// Field order to hand the encoder for a probed scan type.
pub fn field_order_from_scan(scan: ScanType) -> Option<FieldOrder> {
    match scan {
        ScanType::TopFieldFirst => Some(FieldOrder::Tff),
        ScanType::BottomFieldFirst => Some(FieldOrder::Bff),
        ScanType::Progressive | ScanType::Unknown => None,
    }
}
