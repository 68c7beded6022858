use crate::config::{ResolutionOverride, UpscaleRule};
use dvrflow_common::Resolution;

/// Explicit output resolution from the title-prefix override table.
///
/// The first matching override wins. `None` defers to the worker.
pub fn derive_output_res(title: &str, overrides: &[ResolutionOverride]) -> Option<Resolution> {
    overrides
        .iter()
        .find(|o| !o.title_prefix.is_empty() && title.starts_with(o.title_prefix.as_str()))
        .map(|o| o.resolution)
}

/// Forced output resolution for an exact source resolution.
pub fn upscale_target(source: Resolution, table: &[UpscaleRule]) -> Option<Resolution> {
    table.iter().find(|r| r.from == source).map(|r| r.to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;

    #[test]
    fn test_override() {
        let overrides = vec![ResolutionOverride {
            title_prefix: "ER".to_string(),
            resolution: Resolution::new(1280, 720),
        }];
        assert_eq!(derive_output_res("ER", &overrides), Some(Resolution::new(1280, 720)));
        assert_eq!(derive_output_res("Vera", &overrides), None);
        assert_eq!(derive_output_res("ER", &[]), None);
    }

    #[test]
    fn test_default_upscale_table() {
        let table = WorkerConfig::default().upscale;
        assert_eq!(
            upscale_target(Resolution::new(720, 576), &table),
            Some(Resolution::new(1024, 576))
        );
        assert_eq!(
            upscale_target(Resolution::new(720, 480), &table),
            Some(Resolution::new(854, 480))
        );
        assert_eq!(
            upscale_target(Resolution::new(1440, 1080), &table),
            Some(Resolution::new(1920, 1080))
        );
        assert_eq!(upscale_target(Resolution::new(1920, 1080), &table), None);
    }
}
