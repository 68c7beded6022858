//! Work order types exchanged between the publisher and transcode workers.
//!
//! These types define the wire format of the transcode topic. Crop rectangles
//! and resolutions travel as plain JSON arrays so that hand-written orders
//! stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixels to remove from each edge of the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// A rectangle that removes nothing.
    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.top == 0 && self.right == 0 && self.bottom == 0
    }
}

impl From<[u32; 4]> for CropRect {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<CropRect> for [u32; 4] {
    fn from(c: CropRect) -> Self {
        [c.left, c.top, c.right, c.bottom]
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.left, self.top, self.right, self.bottom)
    }
}

/// A width by height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for Resolution {
    fn from(v: [u32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Resolution> for [u32; 2] {
    fn from(r: Resolution) -> Self {
        [r.width, r.height]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Field order of interlaced content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "FieldOrderRepr")]
pub enum FieldOrder {
    /// Top field first.
    Tff,
    /// Bottom field first.
    Bff,
}

impl FieldOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Tff => "tff",
            FieldOrder::Bff => "bff",
        }
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted encodings of a field order: the tag itself, or an encoder flag
/// list such as `["--vpp-yadif", "--interlace", "tff"]` sent by older
/// publishers.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldOrderRepr {
    Tag(String),
    Flags(Vec<String>),
}

impl TryFrom<FieldOrderRepr> for FieldOrder {
    type Error = String;

    fn try_from(repr: FieldOrderRepr) -> std::result::Result<Self, Self::Error> {
        let parse = |s: &str| match s.to_ascii_lowercase().as_str() {
            "tff" => Some(FieldOrder::Tff),
            "bff" => Some(FieldOrder::Bff),
            _ => None,
        };
        match repr {
            FieldOrderRepr::Tag(tag) => parse(&tag).ok_or_else(|| format!("unknown field order '{tag}'")),
            FieldOrderRepr::Flags(flags) => flags
                .iter()
                .find_map(|f| parse(f))
                .ok_or_else(|| format!("no field order in {flags:?}")),
        }
    }
}

/// Where a worker copies the source recording from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLocation {
    /// Remote login user; empty means the ssh default.
    #[serde(default)]
    pub user: String,
    pub host: String,
    /// Prepended to the recording path on the remote host.
    #[serde(default)]
    pub path_prefix: String,
}

impl FetchLocation {
    /// The `[user@]host:path` source argument for a remote copy.
    pub fn remote_spec(&self, recording_file: &str) -> String {
        let path = format!("{}{}", self.path_prefix, recording_file);
        if self.user.is_empty() {
            format!("{}:{}", self.host, path)
        } else {
            format!("{}@{}:{}", self.user, self.host, path)
        }
    }
}

/// A request to fetch and transcode one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub recording_file: String,
    pub preferred_output_filename: String,
    #[serde(default)]
    pub crop_settings: Option<CropRect>,
    #[serde(default)]
    pub interlace_settings: Option<FieldOrder>,
    #[serde(default)]
    pub output_res: Option<Resolution>,
    #[serde(default)]
    pub fetch: FetchLocation,
    /// Target bitrate in kbps; workers fall back to their own default.
    #[serde(default)]
    pub bitrate: Option<u32>,
}

impl WorkOrder {
    pub fn builder(
        recording_file: impl Into<String>,
        output_filename: impl Into<String>,
    ) -> WorkOrderBuilder {
        WorkOrderBuilder {
            order: WorkOrder {
                recording_file: recording_file.into(),
                preferred_output_filename: output_filename.into(),
                crop_settings: None,
                interlace_settings: None,
                output_res: None,
                fetch: FetchLocation::default(),
                bitrate: None,
            },
        }
    }

    /// Deinterlacing to apply. Always `None` while a crop is present since the
    /// encoder cannot do both in one pass.
    pub fn effective_deinterlace(&self) -> Option<FieldOrder> {
        if self.crop_settings.is_some() {
            None
        } else {
            self.interlace_settings
        }
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(payload: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Builder for [`WorkOrder`] that upholds the crop/deinterlace exclusion.
#[derive(Debug)]
pub struct WorkOrderBuilder {
    order: WorkOrder,
}

impl WorkOrderBuilder {
    pub fn crop(mut self, crop: Option<CropRect>) -> Self {
        self.order.crop_settings = crop.filter(|c| !c.is_empty());
        self
    }

    pub fn deinterlace(mut self, field_order: Option<FieldOrder>) -> Self {
        self.order.interlace_settings = field_order;
        self
    }

    pub fn output_res(mut self, res: Option<Resolution>) -> Self {
        self.order.output_res = res;
        self
    }

    pub fn fetch(mut self, fetch: FetchLocation) -> Self {
        self.order.fetch = fetch;
        self
    }

    pub fn bitrate(mut self, kbps: u32) -> Self {
        self.order.bitrate = Some(kbps);
        self
    }

    pub fn build(mut self) -> WorkOrder {
        if self.order.crop_settings.is_some() {
            self.order.interlace_settings = None;
        }
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_wire_format() {
        let json = serde_json::to_string(&CropRect::new(8, 72, 8, 70)).unwrap();
        assert_eq!(json, "[8,72,8,70]");
        let crop: CropRect = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(crop, CropRect::new(1, 2, 3, 4));
        assert_eq!(crop.to_string(), "1:2:3:4");
    }

    #[test]
    fn test_field_order_accepts_tag_and_flag_list() {
        let tag: FieldOrder = serde_json::from_str("\"bff\"").unwrap();
        assert_eq!(tag, FieldOrder::Bff);

        let flags: FieldOrder =
            serde_json::from_str(r#"["--vpp-yadif", "--interlace", "tff"]"#).unwrap();
        assert_eq!(flags, FieldOrder::Tff);

        assert!(serde_json::from_str::<FieldOrder>("\"auto\"").is_err());
        assert_eq!(serde_json::to_string(&FieldOrder::Tff).unwrap(), "\"tff\"");
    }

    #[test]
    fn test_builder_clears_deinterlace_when_cropping() {
        let order = WorkOrder::builder("/data/a.ts", "a.mkv")
            .crop(Some(CropRect::new(0, 60, 0, 60)))
            .deinterlace(Some(FieldOrder::Tff))
            .build();
        assert!(order.crop_settings.is_some());
        assert!(order.interlace_settings.is_none());
    }

    #[test]
    fn test_builder_drops_empty_crop() {
        let order = WorkOrder::builder("/data/a.ts", "a.mkv")
            .crop(Some(CropRect::new(0, 0, 0, 0)))
            .deinterlace(Some(FieldOrder::Bff))
            .build();
        assert!(order.crop_settings.is_none());
        assert_eq!(order.interlace_settings, Some(FieldOrder::Bff));
    }

    #[test]
    fn test_effective_deinterlace_on_hand_written_order() {
        let order = WorkOrder::from_json(
            br#"{"recording_file": "/data/x.ts", "preferred_output_filename": "x.mkv",
                 "crop_settings": [0, 10, 0, 10], "interlace_settings": "tff"}"#,
        )
        .unwrap();
        assert_eq!(order.interlace_settings, Some(FieldOrder::Tff));
        assert_eq!(order.effective_deinterlace(), None);
        assert_eq!(order.fetch, FetchLocation::default());
        assert_eq!(order.bitrate, None);
    }

    #[test]
    fn test_remote_spec() {
        let fetch = FetchLocation {
            user: "acas".to_string(),
            host: "opi2.lan".to_string(),
            path_prefix: String::new(),
        };
        assert_eq!(fetch.remote_spec("/data/x.ts"), "acas@opi2.lan:/data/x.ts");

        let fetch = FetchLocation {
            user: String::new(),
            host: "nas".to_string(),
            path_prefix: "/srv/tvh".to_string(),
        };
        assert_eq!(fetch.remote_spec("/data/x.ts"), "nas:/srv/tvh/data/x.ts");
    }
}
