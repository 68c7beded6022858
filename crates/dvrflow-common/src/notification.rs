//! Inbound "recording finished" notifications.
//!
//! The capture source posts a batch `{"entries": [...]}` whenever recordings
//! complete. Entries are untrusted: each one is decoded and validated on its
//! own so a single malformed entry never takes the rest of the batch down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifiers must be strictly longer than this.
pub const MIN_UUID_LEN: usize = 16;

/// Language key of the title variant used for naming and heuristics.
pub const ENGLISH: &str = "eng";

/// A batch of notifications as received from the bus.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationBatch {
    pub entries: Vec<serde_json::Value>,
}

impl NotificationBatch {
    /// Decode the batch envelope. Entries are left undecoded.
    pub fn from_json(payload: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// A notification entry exactly as the source sent it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRecording {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub title: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub channelname: Option<String>,
    #[serde(default)]
    pub episode_disp: Option<String>,
    #[serde(default)]
    pub copyright_year: Option<i64>,
}

/// Why an entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("entry is not a recording object: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("identifier '{0}' is too short")]
    IdentifierTooShort(String),

    #[error("status '{0}' does not mark a completed recording")]
    NotComplete(String),

    #[error("title has no English variant")]
    MissingEnglishTitle,

    #[error("path '{path}' is outside '{prefix}'")]
    OutsidePrefix { path: String, prefix: String },
}

/// Site-specific validation knobs.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    /// When set, source paths must start with this prefix.
    pub required_path_prefix: Option<String>,
}

/// A notification that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recording {
    pub uuid: String,
    pub status: String,
    pub filename: String,
    /// English title.
    pub title: String,
    pub channel_name: String,
    pub episode_disp: Option<String>,
    pub copyright_year: Option<i64>,
}

impl Recording {
    /// Decode and validate one batch entry.
    pub fn from_entry(
        entry: &serde_json::Value,
        rules: &ValidationRules,
    ) -> Result<Self, ValidationError> {
        let raw: RawRecording = serde_json::from_value(entry.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::validate(raw, rules)
    }

    pub fn validate(raw: RawRecording, rules: &ValidationRules) -> Result<Self, ValidationError> {
        let uuid = raw.uuid.ok_or(ValidationError::MissingField("uuid"))?;
        let status = raw.status.ok_or(ValidationError::MissingField("status"))?;
        let filename = raw.filename.ok_or(ValidationError::MissingField("filename"))?;
        let titles = raw.title.ok_or(ValidationError::MissingField("title"))?;
        let channel_name = raw
            .channelname
            .ok_or(ValidationError::MissingField("channelname"))?;

        if uuid.chars().count() <= MIN_UUID_LEN {
            return Err(ValidationError::IdentifierTooShort(uuid));
        }
        if !status.to_lowercase().contains("complete") {
            return Err(ValidationError::NotComplete(status));
        }
        if filename.is_empty() {
            return Err(ValidationError::EmptyField("filename"));
        }
        if let Some(prefix) = &rules.required_path_prefix {
            if !filename.starts_with(prefix.as_str()) {
                return Err(ValidationError::OutsidePrefix {
                    path: filename,
                    prefix: prefix.clone(),
                });
            }
        }
        let title = titles
            .get(ENGLISH)
            .cloned()
            .ok_or(ValidationError::MissingEnglishTitle)?;
        if channel_name.is_empty() {
            return Err(ValidationError::EmptyField("channelname"));
        }

        Ok(Self {
            uuid,
            status,
            filename,
            title,
            channel_name,
            episode_disp: raw.episode_disp,
            copyright_year: raw.copyright_year,
        })
    }
}
