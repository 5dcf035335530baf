//! Persisted index document shape.
//!
//! The registry maps field key -> upload name -> record, where a field key
//! ending in `/original` holds the pre-crop counterpart of the plain key.
//! Deleted uploads stay in the map as `None` and serialize as `null`:
//! "deleted but remembered" is distinct from "never existed".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix marking the pre-crop counterpart of a field key.
pub const ORIGINAL_SUFFIX: &str = "/original";

/// Field key used when an upload is registered without a field.
pub const DEFAULT_FIELD: &str = "undefined";

/// Field key -> named uploads.
pub type FileRegistry = IndexMap<String, FileMap>;

/// Upload name -> record, or `None` for a tombstoned entry.
pub type FileMap = IndexMap<String, Option<UploadRecord>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// On-disk temp name; present only for uploads moved into the flash
    /// directory, absent for uploads registered by local path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_name: Option<String>,
    /// Opaque crop-region descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Value>,
}

impl UploadRecord {
    /// Record for an upload whose bytes were moved into the flash directory.
    #[must_use]
    pub fn moved(
        name: impl Into<String>,
        media_type: impl Into<String>,
        size: u64,
        tmp_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: Some(size),
            tmp_name: Some(tmp_name.into()),
            crop: None,
        }
    }

    /// Record for a file referenced in place on the local filesystem.
    #[must_use]
    pub fn local(name: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: Some(size),
            tmp_name: None,
            crop: None,
        }
    }

    /// Bare original slot recording crop intent before any file exists.
    #[must_use]
    pub fn crop_intent(name: impl Into<String>, media_type: impl Into<String>, crop: Value) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: None,
            tmp_name: None,
            crop: Some(crop),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created: i64,
    pub updated: i64,
}

/// On-disk index document. Every key is written on save; readers tolerate
/// missing keys so a partially written or older index degrades instead of
/// failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashDocument {
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub files: FileRegistry,
}
