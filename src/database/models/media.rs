use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    #[default]
    Pending,
    Converted,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub key: String,
    pub size: u64,
    /// hex sha256 of the uploaded bytes
    pub checksum: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub sequence: i64,
    #[serde(rename = "type", default = "default_media_type")]
    pub media_type: String,
    #[serde(default)]
    pub conversion_status: ConversionStatus,
    /// Key of the converted rendition, set by the conversion webhook
    #[serde(default)]
    pub converted_key: Option<String>,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_media_type() -> String {
    "general".to_string()
}

impl Entity for Media {
    const COLLECTION: &'static str = "media";
}
