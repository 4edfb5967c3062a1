use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::signer::EmailData;
use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epk {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub epk_name: String,
    pub width: f64,
    pub height: f64,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Epk {
    const COLLECTION: &'static str = "epks";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpkMember {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub epk_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_by: Uuid,
    pub status: i32,
    #[serde(default)]
    pub emailsent: bool,
    #[serde(default)]
    pub email_data: Option<EmailData>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for EpkMember {
    const COLLECTION: &'static str = "epk_members";
}

/// One page design of an EPK. `objects`, `background` and `frame` are the
/// client's design-editor state and are stored as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpkTemplate {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub epk_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub objects: Value,
    #[serde(default)]
    pub background: Value,
    #[serde(default)]
    pub frame: Value,
    /// Object key of the rendered preview image
    pub preview: String,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for EpkTemplate {
    const COLLECTION: &'static str = "epk_templates";
}
