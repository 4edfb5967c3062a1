use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    General,
    Contract,
    Epk,
    Props,
    Project,
    Vfx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub notification_type: NotificationType,
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub is_seen: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    const COLLECTION: &'static str = "notifications";
    const TRACKS_UPDATES: bool = false;
}
