use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prop {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub item: String,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub scene_number: Option<String>,
    #[serde(default)]
    pub scene_heading: Option<String>,
    #[serde(default)]
    pub shoot_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cast: Option<String>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub acquired: bool,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Prop {
    const COLLECTION: &'static str = "props";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropMember {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub prop_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_by: Uuid,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for PropMember {
    const COLLECTION: &'static str = "prop_members";
    const TRACKS_UPDATES: bool = false;
}
