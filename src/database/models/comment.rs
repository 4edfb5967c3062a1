use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

/// Which kind of screen a comment thread is attached to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    Props,
    Epk,
    Contract,
    Media,
}

impl FromStr for CommentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "props" => Ok(CommentType::Props),
            "epk" => Ok(CommentType::Epk),
            "contract" => Ok(CommentType::Contract),
            "media" => Ok(CommentType::Media),
            other => Err(format!("Unknown comment type: {}", other)),
        }
    }
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Props => "props",
            CommentType::Epk => "epk",
            CommentType::Contract => "contract",
            CommentType::Media => "media",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub app_id: String,
    pub screen_id: String,
    pub comment: String,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub created_by: Uuid,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Comment {
    const COLLECTION: &'static str = "comments";
    const TRACKS_UPDATES: bool = false;
}
