use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_festival_manager: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub login_attempts: u32,
    #[serde(default, with = "timestamp::option")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default, with = "timestamp::option")]
    pub last_logged_in: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub status: i32,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
}

/// What the API returns for a user. Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub role: Role,
    pub is_festival_manager: bool,
    pub plan: Plan,
    #[serde(with = "timestamp::option")]
    pub last_logged_in: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            company: user.company.clone(),
            role: user.role,
            is_festival_manager: user.is_festival_manager,
            plan: user.plan,
            last_logged_in: user.last_logged_in,
            date: user.date,
        }
    }
}

/// Author/owner details embedded in other responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Email pre-approved for the premium plan at signup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for PremiumUser {
    const COLLECTION: &'static str = "premium_users";
    const TRACKS_UPDATES: bool = false;
}
