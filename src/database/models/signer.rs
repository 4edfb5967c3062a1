use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerAction {
    #[default]
    Sign,
    View,
    Approve,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningStatus {
    #[default]
    Pending,
    Signed,
    Declined,
}

/// Subject/message of the invitation last mailed to a member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailData {
    pub subject: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub action: SignerAction,
    pub created_by: Uuid,
    pub status: i32,
    #[serde(default)]
    pub emailsent: bool,
    /// Outstanding invitation token; cleared once verified
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub email_data: Option<EmailData>,
    #[serde(default)]
    pub is_agreed: bool,
    #[serde(default)]
    pub document_status: SigningStatus,
    #[serde(default, with = "timestamp::option")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signature_id: Option<Uuid>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Signer {
    const COLLECTION: &'static str = "signers";
}

impl Signer {
    /// Response form: the invitation token stays server-side
    pub fn public_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("token");
        }
        value
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub pub_key_fingerprint: Option<String>,
    #[serde(default)]
    pub styling: Option<Value>,
    #[serde(default)]
    pub signature_text: Option<String>,
    /// Object key of a drawn signature image
    #[serde(default)]
    pub image_key: Option<String>,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Signature {
    const COLLECTION: &'static str = "signatures";
}
