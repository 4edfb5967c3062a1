use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::Entity;
use crate::types::timestamp;

/// Lifecycle of a contract document: draft until invitations go out,
/// completed once every signer has signed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Sent,
    Completed,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub project_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub document_status: DocumentStatus,
    #[serde(default)]
    pub is_single_signer: bool,
    pub status: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Contract {
    const COLLECTION: &'static str = "contracts";
}

/// Values typed into the contract's form fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractForm {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub form_data: Value,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for ContractForm {
    const COLLECTION: &'static str = "contract_forms";
}

/// Placement of signature/text fields on a contract file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFields {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub contract_id: Uuid,
    #[serde(default)]
    pub file_id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(default)]
    pub fields: Vec<Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for ContractFields {
    const COLLECTION: &'static str = "contract_fields";
}
