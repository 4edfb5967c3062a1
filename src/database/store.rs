use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{FilterData, FilterError};

/// A stored JSON object. Every document carries its id under `_id`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// Collections created by migrations
pub const COLLECTIONS: &[&str] = &[
    "users",
    "premium_users",
    "projects",
    "contracts",
    "contract_forms",
    "contract_fields",
    "signers",
    "signatures",
    "epks",
    "epk_members",
    "epk_templates",
    "media",
    "props",
    "prop_members",
    "comments",
    "notifications",
];

/// Fields that must be unique within a collection
pub fn unique_fields(collection: &str) -> &'static [&'static str] {
    match collection {
        "users" | "premium_users" => &["email"],
        _ => &[],
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Invalid collection or document: {0}")]
    InvalidCollection(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub fn document_id(doc: &Document) -> Result<Uuid, StoreError> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::InvalidCollection("document is missing a valid _id".to_string()))
}

/// Storage seam for the services. Documents live in named collections and
/// are queried with the Mongo-style filter language.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        for doc in docs {
            self.insert(collection, doc).await?;
        }
        Ok(())
    }

    async fn find(&self, collection: &str, filter: FilterData) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: &str, where_clause: Value) -> Result<Option<Document>, StoreError> {
        let filter = FilterData::where_(where_clause).limit(1, 0);
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, where_clause: Value) -> Result<i64, StoreError>;

    /// Shallow-merge `patch` into the first matching document (insertion order) and return it
    async fn update_one(&self, collection: &str, where_clause: Value, patch: Document) -> Result<Option<Document>, StoreError>;

    async fn update_many(&self, collection: &str, where_clause: Value, patch: Document) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, where_clause: Value) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
