use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::store::{Document, DocumentStore, StoreError, ID_FIELD};
use crate::filter::FilterData;
use crate::types::now_json;

/// A document type stored in one collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    /// Stamp `updatedAt` on every patch
    const TRACKS_UPDATES: bool = true;
}

/// Typed access to one collection
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn insert(&self, record: &T) -> Result<(), StoreError> {
        self.store.insert(T::COLLECTION, Self::to_document(record)?).await
    }

    pub async fn insert_many(&self, records: &[T]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let docs = records.iter().map(Self::to_document).collect::<Result<Vec<_>, _>>()?;
        self.store.insert_many(T::COLLECTION, docs).await
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        let docs = self.store.find(T::COLLECTION, filter_data).await?;
        docs.into_iter().map(Self::from_document).collect()
    }

    pub async fn select_one(&self, where_clause: Value) -> Result<Option<T>, StoreError> {
        self.store
            .find_one(T::COLLECTION, where_clause)
            .await?
            .map(Self::from_document)
            .transpose()
    }

    /// `select_one` that turns a miss into `NotFound("<what> not found")`
    pub async fn select_404(&self, where_clause: Value, what: &str) -> Result<T, StoreError> {
        self.select_one(where_clause)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} not found", what)))
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(FilterData::where_(json!({ ID_FIELD: { "$in": ids } }))).await
    }

    pub async fn count(&self, where_clause: Value) -> Result<i64, StoreError> {
        self.store.count(T::COLLECTION, where_clause).await
    }

    pub async fn update_one(&self, where_clause: Value, patch: Value) -> Result<Option<T>, StoreError> {
        self.store
            .update_one(T::COLLECTION, where_clause, Self::to_patch(patch)?)
            .await?
            .map(Self::from_document)
            .transpose()
    }

    pub async fn update_404(&self, where_clause: Value, patch: Value, what: &str) -> Result<T, StoreError> {
        self.update_one(where_clause, patch)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} not found", what)))
    }

    pub async fn update_many(&self, where_clause: Value, patch: Value) -> Result<u64, StoreError> {
        self.store.update_many(T::COLLECTION, where_clause, Self::to_patch(patch)?).await
    }

    pub async fn delete(&self, where_clause: Value) -> Result<u64, StoreError> {
        self.store.delete_many(T::COLLECTION, where_clause).await
    }

    fn to_document(record: &T) -> Result<Document, StoreError> {
        match serde_json::to_value(record)? {
            Value::Object(map) if map.contains_key(ID_FIELD) => Ok(map),
            _ => Err(StoreError::InvalidCollection(format!("{} records must serialize to objects with an _id", T::COLLECTION))),
        }
    }

    fn from_document(doc: Document) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }

    /// The id is immutable; `updatedAt` is stamped when the entity tracks it
    fn to_patch(patch: Value) -> Result<Document, StoreError> {
        let Value::Object(mut map) = patch else {
            return Err(StoreError::InvalidCollection(format!("{} patch must be an object", T::COLLECTION)));
        };
        map.remove(ID_FIELD);
        if T::TRACKS_UPDATES && !map.contains_key("updatedAt") {
            map.insert("updatedAt".to_string(), now_json());
        }
        Ok(map)
    }
}
