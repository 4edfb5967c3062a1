use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{unique_fields, Document, DocumentStore, StoreError};
use crate::filter::{matcher, Filter, FilterData};

/// Process-local document store used in development and tests
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(collection: &str, filter: FilterData) -> Result<Filter, StoreError> {
        let mut compiled = Filter::new(collection)?;
        compiled.assign(filter)?;
        Ok(compiled)
    }

    fn merge(doc: &mut Document, patch: &Document) {
        for (key, value) in patch {
            doc.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        Filter::new(collection)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        for field in unique_fields(collection) {
            if let Some(value) = doc.get(*field) {
                if docs.iter().any(|existing| existing.get(*field) == Some(value)) {
                    return Err(StoreError::Duplicate(format!("{}.{} already exists", collection, field)));
                }
            }
        }

        docs.push(doc);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: FilterData) -> Result<Vec<Document>, StoreError> {
        let compiled = Self::compile(collection, filter)?;
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut found: Vec<Value> = docs
            .iter()
            .map(|d| Value::Object(d.clone()))
            .filter(|d| matcher::matches(compiled.condition(), d))
            .collect();
        // stable sort keeps insertion order for ties
        found.sort_by(|a, b| matcher::compare_docs(a, b, compiled.order_info()));

        let (limit, offset) = compiled.limit_offset();
        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }

    async fn count(&self, collection: &str, where_clause: Value) -> Result<i64, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matcher::matches(compiled.condition(), &Value::Object((*d).clone())))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn update_one(&self, collection: &str, where_clause: Value, patch: Document) -> Result<Option<Document>, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };

        let target = docs
            .iter_mut()
            .find(|d| matcher::matches(compiled.condition(), &Value::Object((*d).clone())));
        Ok(target.map(|doc| {
            Self::merge(doc, &patch);
            doc.clone()
        }))
    }

    async fn update_many(&self, collection: &str, where_clause: Value, patch: Document) -> Result<u64, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut updated = 0;
        for doc in docs.iter_mut() {
            if matcher::matches(compiled.condition(), &Value::Object(doc.clone())) {
                Self::merge(doc, &patch);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_many(&self, collection: &str, where_clause: Value) -> Result<u64, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|d| !matcher::matches(compiled.condition(), &Value::Object(d.clone())));
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
