use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{ConversionStatus, Media};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::state::AppState;
use crate::storage::MediaStorage;
use crate::types::ACTIVE;

/// One file part read from a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf" || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Media record with a fetchable URL
#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
    #[serde(flatten)]
    pub media: Media,
    pub url: String,
}

pub struct MediaService {
    media: Repository<Media>,
    storage: MediaStorage,
}

impl MediaService {
    pub fn new(state: &AppState) -> Self {
        Self {
            media: Repository::new(state.store.clone()),
            storage: state.storage.clone(),
        }
    }

    /// Writes the object and builds the record; the record is not inserted yet.
    ///
    /// Contract files other than PDFs wait for the conversion webhook.
    pub async fn store_file(
        &self,
        owner: Uuid,
        file: UploadedFile,
        contract_id: Option<Uuid>,
        media_type: &str,
        sequence: i64,
    ) -> Result<Media, ApiError> {
        let area = if contract_id.is_some() { "contracts" } else { "media" };
        let key = MediaStorage::object_key(area, owner, &file.file_name);
        let is_pdf = file.is_pdf();
        let stored = self.storage.put(&key, file.bytes).await?;

        let (conversion_status, converted_key) = if is_pdf || contract_id.is_none() {
            (ConversionStatus::Converted, Some(stored.key.clone()))
        } else {
            (ConversionStatus::Pending, None)
        };

        Ok(Media {
            id: Uuid::new_v4(),
            file_name: file.file_name,
            mime_type: file.mime_type,
            key: stored.key,
            size: stored.size,
            checksum: stored.checksum,
            user_id: owner,
            contract_id,
            sequence,
            media_type: media_type.to_string(),
            conversion_status,
            converted_key,
            status: ACTIVE,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Inserts the records; objects of a failed batch are cleaned up
    pub async fn insert_multiple(&self, records: &[Media]) -> Result<usize, ApiError> {
        if records.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.media.insert_many(records).await {
            for record in records {
                self.storage.delete_quietly(&record.key).await;
            }
            return Err(e.into());
        }
        info!(count = records.len(), "Stored media files");
        Ok(records.len())
    }

    /// Stores and records every file in order, numbering contract files after the existing ones
    pub async fn upload(
        &self,
        owner: Uuid,
        files: Vec<UploadedFile>,
        contract_id: Option<Uuid>,
        media_type: &str,
    ) -> Result<Vec<MediaView>, ApiError> {
        let mut sequence = match contract_id {
            Some(contract_id) => self.next_sequence(contract_id).await?,
            None => 0,
        };

        let mut records = Vec::with_capacity(files.len());
        for file in files {
            match self.store_file(owner, file, contract_id, media_type, sequence).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    for record in &records {
                        self.storage.delete_quietly(&record.key).await;
                    }
                    return Err(e);
                }
            }
            if contract_id.is_some() {
                sequence += 1;
            }
        }

        self.insert_multiple(&records).await?;
        Ok(self.with_urls(records).await)
    }

    pub async fn next_sequence(&self, contract_id: Uuid) -> Result<i64, ApiError> {
        let last = self
            .media
            .select_any(FilterData::where_(json!({ "contractId": contract_id })).order("sequence desc").limit(1, 0))
            .await?;
        Ok(last.first().map(|m| m.sequence + 1).unwrap_or(1))
    }

    /// Caller's files, optionally narrowed to a contract or a type
    pub async fn get_all(&self, owner: Uuid, contract_id: Option<Uuid>, media_type: Option<&str>) -> Result<Vec<Media>, ApiError> {
        let mut where_clause = json!({ "userId": owner, "status": ACTIVE });
        if let Some(contract_id) = contract_id {
            where_clause["contractId"] = json!(contract_id);
        }
        if let Some(media_type) = media_type {
            where_clause["type"] = json!(media_type);
        }
        Ok(self.media.select_any(FilterData::where_(where_clause).order("createdAt desc")).await?)
    }

    /// Files of one contract in upload sequence
    pub async fn contract_files(&self, contract_id: Uuid) -> Result<Vec<Media>, ApiError> {
        Ok(self
            .media
            .select_any(FilterData::where_(json!({ "contractId": contract_id, "status": ACTIVE })).order("sequence asc"))
            .await?)
    }

    pub async fn get_file(&self, id: Uuid) -> Result<Option<Media>, ApiError> {
        Ok(self.media.select_one(json!({ "_id": id, "status": ACTIVE })).await?)
    }

    pub async fn get_owned_file(&self, owner: Uuid, id: Uuid) -> Result<Media, ApiError> {
        match self.get_file(id).await? {
            Some(media) if media.user_id == owner => Ok(media),
            _ => Err(ApiError::not_found("File not found")),
        }
    }

    /// Removes the stored objects and the record
    pub async fn delete_file(&self, media: &Media) -> Result<u64, ApiError> {
        self.storage.delete(&media.key).await?;
        if let Some(converted) = media.converted_key.as_deref().filter(|k| *k != media.key) {
            self.storage.delete_quietly(converted).await;
        }
        Ok(self.media.delete(json!({ "_id": media.id })).await?)
    }

    /// Applied by the conversion webhooks
    pub async fn update_conversion(&self, id: Uuid, status: ConversionStatus, converted_key: Option<String>) -> Result<Media, ApiError> {
        let mut patch = json!({ "conversionStatus": status });
        if let Some(key) = converted_key {
            patch["convertedKey"] = json!(key);
        }
        let media = self.media.update_404(json!({ "_id": id }), patch, "File").await?;
        if status == ConversionStatus::Failed {
            warn!(file = %media.id, "Document conversion failed");
        }
        Ok(media)
    }

    pub async fn with_url(&self, media: Media) -> MediaView {
        let key = media.converted_key.as_deref().unwrap_or(&media.key);
        let url = self.storage.url(key).await;
        MediaView { media, url }
    }

    /// URLs are presigned concurrently; output keeps the input order
    pub async fn with_urls(&self, records: Vec<Media>) -> Vec<MediaView> {
        join_all(records.into_iter().map(|media| self.with_url(media))).await
    }
}
