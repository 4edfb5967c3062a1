use axum::extract::{multipart::MultipartRejection, Multipart};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::services::media::UploadedFile;

/// File parts and plain text fields of a multipart body
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }
}

/// Reads every part; any part with a file name is a file. Files over
/// `max_bytes` are refused with 413.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> Result<UploadForm, ApiError> {
    let mut multipart = multipart
        .map_err(|e| ApiError::bad_request(format!("Expected a multipart/form-data body: {}", e.body_text())))?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        };

        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field.bytes().await?;
        if bytes.len() > max_bytes {
            return Err(ApiError::payload_too_large(format!("{} exceeds the upload limit of {} bytes", file_name, max_bytes)));
        }
        if bytes.is_empty() {
            return Err(ApiError::bad_request(format!("{} is empty", file_name)));
        }
        form.files.push(UploadedFile {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    if form.files.is_empty() {
        return Err(ApiError::field("file", "Please provide at least one file"));
    }
    Ok(form)
}
