use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::memory::MemoryStore;
use super::postgres::PgStore;
use super::store::{DocumentStore, StoreError};
use crate::config;

/// Opens the document store selected by configuration
pub struct DatabaseManager;

impl DatabaseManager {
    /// Postgres when `DATABASE_URL` is set, otherwise a process-local memory store
    pub async fn open_store() -> Result<Arc<dyn DocumentStore>, StoreError> {
        match config::config().database.url.as_deref() {
            Some(url) => {
                let store = PgStore::new(Self::connect(url).await?);
                store.migrate().await?;
                Ok(Arc::new(store))
            }
            None => {
                warn!("DATABASE_URL not set; documents are kept in memory and lost on restart");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    pub async fn connect(url: &str) -> Result<PgPool, StoreError> {
        let db = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Created database pool for: {}", Self::redact_url(url));
        Ok(pool)
    }

    /// Connection string safe for logs (password masked)
    pub fn redact_url(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "<invalid database url>".to_string(),
        }
    }
}
