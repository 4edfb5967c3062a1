use anyhow::Context;
use serde_json::json;

use crate::cli::utils::print_done;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{DatabaseManager, PgStore, COLLECTIONS};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let url = config::config()
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is required for migrate")?;

    let store = PgStore::new(DatabaseManager::connect(url).await?);
    store.migrate().await?;

    print_done(
        &output_format,
        &format!("Migrated {} collections in {}", COLLECTIONS.len(), DatabaseManager::redact_url(url)),
        Some(json!({ "collections": COLLECTIONS })),
    )
}
