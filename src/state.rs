use std::sync::Arc;

use crate::database::{DatabaseManager, DocumentStore};
use crate::mail::{build_mailer, Mailer};
use crate::storage::MediaStorage;

use crate::config;

/// Request limits and shared secrets, fixed at startup
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    pub max_upload_bytes: usize,
    /// Expected `x-webhook-secret`; webhooks are open when unset
    pub webhook_secret: Option<String>,
}

impl RequestPolicy {
    pub fn from_config() -> Self {
        let config = config::config();
        Self {
            max_upload_bytes: config.api.max_upload_bytes,
            webhook_secret: config.security.webhook_secret.clone(),
        }
    }
}

/// Shared handles passed to every handler
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: MediaStorage,
    pub policy: RequestPolicy,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the store, mailer and object storage selected by configuration
    pub async fn from_config() -> anyhow::Result<SharedState> {
        let store = DatabaseManager::open_store().await?;
        let mailer = build_mailer()?;
        let storage = MediaStorage::from_config()?;
        Ok(Self::with_parts(store, mailer, storage))
    }

    pub fn with_parts(store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>, storage: MediaStorage) -> SharedState {
        Self::with_policy(store, mailer, storage, RequestPolicy::from_config())
    }

    pub fn with_policy(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        storage: MediaStorage,
        policy: RequestPolicy,
    ) -> SharedState {
        Arc::new(Self { store, mailer, storage, policy })
    }
}
