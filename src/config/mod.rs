use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of the web client, used to build links in outgoing mail
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i32>,
    pub max_nested_depth: u32,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one the server keeps documents in memory.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i32,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub signer_session_hours: u64,
    /// Default lifetime of signer invitation links, in days
    pub invite_expiry_days: u64,
    pub bcrypt_cost: u32,
    pub max_login_attempts: u32,
    pub lockout_minutes: i64,
    pub cors_origins: Vec<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageBackend {
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_root: String,
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub public_base_url: String,
    pub signed_url_expiry_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MailBackend {
    Log,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub backend: MailBackend,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub sender: String,
}

pub const DEVELOPMENT_JWT_SECRET: &str = "cinea-development-secret";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("CINEA_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("FRONT_END_URL") {
            self.server.frontend_url = v.trim_end_matches('/').to_string();
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_MAX_NESTED_DEPTH") {
            self.filter.max_nested_depth = v.parse().unwrap_or(self.filter.max_nested_depth);
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_SLOW_QUERY_WARNING") {
            self.database.enable_slow_query_warning = v.parse().unwrap_or(self.database.enable_slow_query_warning);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_SIGNER_SESSION_HOURS") {
            self.security.signer_session_hours = v.parse().unwrap_or(self.security.signer_session_hours);
        }
        if let Ok(v) = env::var("SECURITY_INVITE_EXPIRY_DAYS") {
            self.security.invite_expiry_days = v.parse().unwrap_or(self.security.invite_expiry_days);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_MAX_LOGIN_ATTEMPTS") {
            self.security.max_login_attempts = v.parse().unwrap_or(self.security.max_login_attempts);
        }
        if let Ok(v) = env::var("SECURITY_LOCKOUT_MINUTES") {
            self.security.lockout_minutes = v.parse().unwrap_or(self.security.lockout_minutes);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("WEBHOOK_SECRET") {
            self.security.webhook_secret = Some(v).filter(|s| !s.is_empty());
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.storage.backend = match v.to_ascii_lowercase().as_str() {
                "s3" => StorageBackend::S3,
                "local" => StorageBackend::Local,
                "memory" => StorageBackend::Memory,
                _ => self.storage.backend,
            };
        }
        if let Ok(v) = env::var("STORAGE_LOCAL_ROOT") {
            self.storage.local_root = v;
        }
        if let Ok(v) = env::var("AWS_BUCKET_NAME") {
            self.storage.bucket = Some(v);
        }
        if let Ok(v) = env::var("AWS_REGION") {
            self.storage.region = v;
        }
        if let Ok(v) = env::var("AWS_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("STORAGE_SIGNED_URL_EXPIRY_SECS") {
            self.storage.signed_url_expiry_secs = v.parse().unwrap_or(self.storage.signed_url_expiry_secs);
        }

        // Mail overrides
        if let Ok(v) = env::var("MAIL_BACKEND") {
            self.mail.backend = match v.to_ascii_lowercase().as_str() {
                "http" => MailBackend::Http,
                "log" => MailBackend::Log,
                _ => self.mail.backend,
            };
        }
        if let Ok(v) = env::var("MAIL_API_URL") {
            self.mail.api_url = Some(v);
        }
        if let Ok(v) = env::var("MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
        if let Ok(v) = env::var("MAIL_SENDER") {
            self.mail.sender = v;
        }

        self
    }

    /// Reject settings that must never reach a production deployment
    pub fn validate(&self) -> Result<(), String> {
        if self.environment == Environment::Production {
            if self.security.jwt_secret.is_empty() || self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
                return Err("JWT_SECRET must be set in production".to_string());
            }
            if self.storage.backend == StorageBackend::Memory {
                return Err("STORAGE_BACKEND=memory is not allowed in production".to_string());
            }
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            return Err("AWS_BUCKET_NAME is required for the s3 storage backend".to_string());
        }
        if self.mail.backend == MailBackend::Http && self.mail.api_url.is_none() {
            return Err("MAIL_API_URL is required for the http mail backend".to_string());
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                frontend_url: "http://localhost:5173".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(1000),
                max_nested_depth: 10,
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_upload_bytes: 50 * 1024 * 1024, // 50MB
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                signer_session_hours: 24,
                invite_expiry_days: 7,
                bcrypt_cost: 4,
                max_login_attempts: 5,
                lockout_minutes: 15,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                webhook_secret: None,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                local_root: "./uploads".to_string(),
                bucket: None,
                region: "us-east-1".to_string(),
                endpoint: None,
                public_base_url: "http://localhost:3000/files".to_string(),
                signed_url_expiry_secs: 3600,
            },
            mail: MailConfig {
                backend: MailBackend::Log,
                api_url: None,
                api_key: None,
                sender: "Cinea <no-reply@localhost>".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                frontend_url: "https://staging.cinea.app".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(500),
                max_nested_depth: 5,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_upload_bytes: 50 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                signer_session_hours: 12,
                invite_expiry_days: 7,
                bcrypt_cost: 10,
                max_login_attempts: 5,
                lockout_minutes: 15,
                cors_origins: vec!["https://staging.cinea.app".to_string()],
                webhook_secret: None,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_root: "./uploads".to_string(),
                bucket: None,
                region: "us-east-1".to_string(),
                endpoint: None,
                public_base_url: "https://staging.cinea.app/files".to_string(),
                signed_url_expiry_secs: 3600,
            },
            mail: MailConfig {
                backend: MailBackend::Log,
                api_url: None,
                api_key: None,
                sender: "Cinea <no-reply@staging.cinea.app>".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                frontend_url: "https://cinea.app".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(100),
                max_nested_depth: 3,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_upload_bytes: 25 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                signer_session_hours: 4,
                invite_expiry_days: 7,
                bcrypt_cost: 12,
                max_login_attempts: 5,
                lockout_minutes: 30,
                cors_origins: vec!["https://cinea.app".to_string()],
                webhook_secret: None,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                local_root: "./uploads".to_string(),
                bucket: None,
                region: "us-east-1".to_string(),
                endpoint: None,
                public_base_url: "https://files.cinea.app".to_string(),
                signed_url_expiry_secs: 900,
            },
            mail: MailConfig {
                backend: MailBackend::Http,
                api_url: None,
                api_key: None,
                sender: "Cinea <no-reply@cinea.app>".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
