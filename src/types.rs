use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Record is live
pub const ACTIVE: i32 = 1;
/// Record was soft-deleted
pub const REMOVED: i32 = 0;

/// Fixed-width RFC 3339 timestamps.
///
/// Documents are compared and sorted as JSON, so every stored timestamp uses
/// the same width (microseconds, `Z` suffix) to keep lexical and
/// chronological order identical.
pub mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

/// Current time as stored in documents
pub fn now_json() -> serde_json::Value {
    serde_json::Value::String(timestamp::format(&Utc::now()))
}

/// `?page=&limit=` query parameters shared by the listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    /// 1-based page and page size; junk or missing values fall back to the
    /// defaults and the size never exceeds the store's row cap
    pub fn resolve(&self) -> (i32, i32) {
        let config = crate::config::config();
        let max_limit = config.filter.max_limit.unwrap_or(i32::MAX).max(1);
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.parse::<i32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.parse::<i32>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(config.api.default_page_size)
            .clamp(1, max_limit);
        (page, limit)
    }

    /// Page size and row offset. Pages past `i32::MAX` rows saturate and come back empty.
    pub fn offset(&self) -> (i32, i32) {
        let (page, limit) = self.resolve();
        (limit, (page - 1).saturating_mul(limit))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paged<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub limit: i32,
}
