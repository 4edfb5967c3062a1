use serde_json::Value;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{json_path_sql, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["createdAt desc", "item asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v {
                        out.extend(Self::parse_order_string(s)?);
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "createdAt": "desc", "item": "asc" } or { "createdAt": -1 }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let desc = match v {
                        Value::Number(n) => n.as_i64().map(|n| n < 0).unwrap_or(false),
                        Value::String(s) => s.eq_ignore_ascii_case("desc"),
                        _ => false,
                    };
                    let sort = if desc { SortDirection::Desc } else { SortDirection::Asc };
                    out.push(FilterOrderInfo { path: FilterWhere::parse_path(k)?, sort });
                }
                Ok(out)
            }
            Value::Null => Ok(vec![]),
            _ => Err(FilterError::InvalidWhereClause("ORDER must be a string, array or object".to_string())),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into field and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { path: FilterWhere::parse_path(col)?, sort });
            }
        }
        Ok(out)
    }

    /// Insertion order (`seq`) always breaks ties
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", json_path_sql(&i.path), i.sort.to_sql()))
            .collect();
        parts.push("seq ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }
}
