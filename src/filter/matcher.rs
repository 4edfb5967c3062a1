//! In-memory evaluation of parsed filters.
//!
//! Mirrors the SQL emitted by [`FilterWhere`](super::filter_where::FilterWhere)
//! so the memory and Postgres stores agree: comparisons only hold between
//! values of the same JSON type, missing fields never satisfy a comparison,
//! and sorting follows jsonb ordering with missing values last.

use serde_json::Value;
use std::cmp::Ordering;

use super::types::{Condition, FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection};

pub fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

pub fn matches(condition: &Condition, doc: &Value) -> bool {
    match condition {
        Condition::And(parts) => parts.iter().all(|c| matches(c, doc)),
        Condition::Or(parts) => parts.iter().any(|c| matches(c, doc)),
        Condition::Not(inner) => !matches(inner, doc),
        Condition::Field(info) => matches_field(info, doc),
    }
}

fn matches_field(info: &FilterWhereInfo, doc: &Value) -> bool {
    let found = lookup(doc, &info.path);
    match info.operator {
        FilterOp::Eq if info.data.is_null() => found.map_or(true, Value::is_null),
        FilterOp::Eq => found.map_or(false, |v| json_eq(v, &info.data)),
        FilterOp::Ne if info.data.is_null() => found.map_or(false, |v| !v.is_null()),
        FilterOp::Ne => found.map_or(true, |v| !json_eq(v, &info.data)),
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => found
            .and_then(|v| same_type_cmp(v, &info.data))
            .map_or(false, |ord| match info.operator {
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Gte => ord != Ordering::Less,
                FilterOp::Lt => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }),
        FilterOp::Like | FilterOp::ILike => {
            let insensitive = info.operator == FilterOp::ILike;
            match (found.and_then(Value::as_str), info.data.as_str()) {
                (Some(text), Some(pattern)) => like(pattern, text, insensitive),
                _ => false,
            }
        }
        FilterOp::In => {
            let values = info.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            found.map_or(false, |v| values.iter().any(|candidate| json_eq(v, candidate)))
        }
        FilterOp::NIn => {
            let values = info.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            found.map_or(true, |v| !values.iter().any(|candidate| json_eq(v, candidate)))
        }
        FilterOp::Between => {
            let bounds = info.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            match (found, bounds) {
                (Some(v), [low, high]) => {
                    matches!(same_type_cmp(v, low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(same_type_cmp(v, high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            }
        }
        FilterOp::Exists => found.is_some() == info.data.as_bool().unwrap_or(true),
    }
}

/// jsonb equality: numbers compare by value, containers element-wise
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_eq(l, r)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).map_or(false, |w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

fn same_type_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if type_rank(a) != type_rank(b) {
        return None;
    }
    Some(jsonb_cmp(a, b))
}

/// jsonb sort order across types: null < string < number < boolean < array < object
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn jsonb_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| x.iter().zip(y).map(|(l, r)| jsonb_cmp(l, r)).find(|o| o.is_ne()).unwrap_or(Ordering::Equal)),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare two documents by an order spec. Missing values sort last ascending and first descending.
pub fn compare_docs(a: &Value, b: &Value, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let ord = match (lookup(a, &info.path), lookup(b, &info.path)) {
            (Some(x), Some(y)) => jsonb_cmp(x, y),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        let ord = if info.sort == SortDirection::Desc { ord.reverse() } else { ord };
        if ord.is_ne() {
            return ord;
        }
    }
    Ordering::Equal
}

/// SQL LIKE: `%` any run, `_` one char, backslash escapes
pub fn like(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let (pattern, text) = if case_insensitive {
        (pattern.to_lowercase(), text.to_lowercase())
    } else {
        (pattern.to_string(), text.to_string())
    };
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    like_at(&p, &t)
}

fn like_at(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('%') => (0..=t.len()).any(|skip| like_at(&p[1..], &t[skip..])),
        Some('_') => !t.is_empty() && like_at(&p[1..], &t[1..]),
        Some('\\') if p.len() > 1 => t.first() == Some(&p[1]) && like_at(&p[2..], &t[1..]),
        Some(c) => t.first() == Some(c) && like_at(&p[1..], &t[1..]),
    }
}
