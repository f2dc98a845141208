//! Normalization of remote key records.
//!
//! The remote service's response shapes are not known in advance: listing
//! endpoints answer with bare arrays, wrapped arrays, or single objects, and
//! individual records name their fields freely. This module maps all of that
//! onto one fixed [`KeyRecord`] shape for the dashboard.

use serde::Serialize;
use serde_json::{Map, Value};

/// Identifier aliases, tried in order.
const KEY_ALIASES: &[&str] = &["key", "key_value", "value", "Key", "KeyName", "name"];

/// Total-quota aliases.
const TOTAL_ALIASES: &[&str] = &["total_requests", "total", "TotalRequests", "requests_total"];

/// Remaining-quota aliases.
const REMAINING_ALIASES: &[&str] = &[
    "remaining_requests",
    "remaining",
    "RemainingRequests",
    "requests_remaining",
];

/// Expiry-date aliases.
const EXPIRY_ALIASES: &[&str] = &["expires_at", "expiry", "expires", "ExpiresAt"];

/// Aliases for a combined `"<remaining>/<total>"` quota field.
const COMBINED_ALIASES: &[&str] = &["requests", "Request", "RequestCount"];

/// A key record in the canonical shape the dashboard consumes.
#[derive(Clone, Debug, Serialize)]
pub struct KeyRecord {
    pub key: String,
    pub total: Option<u64>,
    pub remaining: Option<u64>,
    pub expires_at: String,
    /// The untouched remote record, kept for inspection.
    pub raw: Value,
}

/// Pull the record list out of a parsed listing response.
///
/// Precedence: a bare array is used directly; then an array under `keys`,
/// then one under `data`, then the first array-valued field in map order.
/// A body with no array anywhere is wrapped as a single-record list.
pub fn extract_records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("keys") {
                return items.clone();
            }
            if let Some(Value::Array(items)) = map.get("data") {
                return items.clone();
            }
            for value in map.values() {
                if let Value::Array(items) = value {
                    return items.clone();
                }
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}

/// Normalize one raw record into a [`KeyRecord`].
///
/// Total over any input: unknown shapes degrade to a record whose `key` is
/// the input's string rendering and whose quotas are absent. Never fails.
pub fn normalize(raw: &Value) -> KeyRecord {
    let Value::Object(map) = raw else {
        return KeyRecord {
            key: render(raw),
            total: None,
            remaining: None,
            expires_at: String::new(),
            raw: raw.clone(),
        };
    };

    let key = first_alias(map, KEY_ALIASES)
        .and_then(scalar_string)
        .unwrap_or_else(|| render(raw));

    let mut total = first_alias(map, TOTAL_ALIASES).and_then(parse_quota);
    let mut remaining = first_alias(map, REMAINING_ALIASES).and_then(parse_quota);

    // A combined "<remaining>/<total>" field wins over the separate ones.
    if let Some(Value::String(combined)) = first_alias(map, COMBINED_ALIASES) {
        if let Some((r, t)) = split_combined(combined) {
            remaining = Some(r);
            total = Some(t);
        }
    }

    let expires_at = first_alias(map, EXPIRY_ALIASES)
        .and_then(scalar_string)
        .unwrap_or_default();

    KeyRecord {
        key,
        total,
        remaining,
        expires_at,
        raw: raw.clone(),
    }
}

/// First alias carrying a usable value. Nulls and empty strings are treated
/// as absent so a later alias can still match.
fn first_alias<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|name| map.get(*name))
        .find(|v| !v.is_null() && v.as_str() != Some(""))
}

/// String rendering used for identifier fallbacks and bare scalars.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A quota is accepted only as a non-negative JSON integer or a digits-only
/// string; anything else is absent rather than an error.
fn parse_quota(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn split_combined(field: &str) -> Option<(u64, u64)> {
    let (remaining, total) = field.split_once('/')?;
    let remaining = remaining.trim().parse().ok()?;
    let total = total.trim().parse().ok()?;
    Some((remaining, total))
}
