//! Canonical, order-insensitive fingerprints of filter values.
//!
//! The fingerprint is a structural string, not a cryptographic digest: object
//! keys are sorted, arrays are treated as sets and sorted, and absent values
//! (null, empty arrays, empty objects) are dropped so that a freshly rebuilt
//! value with the same logical content fingerprints identically.

use crate::domain::filters::{FilterState, GeoBounds, Period, TagSet};
use chrono::SecondsFormat;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterHash(String);

impl FilterHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait StableHash {
    fn stable_hash(&self) -> FilterHash;
}

/// Fingerprint of an arbitrary JSON value under the canonical rules.
pub fn hash_value(value: &Value) -> FilterHash {
    let mut out = String::new();
    write_canonical(value, &mut out);
    FilterHash(out)
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_absent),
        _ => false,
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&Value::String(s.clone()).to_string()),
        Value::Array(items) => {
            let mut encoded: Vec<String> = items
                .iter()
                .map(|item| {
                    let mut buf = String::new();
                    write_canonical(item, &mut buf);
                    buf
                })
                .collect();
            encoded.sort();
            encoded.dedup();
            out.push('[');
            out.push_str(&encoded.join(","));
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .iter()
                .filter(|(_, v)| !is_absent(v))
                .map(|(k, _)| k)
                .collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn tags_value(tags: &TagSet) -> Value {
    Value::Array(
        tags.without_sentinel()
            .iter()
            .map(|t| Value::String(t.to_string()))
            .collect(),
    )
}

fn period_value(period: Option<&Period>) -> Value {
    match period {
        None => Value::Null,
        Some(period) => {
            let period = period.normalized();
            json!({
                "from": period.from.to_rfc3339_opts(SecondsFormat::Millis, true),
                "to": period.to.map(|to| to.to_rfc3339_opts(SecondsFormat::Millis, true)),
            })
        }
    }
}

impl StableHash for FilterState {
    fn stable_hash(&self) -> FilterHash {
        let zone = (!self.zone.is_default()).then(|| self.zone.as_str());
        let with_children = (self.with_children != Default::default())
            .then(|| self.with_children.as_str());
        hash_value(&json!({
            "categories": tags_value(&self.categories),
            "zone": zone,
            "period": period_value(self.period.as_ref()),
            "timeSlots": tags_value(&self.time_slots),
            "budgets": tags_value(&self.budgets),
            "specialPreferences": tags_value(&self.special_preferences),
            "withChildren": with_children,
        }))
    }
}

/// Coordinates are rounded to five decimals (about a metre) so map jitter
/// does not register as a change.
impl StableHash for GeoBounds {
    fn stable_hash(&self) -> FilterHash {
        let round = |v: f64| (v * 100_000.0).round() / 100_000.0;
        hash_value(&json!({
            "south": round(self.south),
            "west": round(self.west),
            "north": round(self.north),
            "east": round(self.east),
        }))
    }
}

impl<T: StableHash> StableHash for Option<T> {
    fn stable_hash(&self) -> FilterHash {
        match self {
            Some(value) => value.stable_hash(),
            None => FilterHash("null".to_string()),
        }
    }
}
