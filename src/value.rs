//! FILENAME: src/value.rs
//! Row value semantics: field-path lookup, numeric coercion with null-like
//! detection, decimal-place measurement/rounding, and ordered partitioning.
//!
//! Rows are opaque `serde_json::Value` records. Everything the pipeline
//! knows about a row goes through the helpers in this module.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::group::Row;

/// Hard cap on the shared decimal precision of an aggregate summary.
pub const MAX_DECIMAL_PLACES: usize = 10;

/// String forms that mark a value as absent for aggregation purposes.
const NULL_SENTINELS: [&str; 3] = ["na", "-", "s"];

// ============================================================================
// FIELD PATH ACCESS
// ============================================================================

/// Resolves a dotted field path ("a.b.0.c") against a row.
///
/// Each segment indexes an object by key or an array by position. A missing
/// segment resolves to `None` rather than an error; the caller decides how
/// an absent value participates (null partition, failed membership test,
/// excluded aggregate input).
pub fn get_path<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = row;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Validates a field path at step-construction time.
/// Only emptiness is rejected; unknown fields are a data concern, not a
/// configuration error.
pub(crate) fn validate_field_path(path: &str) -> Result<(), crate::PivotError> {
    if path.trim().is_empty() {
        return Err(crate::PivotError::InvalidFieldPath(path.to_string()));
    }
    Ok(())
}

// ============================================================================
// NUMERIC COERCION
// ============================================================================

/// Tests whether a looked-up value is absent for aggregation purposes.
///
/// Null-like values: a missing path, JSON null, arrays/objects, strings
/// that are empty after trimming, and the sentinel strings "na" / "-" / "s"
/// (any case). Zero and false are always kept. Non-numeric strings are NOT
/// null-like; counting aggregates accept them even though they never
/// coerce to a number.
pub fn is_null_like(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed.to_ascii_lowercase().as_str())
        }
    }
}

/// Coerces a looked-up value to `f64` where possible.
///
/// Null-like values (see [`is_null_like`]) and strings that fail to parse
/// as a number yield `None`. Booleans coerce to 1.0 / 0.0 and zero is
/// always kept.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if NULL_SENTINELS.contains(&trimmed.to_ascii_lowercase().as_str()) {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}

// ============================================================================
// DECIMAL PLACES
// ============================================================================

/// Counts the fractional digits in a number's default string form.
/// A value without a '.' contributes 0.
pub(crate) fn decimal_places(value: f64) -> usize {
    let text = format!("{}", value);
    match text.find('.') {
        Some(dot) => text.len() - dot - 1,
        None => 0,
    }
}

/// Maximum fractional digits observed across a set of values.
pub(crate) fn max_decimal_places(values: &[f64]) -> usize {
    values.iter().map(|v| decimal_places(*v)).max().unwrap_or(0)
}

/// Rounds to a fixed number of decimal places, half away from zero.
pub(crate) fn round_to(value: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ============================================================================
// ORDERED PARTITIONING
// ============================================================================

/// Partitions rows by the value at `field`, preserving first-seen order of
/// the distinct values and the original relative order of rows within each
/// bucket.
///
/// The partition key is strict JSON value equality (the string "1" and the
/// number 1 form separate buckets). A missing path participates as JSON
/// null. The returned label is the original typed value, not its string
/// form.
pub(crate) fn partition_by(items: &[Arc<Row>], field: &str) -> Vec<(Value, Vec<Arc<Row>>)> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut buckets: Vec<(Value, Vec<Arc<Row>>)> = Vec::new();

    for row in items {
        let value = get_path(row, field).cloned().unwrap_or(Value::Null);
        // JSON text keys keep e.g. "1" (string) and 1 (number) distinct.
        let key = value.to_string();
        match index.get(&key) {
            Some(&slot) => buckets[slot].1.push(Arc::clone(row)),
            None => {
                index.insert(key, buckets.len());
                buckets.push((value, vec![Arc::clone(row)]));
            }
        }
    }

    buckets
}
