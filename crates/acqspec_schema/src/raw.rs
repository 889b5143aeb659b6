//! Raw scalar values as delivered by ingestion.
//!
//! Ingestion hands over header values as JSON. Lists and nested objects occur
//! (e.g. `ImageType`, `PixelSpacing`) and must compare and deduplicate like
//! scalars, so every value has a canonical text form.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// One ingested record: field name → raw value.
pub type RawRow = BTreeMap<String, Value>;

/// Canonical text for a raw value.
///
/// Strings are used verbatim, null becomes empty, numbers and booleans use
/// their JSON text, and lists/objects become compact JSON with sorted keys.
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        // serde_json maps are BTreeMap-backed, so keys serialize sorted.
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Canonical text of `field` in `row`; a missing field reads as null.
pub fn field_text(row: &RawRow, field: &str) -> String {
    row.get(field).map(canonical_text).unwrap_or_default()
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used to sort ingested rows: null < bool < number < string < compound.
pub fn compare_raw(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (fx, fy) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            fx.partial_cmp(&fy)
                .unwrap_or(Ordering::Equal)
                .then_with(|| x.to_string().cmp(&y.to_string()))
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| canonical_text(a).cmp(&canonical_text(b))),
    }
}

/// Project `rows` onto `fields`, drop duplicates (by canonical text), and
/// sort ascending by the fields in the given order.
pub fn distinct_sorted(rows: impl IntoIterator<Item = RawRow>, fields: &[String]) -> Vec<RawRow> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut distinct: Vec<RawRow> = Vec::new();

    for row in rows {
        let key: Vec<String> = fields.iter().map(|f| field_text(&row, f)).collect();
        if !seen.insert(key) {
            continue;
        }
        let projected: RawRow = fields
            .iter()
            .map(|f| (f.clone(), row.get(f).cloned().unwrap_or(Value::Null)))
            .collect();
        distinct.push(projected);
    }

    distinct.sort_by(|a, b| {
        fields
            .iter()
            .map(|f| {
                compare_raw(
                    a.get(f).unwrap_or(&Value::Null),
                    b.get(f).unwrap_or(&Value::Null),
                )
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    distinct
}
