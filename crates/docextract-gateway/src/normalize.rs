//! Best-effort mapping of an untyped upstream payload into text + entities.
//!
//! The upstream response schema is not guaranteed, so every lookup here is a
//! first-present-wins fallback chain over `serde_json::Value`. Nothing in this
//! module fails: shape problems collapse into fixed fallback values.

use docextract_core::Entity;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const NO_TEXT: &str = "No text extracted";
pub const TEXT_ERROR: &str = "Error extracting text";

/// A spot where the payload held `null` but an object had to be read.
#[derive(Debug, Error)]
#[error("unexpected payload shape at {0}")]
struct ShapeError(String);

type ShapeResult<T> = std::result::Result<T, ShapeError>;

/// Extracted text and entities for a payload.
pub fn normalize(payload: &Value) -> (String, Vec<Entity>) {
    (extract_text(payload), extract_entities(payload))
}

/// Text precedence on `predictions[0]`: `extracted_text`, `ocr_text`,
/// `text`, joined `text_segments`, joined `regions`. Without predictions the
/// top-level `text` and `ocr_result` fields are tried.
pub fn extract_text(payload: &Value) -> String {
    match try_extract_text(payload) {
        Ok(Some(text)) => text,
        Ok(None) => NO_TEXT.to_string(),
        Err(e) => {
            debug!("Text normalization fell back: {}", e);
            TEXT_ERROR.to_string()
        }
    }
}

/// Entities from `predictions[0]`, emitted in category order: `entities`,
/// `key_value_pairs`, `tables`, `bounding_boxes`.
pub fn extract_entities(payload: &Value) -> Vec<Entity> {
    try_extract_entities(payload).unwrap_or_else(|e| {
        debug!("Entity normalization fell back: {}", e);
        Vec::new()
    })
}

fn try_extract_text(payload: &Value) -> ShapeResult<Option<String>> {
    let Some(prediction) = first_prediction(payload)? else {
        return Ok(first_text(payload, &["text", "ocr_result"]));
    };

    if let Some(text) = first_text(prediction, &["extracted_text", "ocr_text", "text"]) {
        return Ok(Some(text));
    }

    if let Some(segments) = non_empty_array(prediction, "text_segments") {
        let parts = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| -> ShapeResult<String> {
                match segment {
                    Value::String(s) => Ok(s.clone()),
                    other => Ok(first_text(not_null(other, "text_segments", i)?, &["text"])
                        .unwrap_or_default()),
                }
            })
            .collect::<ShapeResult<Vec<_>>>()?;
        return Ok(Some(parts.join(" ")));
    }

    if let Some(regions) = non_empty_array(prediction, "regions") {
        let parts = regions
            .iter()
            .enumerate()
            .map(|(i, region)| -> ShapeResult<String> {
                Ok(first_text(not_null(region, "regions", i)?, &["text", "value"])
                    .unwrap_or_default())
            })
            .collect::<ShapeResult<Vec<_>>>()?;
        return Ok(Some(parts.join(" ")));
    }

    Ok(None)
}

fn try_extract_entities(payload: &Value) -> ShapeResult<Vec<Entity>> {
    let Some(prediction) = first_prediction(payload)? else {
        return Ok(Vec::new());
    };

    let mut entities = Vec::new();

    if let Some(items) = array(prediction, "entities") {
        for (i, item) in items.iter().enumerate() {
            let item = not_null(item, "entities", i)?;
            entities.push(Entity::new(
                first_text(item, &["label", "class"]).unwrap_or_else(|| "Unknown".into()),
                first_text(item, &["text", "content"]).unwrap_or_default(),
                first_score(item, &["score", "probability"]),
            ));
        }
    }

    if let Some(pairs) = array(prediction, "key_value_pairs") {
        for (i, pair) in pairs.iter().enumerate() {
            let pair = not_null(pair, "key_value_pairs", i)?;
            entities.push(Entity::new(
                first_text(pair, &["key"]).unwrap_or_else(|| "Key-Value".into()),
                pair.get("value").and_then(scalar_text).unwrap_or_default(),
                first_score(pair, &["confidence"]),
            ));
        }
    }

    if let Some(tables) = array(prediction, "tables") {
        for (i, table) in tables.iter().enumerate() {
            let table = not_null(table, "tables", i)?;
            let rows = array(table, "rows")
                .or_else(|| array(table, "data"))
                .map_or(0, Vec::len);
            entities.push(Entity::new(
                "Table",
                format!("Table {} ({} rows)", i + 1, rows),
                first_score(table, &["confidence"]),
            ));
        }
    }

    if let Some(boxes) = array(prediction, "bounding_boxes") {
        for (i, bbox) in boxes.iter().enumerate() {
            let bbox = not_null(bbox, "bounding_boxes", i)?;
            entities.push(Entity::new(
                first_text(bbox, &["label", "class"]).unwrap_or_else(|| "Detection".into()),
                first_text(bbox, &["text", "value"])
                    .unwrap_or_else(|| format!("Detection {}", i + 1)),
                first_score(bbox, &["score", "confidence"]),
            ));
        }
    }

    Ok(entities)
}

/// `predictions[0]` when `predictions` is a non-empty array.
fn first_prediction(payload: &Value) -> ShapeResult<Option<&Value>> {
    if payload.is_null() {
        return Err(ShapeError("payload".into()));
    }
    match non_empty_array(payload, "predictions") {
        Some(predictions) => not_null(&predictions[0], "predictions", 0).map(Some),
        None => Ok(None),
    }
}

fn not_null<'a>(value: &'a Value, field: &str, index: usize) -> ShapeResult<&'a Value> {
    if value.is_null() {
        Err(ShapeError(format!("{}[{}]", field, index)))
    } else {
        Ok(value)
    }
}

fn array<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

fn non_empty_array<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    array(value, key).filter(|items| !items.is_empty())
}

/// First key whose value renders as non-empty text.
fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(scalar_text))
}

/// First numeric score among `keys`, clamped to `[0, 1]`; 0 if none.
fn first_score(value: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
        .map_or(0.0, |score| score.clamp(0.0, 1.0))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
