//! Pre-write document hygiene.
//!
//! Everything that leaves for a backend goes through this module: renderer-
//! injected and legacy fields are stripped, `Null` placeholders (what
//! `Option::None` serializes to) are dropped, a title is derived from the
//! root label when missing, and the result is gated on having a non-empty
//! root label at all.

use serde_json::{Map, Value};

use crate::error::{MapError, MapResult};

/// Recursively keep only `content` and (when present) `children`.
///
/// Idempotent; the output shares no structure with the input.
pub fn sanitize(node: &Value) -> Value {
    let Some(obj) = node.as_object() else {
        return node.clone();
    };
    let mut clean = Map::new();
    if let Some(content) = obj.get("content") {
        clean.insert("content".to_string(), content.clone());
    }
    if let Some(Value::Array(children)) = obj.get("children") {
        let clean_children: Vec<Value> = children.iter().map(sanitize).collect();
        clean.insert("children".to_string(), Value::Array(clean_children));
    }
    Value::Object(clean)
}

/// Drop `Null` object entries and `Null` array elements, recursively.
///
/// JSON has no `undefined`; `Null` is what absent optional fields serialize
/// to, and the remote store rejects documents carrying them. Defined values
/// pass through structurally copied.
pub fn strip_undefined(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(strip_undefined)
                .collect(),
        ),
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_undefined(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// If the document has no `title` and its root label is a non-empty string,
/// promote the label to the title.
pub fn derive_title(doc: &mut Value) {
    let Some(obj) = doc.as_object_mut() else {
        return;
    };
    if obj.get("title").is_some() {
        return;
    }
    let label = obj
        .get("content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if let Some(label) = label {
        obj.insert("title".to_string(), Value::String(label));
    }
}

/// Validation gate before any write: the root must carry a non-empty
/// (trimmed) string label. Rejected documents never reach a backend.
pub fn validate_root(doc: &Value) -> MapResult<()> {
    match doc.get("content").and_then(Value::as_str) {
        Some(label) if !label.trim().is_empty() => Ok(()),
        _ => Err(MapError::Validation(
            "the map has no root topic; set one before saving".to_string(),
        )),
    }
}

/// The full pre-write pipeline: sanitize, strip, derive title, validate.
pub fn prepare_for_save(tree: &Value) -> MapResult<Value> {
    let mut doc = strip_undefined(&sanitize(tree));
    derive_title(&mut doc);
    validate_root(&doc)?;
    Ok(doc)
}
