use serde::Deserialize;
use serde_json::Value;

use crate::error::{MapError, MapResult};
use crate::models::Node;
use crate::sanitize;

/// The three document layouts observed in the remote store. Older clients
/// wrote the tree under `mapStructure`, the mobile client under `mapData`,
/// the current format under `content`. Matching order encodes precedence.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyDocument {
    Current { content: Value },
    Mobile {
        #[serde(rename = "mapData")]
        map_data: Value,
    },
    Original {
        #[serde(rename = "mapStructure")]
        map_structure: Value,
    },
}

/// Normalize a raw remote document to a single [`Node`] tree.
///
/// Documents carrying none of the three known fields are accepted as a last
/// resort when the document itself is a plausible bare node; anything else is
/// [`MapError::Malformed`].
pub fn normalize_document(doc: &Value) -> MapResult<Node> {
    let payload = match serde_json::from_value::<LegacyDocument>(doc.clone()) {
        Ok(LegacyDocument::Current { content }) => content,
        Ok(LegacyDocument::Mobile { map_data }) => map_data,
        Ok(LegacyDocument::Original { map_structure }) => map_structure,
        Err(_) => doc.clone(),
    };

    // A bare-node document matches `Current` with its own label as the
    // payload; fall back to the document itself in that case.
    let payload = if payload.is_string() { doc.clone() } else { payload };

    if !payload.is_object() {
        return Err(MapError::Malformed(
            "document holds no recognizable map content".to_string(),
        ));
    }

    let clean = sanitize::sanitize(&payload);
    serde_json::from_value::<Node>(clean)
        .map_err(|e| MapError::Malformed(format!("map content does not parse as a tree: {e}")))
}

/// Document key, tolerating the `_id` spelling some backends use.
pub fn document_id(doc: &Value) -> Option<String> {
    doc.get("id")
        .or_else(|| doc.get("_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Display name for a map list entry, fixed precedence: explicit `title`,
/// explicit `name`, the root label under any of the legacy shapes, a bare
/// string `content`, and finally a stub derived from the key.
pub fn display_name(doc: &Value, id: &str) -> String {
    if let Some(title) = doc.get("title").and_then(Value::as_str) {
        return title.to_string();
    }
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        return name.to_string();
    }
    for field in ["content", "mapData", "mapStructure"] {
        if let Some(root_label) = doc
            .get(field)
            .and_then(|payload| payload.get("content"))
        {
            return match root_label.as_str() {
                Some(s) => s.to_string(),
                None => root_label.to_string(),
            };
        }
    }
    if let Some(bare) = doc.get("content").and_then(Value::as_str) {
        return bare.to_string();
    }
    let prefix: String = id.chars().take(8).collect();
    format!("Map {prefix}…")
}
