use serde_json::Value;

/// Best-effort recovery of a JSON value from raw model output.
///
/// Tries a direct parse first, then the widest `{...}` span (first opening to
/// last closing brace). Returns `None` when neither parses; this function
/// never fails loudly — "no usable data" is a caller decision.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Unwraps the shapes models like to emit around a character profile: a
/// one-element array, or the object nested under a `character` key.
pub fn coerce_profile(value: Value) -> Value {
    let value = match value {
        Value::Array(mut items) if !items.is_empty() => items.remove(0),
        other => other,
    };
    match value {
        Value::Object(mut map) if map.contains_key("character") => {
            map.remove("character").unwrap_or(Value::Null)
        }
        other => other,
    }
}
