//! Error message extraction from backend error bodies.

use serde_json::Value;

use super::StatusCode;

/// Body fields that may carry a human-readable error, in priority order.
const MESSAGE_FIELDS: [&str; 4] = ["message", "detail", "error", "non_field_errors"];

/// Builds the best available message for a failed response.
///
/// Tries the `message`, `detail`, `error` and `non_field_errors` fields of a
/// JSON object body in that order; list values are joined with `"; "`.
/// Falls back to a generic string built from the status and the raw body.
#[must_use]
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        let found = MESSAGE_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .find_map(render);
        if let Some(message) = found {
            return message;
        }
    }

    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        format!("request failed with status {}", status.as_u16())
    } else {
        format!("request failed with status {}: {raw}", status.as_u16())
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        other => Some(other.to_string()),
    }
}
