use serde_json::Value;

use crate::error::RelayError;
use crate::types::RequestBody;

/// Pull the request body out of a gateway event. The body may arrive as a
/// JSON string (proxy integration) or already decoded (direct invoke).
pub fn decode_body(event: &Value) -> Result<RequestBody, RelayError> {
    let body = match event.get("body") {
        None | Some(Value::Null) => return Err(RelayError::MissingBody),
        Some(Value::String(raw)) => {
            serde_json::from_str::<Value>(raw).map_err(RelayError::InvalidJson)?
        }
        Some(other) => other.clone(),
    };

    if !body.is_object() {
        return Err(RelayError::NotAnObject);
    }

    // Every field is an untyped `Value`, so an object always decodes.
    serde_json::from_value(body).map_err(|e| RelayError::Unexpected(e.to_string()))
}
