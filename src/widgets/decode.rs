// src/widgets/decode.rs — Response decoding boundary
//
// The admin API wraps payloads as `{ success, data, message }`. A few
// endpoints (pending orders) put their fields next to `success` instead of
// under `data`. Decoding is a pure `Value -> payload` step; the polling
// machinery never sees raw JSON.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::WidgetKind;
use crate::infra::errors::FitdashError;

/// A decoded, normalized widget payload.
pub trait WidgetPayload: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: WidgetKind;

    /// Fix up a freshly deserialized value (ordering, dedup, derived fields).
    fn normalize(&mut self) {}

    /// One-line human summary, used by the CLI.
    fn summary(&self) -> String;

    fn decode(raw: Value) -> Result<Self, FitdashError> {
        let payload = unwrap_envelope(Self::KIND, raw)?;
        let mut value: Self =
            serde_json::from_value(payload).map_err(|e| FitdashError::Decode {
                widget: Self::KIND.slug().to_string(),
                message: e.to_string(),
            })?;
        value.normalize();
        Ok(value)
    }
}

/// Strip the `{ success, data, message }` envelope. `success` must be `true`;
/// anything else is reported with the server's message or a per-widget default.
pub fn unwrap_envelope(kind: WidgetKind, raw: Value) -> Result<Value, FitdashError> {
    let Value::Object(mut map) = raw else {
        return Err(FitdashError::Decode {
            widget: kind.slug().to_string(),
            message: "expected a JSON object".into(),
        });
    };

    let success = map.get("success").and_then(Value::as_bool).unwrap_or(false);
    let message = map
        .remove("message")
        .and_then(|m| m.as_str().map(str::to_string))
        .filter(|m| !m.is_empty());

    if !success {
        return Err(FitdashError::Api {
            message: message.unwrap_or_else(|| format!("Failed to fetch {}", kind.display_name())),
        });
    }

    match map.remove("data") {
        Some(data) if !data.is_null() => Ok(data),
        _ => {
            map.remove("success");
            Ok(Value::Object(map))
        }
    }
}

/// Accepts numbers, numeric strings ("149.00") and null. Anything unparsable is 0.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Accepts numbers or strings as an identifier.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
