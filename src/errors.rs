use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured validation error raised on schema mismatch, with the
/// field-level message surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// One entry of a FastAPI-style 422 `detail` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDetail {
    /// Location path into the offending request field (strings and indices).
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Remote error shapes this client recognizes structurally.
///
/// Decoding never guesses: a payload either matches one of these shapes or
/// it is passed through raw on the [`ApiError`] for the caller to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorShape {
    NotFound { error: String },
    Unauthorized { error: String },
    Forbidden { error: String },
    Conflict { error: String },
    Network { error: String },
    ValidationDetail { detail: Vec<FieldDetail> },
}

impl ApiErrorShape {
    /// Structurally match a raw JSON payload against the known shapes.
    pub fn decode(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        if let Some(detail) = obj.get("detail") {
            if let Ok(detail) = serde_json::from_value::<Vec<FieldDetail>>(detail.clone()) {
                return Some(ApiErrorShape::ValidationDetail { detail });
            }
        }

        if obj.get("type").and_then(Value::as_str) == Some("network") {
            return Some(ApiErrorShape::Network {
                error: shape_message(obj, "Network error. Please check your connection and try again."),
            });
        }

        match obj.get("status").and_then(Value::as_u64)? {
            404 => Some(ApiErrorShape::NotFound {
                error: shape_message(obj, "Not found. Please verify the resource exists and you have access to it."),
            }),
            401 => Some(ApiErrorShape::Unauthorized {
                error: shape_message(obj, "You don't have permission to access this resource."),
            }),
            403 => Some(ApiErrorShape::Forbidden {
                error: shape_message(obj, "Access to this resource is not allowed."),
            }),
            409 => Some(ApiErrorShape::Conflict {
                error: shape_message(obj, "This resource already exists."),
            }),
            _ => None,
        }
    }

    /// HTTP status implied by the shape, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiErrorShape::NotFound { .. } => Some(404),
            ApiErrorShape::Unauthorized { .. } => Some(401),
            ApiErrorShape::Forbidden { .. } => Some(403),
            ApiErrorShape::Conflict { .. } => Some(409),
            ApiErrorShape::ValidationDetail { .. } => Some(422),
            ApiErrorShape::Network { .. } => None,
        }
    }

    /// Human-readable message carried by the shape.
    pub fn message(&self) -> String {
        match self {
            ApiErrorShape::NotFound { error }
            | ApiErrorShape::Unauthorized { error }
            | ApiErrorShape::Forbidden { error }
            | ApiErrorShape::Conflict { error }
            | ApiErrorShape::Network { error } => error.clone(),
            ApiErrorShape::ValidationDetail { detail } => detail
                .iter()
                .map(|d| d.msg.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

fn shape_message(obj: &serde_json::Map<String, Value>, default: &str) -> String {
    obj.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Error envelope for non-2xx responses. `shape` is present when the body
/// matched a recognized shape; `raw_body` always carries the payload.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub shape: Option<ApiErrorShape>,
    pub raw_body: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Convenience alias for fallible results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level error (timeouts, DNS/TLS/connectivity). Not normalized
/// further: the reqwest source is kept for inspection.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

/// Broad transport error kinds for classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "transport",
        };
        write!(f, "{label}")
    }
}

/// Unified error type surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no API key configured; set Config.api_key or the {env} environment variable", env = crate::API_KEY_ENV)]
    Auth,

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to ensure upload folder exists: {0}")]
    UploadFolder(#[source] Box<Error>),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_error_formats_with_field() {
        let err = ValidationError::new("is required").with_field("deployment_id");
        assert_eq!(err.to_string(), "deployment_id: is required");
    }

    #[test]
    fn decodes_not_found_shape() {
        let payload = json!({ "error": "Output not found.", "status": 404 });
        let shape = ApiErrorShape::decode(&payload).expect("shape");
        assert_eq!(
            shape,
            ApiErrorShape::NotFound {
                error: "Output not found.".into()
            }
        );
        assert_eq!(shape.status(), Some(404));
    }

    #[test]
    fn decodes_status_shapes_with_default_messages() {
        for status in [401u16, 403, 409] {
            let payload = json!({ "status": status });
            let shape = ApiErrorShape::decode(&payload).expect("shape");
            assert_eq!(shape.status(), Some(status));
            assert!(!shape.message().is_empty());
        }
    }

    #[test]
    fn decodes_network_shape() {
        let payload = json!({ "error": "connection reset", "type": "network" });
        let shape = ApiErrorShape::decode(&payload).expect("shape");
        assert_eq!(
            shape,
            ApiErrorShape::Network {
                error: "connection reset".into()
            }
        );
        assert_eq!(shape.status(), None);
    }

    #[test]
    fn decodes_validation_detail_shape() {
        let payload = json!({
            "detail": [
                { "loc": ["body", "inputs", 0], "msg": "field required", "type": "missing" }
            ]
        });
        let shape = ApiErrorShape::decode(&payload).expect("shape");
        match &shape {
            ApiErrorShape::ValidationDetail { detail } => {
                assert_eq!(detail.len(), 1);
                assert_eq!(detail[0].msg, "field required");
            }
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(shape.message(), "field required");
    }

    #[test]
    fn unrecognized_payload_does_not_decode() {
        assert_eq!(ApiErrorShape::decode(&json!({ "status": 500 })), None);
        assert_eq!(ApiErrorShape::decode(&json!("boom")), None);
        assert_eq!(ApiErrorShape::decode(&json!({ "detail": "plain string" })), None);
    }

    #[test]
    fn api_error_keeps_status_and_body() {
        let err = ApiError {
            status: 404,
            message: "Output not found.".into(),
            shape: Some(ApiErrorShape::NotFound {
                error: "Output not found.".into(),
            }),
            raw_body: Some("{\"status\":404}".into()),
        };
        assert_eq!(err.to_string(), "404: Output not found.");
    }
}
