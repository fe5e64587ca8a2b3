use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    Application(i64), // outside -32768 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) | JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Classify a raw code supplied by application code.
    ///
    /// Returns `None` for codes inside the reserved block that are neither a
    /// standard code nor in the implementation-defined server range.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            error_codes::PARSE_ERROR => Some(JsonRpcErrorCode::ParseError),
            error_codes::INVALID_REQUEST => Some(JsonRpcErrorCode::InvalidRequest),
            error_codes::METHOD_NOT_FOUND => Some(JsonRpcErrorCode::MethodNotFound),
            error_codes::INVALID_PARAMS => Some(JsonRpcErrorCode::InvalidParams),
            error_codes::INTERNAL_ERROR => Some(JsonRpcErrorCode::InternalError),
            c if (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&c) => {
                Some(JsonRpcErrorCode::ServerError(c))
            }
            c if (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(&c) => None,
            c => Some(JsonRpcErrorCode::Application(c)),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    /// Error raised explicitly by application code.
    ///
    /// Codes outside the reserved block pass through untouched, as do the
    /// standard and server codes. Anything else inside the reserved block is
    /// reported as an internal error carrying the original in `data`.
    pub fn application(code: i64, message: &str, data: Option<Value>) -> Self {
        match JsonRpcErrorCode::from_code(code) {
            Some(kind) => Self::new(kind, Some(message.to_string()), data),
            None => Self::new(
                JsonRpcErrorCode::InternalError,
                None,
                Some(json!({ "code": code, "message": message, "data": data })),
            ),
        }
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: RequestId,
}

impl JsonRpcError {
    pub fn new(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::parse_error(None))
    }

    pub fn invalid_request(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(None))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, message: &str) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_params(message))
    }

    pub fn internal_error(id: RequestId, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Errors returned by service methods.
///
/// Anything a handler returns is converted to a JSON-RPC error object by the
/// dispatcher; nothing a handler does can abort dispatch of other envelopes.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{message}")]
    Application {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        ServiceError::InvalidParams(message.into())
    }

    /// Application error with an explicit code
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        ServiceError::Application {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Attach structured data. Only application errors carry data; other
    /// variants are returned unchanged.
    pub fn with_data(self, data: Value) -> Self {
        match self {
            ServiceError::Application { code, message, .. } => ServiceError::Application {
                code,
                message,
                data: Some(data),
            },
            other => other,
        }
    }
}

/// Everything that can go wrong while dispatching one envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service '{0}' is not registered")]
    ServiceNotFound(String),

    #[error("Method '{method}' not found on service '{service}'")]
    MethodNotFound { service: String, method: String },

    #[error("Invalid params for '{method}': {reason}")]
    InvalidParams { method: String, reason: String },

    #[error("Ambiguous call to '{method}': {candidates} overloads match equally well")]
    AmbiguousMethod { method: String, candidates: usize },

    #[error("Handler for '{method}' failed: {source}")]
    HandlerFailure {
        method: String,
        #[source]
        source: ServiceError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for errors that can be converted to JSON-RPC error objects
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    /// Convert this error to a JSON-RPC error object
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

impl ToJsonRpcError for ServiceError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            ServiceError::InvalidParams(reason) => JsonRpcErrorObject::invalid_params(reason),
            ServiceError::Application {
                code,
                message,
                data,
            } => JsonRpcErrorObject::application(*code, message, data.clone()),
            ServiceError::Internal(message) => {
                JsonRpcErrorObject::internal_error(Some(message.clone()))
            }
        }
    }
}

impl ToJsonRpcError for DispatchError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            DispatchError::InvalidRequest(reason) => {
                JsonRpcErrorObject::invalid_request(Some(Value::String(reason.clone())))
            }
            // Unknown services and unknown methods look the same on the wire.
            DispatchError::ServiceNotFound(_) | DispatchError::MethodNotFound { .. } => {
                JsonRpcErrorObject::new(JsonRpcErrorCode::MethodNotFound, None, None)
            }
            DispatchError::InvalidParams { reason, .. } => {
                JsonRpcErrorObject::invalid_params(reason)
            }
            DispatchError::AmbiguousMethod { .. } | DispatchError::Internal(_) => {
                JsonRpcErrorObject::internal_error(Some(self.to_string()))
            }
            DispatchError::HandlerFailure { source, .. } => source.to_error_object(),
        }
    }
}

/// Transport-level errors for JSON-RPC processing (no domain logic)
#[derive(Debug, Error)]
pub enum JsonRpcTransportError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

impl ToJsonRpcError for JsonRpcTransportError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            JsonRpcTransportError::JsonParseError(e) => {
                JsonRpcErrorObject::parse_error(Some(Value::String(e.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::Application(42).code(), 42);
    }

    #[test]
    fn test_error_serialization() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "test");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("Method 'test' not found"));
        assert!(json.ends_with(r#""id":1}"#));
    }

    #[test]
    fn test_service_and_method_not_found_are_indistinguishable() {
        let service = DispatchError::ServiceNotFound("Foo".to_string()).to_error_object();
        let method = DispatchError::MethodNotFound {
            service: "Foo".to_string(),
            method: "bar".to_string(),
        }
        .to_error_object();

        assert_eq!(service, method);
        assert_eq!(service.code, -32601);
    }

    #[test]
    fn test_dispatch_error_codes() {
        let invalid = DispatchError::InvalidRequest("no method".to_string());
        assert_eq!(invalid.to_error_object().code, -32600);

        let params = DispatchError::InvalidParams {
            method: "add".to_string(),
            reason: "missing parameter 'a'".to_string(),
        };
        let object = params.to_error_object();
        assert_eq!(object.code, -32602);
        assert_eq!(object.message, "missing parameter 'a'");

        let ambiguous = DispatchError::AmbiguousMethod {
            method: "f".to_string(),
            candidates: 2,
        };
        assert_eq!(ambiguous.to_error_object().code, -32603);
    }

    #[test]
    fn test_handler_failures_keep_application_codes() {
        let failure = DispatchError::HandlerFailure {
            method: "Bank.withdraw".to_string(),
            source: ServiceError::application(1001, "insufficient funds")
                .with_data(serde_json::json!({"balance": 3})),
        };
        let object = failure.to_error_object();

        assert_eq!(object.code, 1001);
        assert_eq!(object.message, "insufficient funds");
        assert_eq!(object.data, Some(serde_json::json!({"balance": 3})));
    }

    #[test]
    fn test_reserved_application_codes_become_internal_errors() {
        let object = JsonRpcErrorObject::application(-32500, "reserved", None);
        assert_eq!(object.code, -32603);
        assert_eq!(object.data.unwrap()["code"], -32500);

        let server = JsonRpcErrorObject::application(-32050, "busy", None);
        assert_eq!(server.code, -32050);
        assert_eq!(server.message, "busy");
    }

    #[test]
    fn test_handler_internal_failure() {
        let failure = DispatchError::HandlerFailure {
            method: "Foo.bar".to_string(),
            source: ServiceError::internal("boom"),
        };
        let object = failure.to_error_object();
        assert_eq!(object.code, -32603);
        assert_eq!(object.message, "boom");
    }
}
