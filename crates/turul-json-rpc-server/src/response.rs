use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Result data for a JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseResult {
    /// Success result with data
    Success(Value),
    /// Null result (for methods without a return value)
    Null,
}

impl ResponseResult {
    pub fn is_null(&self) -> bool {
        match self {
            ResponseResult::Null => true,
            ResponseResult::Success(value) => value.is_null(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResponseResult::Success(value) => Some(value),
            ResponseResult::Null => None,
        }
    }
}

impl From<Value> for ResponseResult {
    fn from(value: Value) -> Self {
        if value.is_null() {
            ResponseResult::Null
        } else {
            ResponseResult::Success(value)
        }
    }
}

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: ResponseResult,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: ResponseResult) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, result.into())
    }
}

/// Either a successful response or an error response.
///
/// Keeping the two apart guarantees that a response never carries both
/// `result` and `error`, and never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: RequestId, result: ResponseResult) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    /// Create an error message
    pub fn error(error: JsonRpcError) -> Self {
        Self::Error(error)
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// The id mirrored from the request (`Null` when it was unknown)
    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<i64> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(err.error.code),
        }
    }

    /// Result value, if this is a successful response
    pub fn result(&self) -> Option<&ResponseResult> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// What goes back to the transport for one inbound payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcOutput {
    /// Reply to a single envelope, or a top-level error for the whole payload
    Single(JsonRpcMessage),
    /// Ordered replies to the calls of a batch
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcOutput {
    /// All messages carried by this output, in order
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            JsonRpcOutput::Single(message) => std::slice::from_ref(message),
            JsonRpcOutput::Batch(messages) => messages,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, JsonRpcOutput::Batch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorObject;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_response_wire_shape() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!(5));
        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","result":5,"id":1}"#
        );
    }

    #[test]
    fn test_null_result_is_still_present() {
        let message = JsonRpcMessage::success(RequestId::from("a"), ResponseResult::Null);
        assert_eq!(
            to_string(&message).unwrap(),
            r#"{"jsonrpc":"2.0","result":null,"id":"a"}"#
        );
    }

    #[test]
    fn test_error_message_wire_shape() {
        let message = JsonRpcMessage::error(JsonRpcError::new(
            RequestId::Null,
            JsonRpcErrorObject::invalid_request(None),
        ));
        assert_eq!(
            to_string(&message).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":null}"#
        );
        assert_eq!(message.error_code(), Some(-32600));
        assert!(message.result().is_none());
    }

    #[test]
    fn test_round_trip_is_byte_stable() {
        let outputs = vec![
            JsonRpcOutput::Single(JsonRpcMessage::success(
                RequestId::Number(1),
                ResponseResult::Success(json!({"sum": 5, "terms": [2, 3]})),
            )),
            JsonRpcOutput::Single(JsonRpcMessage::success(
                RequestId::Null,
                ResponseResult::Null,
            )),
            JsonRpcOutput::Batch(vec![
                JsonRpcMessage::success(RequestId::from("x"), ResponseResult::Success(json!(true))),
                JsonRpcMessage::error(JsonRpcError::method_not_found(
                    RequestId::Number(2),
                    "Foo.bar",
                )),
            ]),
        ];

        for output in outputs {
            let first = to_string(&output).unwrap();
            let parsed: JsonRpcOutput = from_str(&first).unwrap();
            let second = to_string(&parsed).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_error_payload_does_not_parse_as_success() {
        let json = r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":3}"#;
        let parsed: JsonRpcMessage = from_str(json).unwrap();
        assert!(parsed.is_error());
        assert_eq!(parsed.id(), &RequestId::Number(3));
    }

    #[test]
    fn test_response_result_conversion() {
        let value_result: ResponseResult = json!({"data": 42}).into();
        assert!(matches!(value_result, ResponseResult::Success(_)));

        let null_result: ResponseResult = json!(null).into();
        assert!(null_result.is_null());
    }
}
