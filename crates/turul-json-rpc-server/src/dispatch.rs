//! Envelope validation: turns a generic JSON tree into a typed call or
//! notification, or explains why it cannot.

use serde_json::{Map, Value};

use crate::{
    error::{DispatchError, JsonRpcTransportError},
    notification::JsonRpcNotification,
    request::{JsonRpcRequest, RequestParams},
    types::RequestId,
};

/// A validated inbound envelope
#[derive(Debug, Clone)]
pub enum JsonRpcEnvelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl JsonRpcEnvelope {
    /// Get the method name
    pub fn method(&self) -> &str {
        match self {
            JsonRpcEnvelope::Request(req) => &req.method,
            JsonRpcEnvelope::Notification(notif) => &notif.method,
        }
    }

    /// Check if this is a request (has ID)
    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcEnvelope::Request(_))
    }

    /// Check if this is a notification (no ID)
    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcEnvelope::Notification(_))
    }

    /// Get the request ID if this is a request
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcEnvelope::Request(req) => Some(&req.id),
            JsonRpcEnvelope::Notification(_) => None,
        }
    }
}

/// An envelope that failed validation.
#[derive(Debug)]
pub struct RejectedEnvelope {
    /// Where the error must be reported: `None` for notifications, which are
    /// never answered, `Some(RequestId::Null)` when the id was unreadable.
    pub reply_to: Option<RequestId>,
    pub error: DispatchError,
}

impl RejectedEnvelope {
    fn new(reply_to: Option<RequestId>, reason: impl Into<String>) -> Self {
        Self {
            reply_to,
            error: DispatchError::InvalidRequest(reason.into()),
        }
    }
}

/// Parse JSON text into a generic tree.
pub fn parse_payload(json_str: &str) -> Result<Value, JsonRpcTransportError> {
    Ok(serde_json::from_str(json_str)?)
}

/// Validate one envelope.
///
/// An object without an `id` member is a notification, even when the rest of
/// it is malformed. Anything that is not an object is answered with a `null`
/// id.
pub fn parse_envelope(value: Value) -> Result<JsonRpcEnvelope, RejectedEnvelope> {
    let Value::Object(mut obj) = value else {
        return Err(RejectedEnvelope::new(
            Some(RequestId::Null),
            "envelope must be a JSON object",
        ));
    };

    let reply_to = match obj.get("id") {
        None => None,
        Some(raw) => match RequestId::from_value(raw) {
            Some(id) => Some(id),
            None => {
                return Err(RejectedEnvelope::new(
                    Some(RequestId::Null),
                    "id must be a string, a number or null",
                ));
            }
        },
    };

    match obj.get("jsonrpc") {
        Some(Value::String(version)) if version == crate::JSONRPC_VERSION => {}
        _ => {
            return Err(RejectedEnvelope::new(
                reply_to,
                "jsonrpc member must be exactly \"2.0\"",
            ));
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(RejectedEnvelope::new(
                reply_to,
                "method must be a non-empty string",
            ));
        }
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => None,
        Some(Value::Array(values)) => Some(RequestParams::Array(values)),
        Some(Value::Object(map)) => Some(named_params(map)),
        Some(_) => {
            return Err(RejectedEnvelope::new(
                reply_to,
                "params must be an array or an object",
            ));
        }
    };

    Ok(match reply_to {
        Some(id) => JsonRpcEnvelope::Request(JsonRpcRequest::new(id, method, params)),
        None => JsonRpcEnvelope::Notification(JsonRpcNotification::new(method, params)),
    })
}

fn named_params(map: Map<String, Value>) -> RequestParams {
    RequestParams::Object(map.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(value: Value) -> RejectedEnvelope {
        match parse_envelope(value) {
            Err(rejected) => rejected,
            Ok(envelope) => panic!("expected rejection, got {:?}", envelope),
        }
    }

    #[test]
    fn test_parse_valid_request() {
        let envelope =
            parse_envelope(json!({"jsonrpc": "2.0", "method": "test", "id": 1})).unwrap();

        assert!(envelope.is_request());
        assert_eq!(envelope.method(), "test");
        assert_eq!(envelope.request_id(), Some(&RequestId::Number(1)));
    }

    #[test]
    fn test_null_id_is_still_a_call() {
        let envelope =
            parse_envelope(json!({"jsonrpc": "2.0", "method": "test", "id": null})).unwrap();
        assert_eq!(envelope.request_id(), Some(&RequestId::Null));
    }

    #[test]
    fn test_parse_valid_notification() {
        let envelope = parse_envelope(json!({"jsonrpc": "2.0", "method": "notify"})).unwrap();

        assert!(envelope.is_notification());
        assert_eq!(envelope.method(), "notify");
        assert_eq!(envelope.request_id(), None);
    }

    #[test]
    fn test_params_shapes() {
        let JsonRpcEnvelope::Request(positional) = parse_envelope(
            json!({"jsonrpc": "2.0", "method": "m", "params": [1, 2], "id": 1}),
        )
        .unwrap() else {
            panic!("expected request");
        };
        assert!(matches!(positional.params, Some(RequestParams::Array(ref v)) if v.len() == 2));

        let JsonRpcEnvelope::Request(named) = parse_envelope(
            json!({"jsonrpc": "2.0", "method": "m", "params": {"a": 1}, "id": 1}),
        )
        .unwrap() else {
            panic!("expected request");
        };
        assert_eq!(named.get_param("a"), Some(&json!(1)));

        let JsonRpcEnvelope::Request(absent) = parse_envelope(
            json!({"jsonrpc": "2.0", "method": "m", "params": null, "id": 1}),
        )
        .unwrap() else {
            panic!("expected request");
        };
        assert!(absent.params.is_none());
    }

    #[test]
    fn test_parse_invalid_version() {
        let rejected = rejected(json!({"jsonrpc": "1.0", "method": "test", "id": 1}));
        assert_eq!(rejected.reply_to, Some(RequestId::Number(1)));
        assert!(matches!(rejected.error, DispatchError::InvalidRequest(_)));
    }

    #[test]
    fn test_empty_method_is_rejected() {
        let rejected = rejected(json!({"jsonrpc": "2.0", "method": "", "id": "a"}));
        assert_eq!(rejected.reply_to, Some(RequestId::from("a")));
    }

    #[test]
    fn test_scalar_params_are_rejected() {
        let rejected = rejected(json!({"jsonrpc": "2.0", "method": "m", "params": 3, "id": 9}));
        assert_eq!(rejected.reply_to, Some(RequestId::Number(9)));
    }

    #[test]
    fn test_non_object_gets_null_id() {
        let rejected = rejected(json!(42));
        assert_eq!(rejected.reply_to, Some(RequestId::Null));
    }

    #[test]
    fn test_wide_and_fractional_ids_are_kept() {
        for raw in [json!(1.5), json!(u64::MAX), json!(-0.25)] {
            let envelope =
                parse_envelope(json!({"jsonrpc": "2.0", "method": "m", "id": raw.clone()})).unwrap();
            let id = envelope.request_id().unwrap();
            assert!(matches!(id, RequestId::OtherNumber(_)));
            assert_eq!(serde_json::to_value(id).unwrap(), raw);
        }
    }

    #[test]
    fn test_unreadable_id_gets_null_id() {
        let rejected = rejected(json!({"jsonrpc": "2.0", "method": "m", "id": {"x": 1}}));
        assert_eq!(rejected.reply_to, Some(RequestId::Null));
    }

    #[test]
    fn test_malformed_notification_stays_silent() {
        let rejected = rejected(json!({"jsonrpc": "2.0", "params": [1]}));
        assert_eq!(rejected.reply_to, None);
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_payload(r#"{"jsonrpc": "2.0", "method": "test""#);
        assert!(matches!(result, Err(JsonRpcTransportError::JsonParseError(_))));
    }
}
