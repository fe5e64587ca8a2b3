use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{request::RequestParams, types::JsonRpcVersion};

/// A JSON-RPC notification (request without an id)
///
/// Notifications are dispatched like calls but their outcome, success or
/// failure, is never reported back to the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcNotification {
    pub fn new(method: String, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method,
            params,
        }
    }

    /// Create a new notification with no parameters
    pub fn new_no_params(method: String) -> Self {
        Self::new(method, None)
    }

    /// Create a new notification with positional parameters
    pub fn new_with_array_params(method: String, params: Vec<Value>) -> Self {
        Self::new(method, Some(RequestParams::Array(params)))
    }
}
