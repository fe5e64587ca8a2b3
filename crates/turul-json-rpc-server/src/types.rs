use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Correlation id of a JSON-RPC call.
///
/// A call may carry a string, a number or an explicit `null`. `Null` is also
/// used on responses whose originating id could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    /// Fractional or beyond `i64`; echoed back exactly as received
    OtherNumber(Number),
    Null,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::OtherNumber(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    /// Read an id out of a raw envelope field.
    ///
    /// Returns `None` for booleans, arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => RequestId::Number(i),
                None => RequestId::OtherNumber(n.clone()),
            }),
            Value::Null => Some(RequestId::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            crate::JSONRPC_VERSION => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::Number(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");

        let wide: RequestId = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(serde_json::to_string(&wide).unwrap(), "18446744073709551615");
        let fractional: RequestId = serde_json::from_str("1.5").unwrap();
        assert_eq!(fractional.to_string(), "1.5");
    }

    #[test]
    fn test_request_id_deserializes_null() {
        let id: RequestId = serde_json::from_str("null").unwrap();
        assert_eq!(id, RequestId::Null);
    }

    #[test]
    fn test_request_id_from_value() {
        assert_eq!(RequestId::from_value(&json!(7)), Some(RequestId::Number(7)));
        assert_eq!(
            RequestId::from_value(&json!("abc")),
            Some(RequestId::String("abc".to_string()))
        );
        assert_eq!(RequestId::from_value(&json!(null)), Some(RequestId::Null));
        assert_eq!(
            RequestId::from_value(&json!(1.5)),
            Some(RequestId::OtherNumber(Number::from_f64(1.5).unwrap()))
        );
        assert_eq!(
            RequestId::from_value(&json!(u64::MAX)),
            Some(RequestId::OtherNumber(Number::from(u64::MAX)))
        );
        assert_eq!(RequestId::from_value(&json!(true)), None);
        assert_eq!(RequestId::from_value(&json!([1])), None);
    }

    #[test]
    fn test_json_rpc_version() {
        let version = JsonRpcVersion::V2_0;
        assert_eq!(version.as_str(), "2.0");
        assert_eq!(serde_json::to_string(&version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_err());
    }
}
