//! # JSON-RPC Server Prelude
//!
//! Re-exports of the types needed to define services and run a dispatcher.
//!
//! ```rust
//! use turul_json_rpc_server::prelude::*;
//! ```

// Service definition
pub use crate::descriptor::{ParamType, RpcType};
pub use crate::error::{DispatchError, ServiceError, ToJsonRpcError};
pub use crate::service::{Arguments, Interface, Method, RpcService};

// Dispatch
pub use crate::config::DispatcherConfig;
pub use crate::dispatcher::{JsonRpcDispatcher, PayloadHandler};
pub use crate::registry::ServiceRegistry;
pub use crate::routing::{MethodRouter, Route, SeparatorRouter};

// Wire types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse, ResponseResult};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
