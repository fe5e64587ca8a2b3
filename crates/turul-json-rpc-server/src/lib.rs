//! # Multi-Service JSON-RPC 2.0 Dispatcher
//!
//! A transport-agnostic JSON-RPC 2.0 engine that routes calls to named
//! services and picks between overloaded methods.
//!
//! Method names are qualified with the service they target (`Math.add`).
//! Each service publishes method tables ([`Interface`]s) at registration time;
//! the dispatcher binds the call's params against every same-named method,
//! ranks the candidates that fit and invokes the best one.
//!
//! ## Features
//! - Positional and named params, with optional default values
//! - Overload resolution by arity and coercion cost
//! - Batches, dispatched concurrently with replies in request order
//! - Handler errors and panics contained per envelope
//! - Pluggable routing through [`MethodRouter`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use turul_json_rpc_server::prelude::*;
//!
//! struct Math;
//!
//! impl RpcService for Math {
//!     fn interfaces(&self) -> Vec<Interface<Self>> {
//!         vec![Interface::new("Math").method(
//!             Method::new("add")
//!                 .param::<i64>("a")
//!                 .param::<i64>("b")
//!                 .returns::<i64>()
//!                 .sync_handler(|_: &Math, args| Ok(args.get::<i64>(0)? + args.get::<i64>(1)?)),
//!         )]
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let dispatcher = JsonRpcDispatcher::builder()
//!     .service("Math", Arc::new(Math))
//!     .build();
//!
//! let reply = dispatcher
//!     .handle_str(r#"{"jsonrpc":"2.0","method":"Math.add","params":[2,3],"id":1}"#)
//!     .await;
//! assert_eq!(reply.as_deref(), Some(r#"{"jsonrpc":"2.0","result":5,"id":1}"#));
//! # });
//! ```

pub mod batch;
pub mod binder;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod notification;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod routing;
pub mod service;
pub mod types;

// Re-export main types
pub use config::DispatcherConfig;
pub use descriptor::{
    InterfaceDescriptor, MethodDescriptor, ParamDescriptor, ParamType, RpcType, StructShape,
};
pub use dispatch::JsonRpcEnvelope;
pub use dispatcher::{JsonRpcDispatcher, JsonRpcDispatcherBuilder, PayloadHandler};
pub use error::{
    DispatchError, JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, ServiceError,
    ToJsonRpcError,
};
pub use notification::JsonRpcNotification;
pub use registry::ServiceRegistry;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse, ResponseResult};
pub use routing::{MethodRouter, Route, SeparatorRouter};
pub use service::{Arguments, Interface, Method, RpcService, ServiceMethod};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    // Whole block reserved for the protocol
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
