//! Per-envelope dispatch: route, resolve, invoke, and turn every outcome into
//! a JSON-RPC reply.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    config::DispatcherConfig,
    dispatch::{JsonRpcEnvelope, RejectedEnvelope, parse_envelope, parse_payload},
    error::{DispatchError, JsonRpcError, ServiceError, ToJsonRpcError},
    notification::JsonRpcNotification,
    registry::ServiceRegistry,
    request::{JsonRpcRequest, RequestParams},
    resolver::{self, ResolveError},
    response::{JsonRpcMessage, JsonRpcOutput},
    routing::{MethodRouter, Route, SeparatorRouter},
    service::{Interface, RpcService},
    types::RequestId,
};

/// Sent when a reply cannot be serialized. Kept as literal text so that
/// producing it cannot fail too.
const SERIALIZATION_FAILURE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// Transport-facing entry points.
///
/// Transports hand over whatever they received and send back whatever comes
/// out; `None` means nothing is sent.
#[async_trait]
pub trait PayloadHandler: Send + Sync {
    /// Handle a decoded payload: one envelope or a batch
    async fn handle_payload(&self, payload: Value) -> Option<JsonRpcOutput>;

    /// Handle raw JSON text. Text that is not JSON is answered with a parse
    /// error carrying a `null` id.
    async fn handle_str(&self, payload: &str) -> Option<String> {
        let output = match parse_payload(payload) {
            Ok(value) => self.handle_payload(value).await?,
            Err(e) => {
                warn!("Rejecting unparseable payload: {}", e);
                JsonRpcOutput::Single(JsonRpcMessage::error(JsonRpcError::new(
                    RequestId::Null,
                    e.to_error_object(),
                )))
            }
        };

        match serde_json::to_string(&output) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Failed to serialize reply: {}", e);
                Some(SERIALIZATION_FAILURE.to_string())
            }
        }
    }
}

/// Multi-service JSON-RPC dispatcher.
///
/// Cheap to share: wrap it in an `Arc` and call it from as many tasks as
/// there are inbound messages.
pub struct JsonRpcDispatcher {
    registry: Arc<ServiceRegistry>,
    router: Arc<dyn MethodRouter>,
    pub(crate) config: DispatcherConfig,
}

impl JsonRpcDispatcher {
    /// Dispatcher over `registry` with the default configuration
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::builder().registry(registry).build()
    }

    pub fn builder() -> JsonRpcDispatcherBuilder {
        JsonRpcDispatcherBuilder::default()
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatch one decoded envelope. Returns `None` for notifications.
    pub async fn dispatch(&self, envelope: Value) -> Option<JsonRpcMessage> {
        self.settle(parse_envelope(envelope)).await
    }

    pub(crate) async fn settle(
        &self,
        envelope: Result<JsonRpcEnvelope, RejectedEnvelope>,
    ) -> Option<JsonRpcMessage> {
        match envelope {
            Ok(JsonRpcEnvelope::Request(request)) => Some(self.handle_request(request).await),
            Ok(JsonRpcEnvelope::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            Err(RejectedEnvelope { reply_to, error }) => {
                log_failure(&error);
                reply_to.map(|id| JsonRpcMessage::error(JsonRpcError::new(id, error.to_error_object())))
            }
        }
    }

    /// Process a call and produce its reply
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Dispatching '{}' (id {})", request.method, request.id);
        match self.invoke(&request.method, request.params).await {
            Ok(result) => JsonRpcMessage::success(request.id, result.into()),
            Err(e) => {
                log_failure(&e);
                JsonRpcMessage::error(JsonRpcError::new(request.id, e.to_error_object()))
            }
        }
    }

    /// Process a notification. Its outcome is only logged.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        debug!("Dispatching notification '{}'", notification.method);
        if let Err(e) = self.invoke(&notification.method, notification.params).await {
            log_failure(&e);
        }
    }

    /// Every callable wire method name, spelled the way the router accepts it.
    ///
    /// Unqualified names that reach the default service are listed as well.
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods = Vec::new();
        for service in self.registry.service_names() {
            let Ok(interfaces) = self.registry.interfaces_for(&service) else {
                continue;
            };
            for method in interfaces.iter().flat_map(|i| i.methods.iter()) {
                let target = Route {
                    service: service.clone(),
                    method: method.name.clone(),
                };
                for name in self.router.wire_names(&target) {
                    if !methods.contains(&name) {
                        methods.push(name);
                    }
                }
            }
        }
        methods
    }

    async fn invoke(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, DispatchError> {
        let route = self.router.route(method);
        let entry = self.registry.entry(&route.service)?;

        let resolved = resolver::resolve(
            entry.interfaces.iter().map(|i| i.methods.as_slice()),
            &route.method,
            params.as_ref(),
        )
        .map_err(|e| match &e {
            ResolveError::NotFound(_) => DispatchError::MethodNotFound {
                service: route.service.clone(),
                method: route.method.clone(),
            },
            ResolveError::NoMatchingSignature { .. } => DispatchError::InvalidParams {
                method: method.to_string(),
                reason: e.to_string(),
            },
            ResolveError::Ambiguous { candidates, .. } => DispatchError::AmbiguousMethod {
                method: method.to_string(),
                candidates: *candidates,
            },
        })?;

        debug!(
            "'{}' resolved to {}::{} on {}",
            method,
            entry.interfaces[resolved.interface].name,
            resolved.method.descriptor,
            entry.type_name()
        );

        let call = resolved.method.invoke(resolved.binding.arguments);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DispatchError::HandlerFailure {
                method: method.to_string(),
                source,
            }),
            Err(panic) => {
                error!("Handler for '{}' panicked: {}", method, panic_message(&*panic));
                Err(DispatchError::HandlerFailure {
                    method: method.to_string(),
                    source: ServiceError::internal("Internal error"),
                })
            }
        }
    }
}

#[async_trait]
impl PayloadHandler for JsonRpcDispatcher {
    async fn handle_payload(&self, payload: Value) -> Option<JsonRpcOutput> {
        self.handle_value(payload).await
    }
}

impl std::fmt::Debug for JsonRpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcDispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_failure(e: &DispatchError) {
    match e {
        DispatchError::HandlerFailure {
            source: ServiceError::Internal(_),
            ..
        }
        | DispatchError::AmbiguousMethod { .. }
        | DispatchError::Internal(_) => error!("{}", e),
        DispatchError::HandlerFailure { .. } => debug!("{}", e),
        _ => warn!("{}", e),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

type Registration = Box<dyn FnOnce(&ServiceRegistry) + Send>;

/// Builder for [`JsonRpcDispatcher`]
#[derive(Default)]
pub struct JsonRpcDispatcherBuilder {
    config: DispatcherConfig,
    router: Option<Arc<dyn MethodRouter>>,
    registry: Option<Arc<ServiceRegistry>>,
    registrations: Vec<Registration>,
}

impl JsonRpcDispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.config.separator = separator;
        self
    }

    /// Service that receives method names without a separator
    pub fn default_service(mut self, name: impl Into<String>) -> Self {
        self.config.default_service = Some(name.into());
        self
    }

    pub fn parallel_batches(mut self, parallel: bool) -> Self {
        self.config.parallel_batches = parallel;
        self
    }

    /// Route with a custom strategy instead of the separator rule
    pub fn router(mut self, router: impl MethodRouter + 'static) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    /// Share an existing registry
    pub fn registry(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a service when the dispatcher is built
    pub fn service<S: RpcService>(mut self, name: impl Into<String>, handler: Arc<S>) -> Self {
        let name = name.into();
        self.registrations.push(Box::new(move |registry: &ServiceRegistry| {
            registry.register(name, handler);
        }));
        self
    }

    /// Register a service restricted to one interface when the dispatcher is built
    pub fn service_with_interface<S: RpcService>(
        mut self,
        name: impl Into<String>,
        handler: Arc<S>,
        interface: Interface<S>,
    ) -> Self {
        let name = name.into();
        self.registrations.push(Box::new(move |registry: &ServiceRegistry| {
            registry.register_with_interface(name, handler, interface);
        }));
        self
    }

    pub fn build(self) -> JsonRpcDispatcher {
        let registry = self.registry.unwrap_or_default();
        for register in self.registrations {
            register(&registry);
        }
        let router = self.router.unwrap_or_else(|| {
            Arc::new(SeparatorRouter::new(
                self.config.separator,
                self.config.default_service.clone(),
            ))
        });
        debug!(
            "Built dispatcher over {} service(s) with separator '{}'",
            registry.len(),
            self.config.separator
        );
        JsonRpcDispatcher {
            registry,
            router,
            config: self.config,
        }
    }
}
