//! Service definitions.
//!
//! A service is any `Send + Sync` type that publishes one or more method
//! tables ([`Interface`]). Each table entry pairs a [`MethodDescriptor`] with
//! an async invoker, so dispatch needs no runtime reflection.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::descriptor::{InterfaceDescriptor, MethodDescriptor, ParamDescriptor, ParamType, RpcType};
use crate::error::ServiceError;

/// Future returned by a bound method
pub type MethodFuture = BoxFuture<'static, Result<Value, ServiceError>>;

type Invoker<S> = Arc<dyn Fn(Arc<S>, Arguments) -> MethodFuture + Send + Sync>;
type BoundInvoker = Arc<dyn Fn(Arguments) -> MethodFuture + Send + Sync>;

/// Arguments after binding, in formal parameter order.
///
/// Values are already coerced to their formal types, so extraction only fails
/// when the Rust type asked for disagrees with the descriptor.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Arguments {
    pub(crate) fn push(&mut self, name: String, value: Value) {
        self.names.push(name);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Raw value of the parameter at `index`
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Deserialize the parameter at `index`
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ServiceError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| ServiceError::invalid_params(format!("no argument at position {}", index)))?;
        let name = self.names.get(index).map(String::as_str).unwrap_or("?");
        deserialize(name, value)
    }

    /// Deserialize the parameter with formal name `name`
    pub fn named<T: DeserializeOwned>(&self, name: &str) -> Result<T, ServiceError> {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ServiceError::invalid_params(format!("no argument named '{}'", name)))?;
        deserialize(name, &self.values[index])
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

fn deserialize<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T, ServiceError> {
    T::deserialize(value)
        .map_err(|e| ServiceError::invalid_params(format!("argument '{}': {}", name, e)))
}

fn to_result_value<R: Serialize>(result: R) -> Result<Value, ServiceError> {
    serde_json::to_value(result)
        .map_err(|e| ServiceError::internal(format!("failed to serialize result: {}", e)))
}

/// Describes a method before its implementation is attached.
///
/// Attaching an implementation with [`Method::handler`] or
/// [`Method::sync_handler`] yields a [`ServiceMethod`] for one service type.
///
/// ```
/// use turul_json_rpc_server::service::{Method, Interface};
///
/// struct Greeter;
///
/// let interface: Interface<Greeter> = Interface::new("Greeter").method(
///     Method::new("greet")
///         .param::<String>("name")
///         .returns::<String>()
///         .sync_handler(|_greeter: &Greeter, args| {
///             Ok(format!("hello {}", args.get::<String>(0)?))
///         }),
/// );
/// assert_eq!(interface.descriptor().methods.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Method {
    descriptor: MethodDescriptor,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: MethodDescriptor::new(name),
        }
    }

    /// Add a parameter typed after a Rust type
    pub fn param<T: RpcType>(self, name: impl Into<String>) -> Self {
        self.param_with(name, T::param_type())
    }

    /// Add a parameter that must deserialize into `T`.
    ///
    /// The shape is checked while overloads are compared, so a value that
    /// does not fit moves resolution on to the next candidate.
    pub fn param_struct<T: DeserializeOwned + 'static>(self, name: impl Into<String>) -> Self {
        self.param_with(name, ParamType::structure::<T>())
    }

    /// Add a parameter with an explicit type
    pub fn param_with(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.descriptor.params.push(ParamDescriptor::new(name, ty));
        self
    }

    /// Add a parameter that may be omitted
    pub fn param_or<T: RpcType>(mut self, name: impl Into<String>, default: Value) -> Self {
        self.descriptor
            .params
            .push(ParamDescriptor::new(name, T::param_type()).with_default(default));
        self
    }

    pub fn returns<T: RpcType>(self) -> Self {
        self.returns_with(T::param_type())
    }

    pub fn returns_with(mut self, ty: ParamType) -> Self {
        self.descriptor.returns = Some(ty);
        self
    }

    /// Attach an async implementation
    pub fn handler<S, F, Fut, R>(self, f: F) -> ServiceMethod<S>
    where
        S: Send + Sync + 'static,
        F: Fn(Arc<S>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let invoker: Invoker<S> = Arc::new(move |service: Arc<S>, args: Arguments| -> MethodFuture {
            let f = Arc::clone(&f);
            Box::pin(async move { to_result_value(f(service, args).await?) })
        });
        ServiceMethod {
            descriptor: self.descriptor,
            invoker,
        }
    }

    /// Attach a synchronous implementation. It runs when the dispatcher polls
    /// the call, not when the call is resolved.
    pub fn sync_handler<S, F, R>(self, f: F) -> ServiceMethod<S>
    where
        S: Send + Sync + 'static,
        F: Fn(&S, Arguments) -> Result<R, ServiceError> + Send + Sync + 'static,
        R: Serialize,
    {
        let f = Arc::new(f);
        let invoker: Invoker<S> = Arc::new(move |service: Arc<S>, args: Arguments| -> MethodFuture {
            let f = Arc::clone(&f);
            Box::pin(async move { to_result_value(f(service.as_ref(), args)?) })
        });
        ServiceMethod {
            descriptor: self.descriptor,
            invoker,
        }
    }
}

/// A method of service type `S`: descriptor plus implementation
pub struct ServiceMethod<S> {
    descriptor: MethodDescriptor,
    invoker: Invoker<S>,
}

impl<S> ServiceMethod<S> {
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }
}

impl<S> Clone for ServiceMethod<S> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            invoker: Arc::clone(&self.invoker),
        }
    }
}

/// An ordered method table implemented by `S`
pub struct Interface<S> {
    name: String,
    methods: Vec<ServiceMethod<S>>,
}

impl<S> Interface<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Append a method; declaration order is the final overload tiebreak
    pub fn method(mut self, method: ServiceMethod<S>) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> InterfaceDescriptor {
        InterfaceDescriptor {
            name: self.name.clone(),
            methods: self.methods.iter().map(|m| m.descriptor.clone()).collect(),
        }
    }
}

impl<S> Clone for Interface<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> Interface<S> {
    /// Tie every method to one handler instance
    pub(crate) fn bind(self, handler: &Arc<S>) -> BoundInterface {
        let methods = self
            .methods
            .into_iter()
            .map(|method| {
                let handler = Arc::clone(handler);
                let invoker = method.invoker;
                BoundMethod {
                    descriptor: method.descriptor,
                    invoke: Arc::new(move |args: Arguments| invoker(Arc::clone(&handler), args)),
                }
            })
            .collect();
        BoundInterface {
            name: self.name,
            methods,
        }
    }
}

/// A type that can be registered as a JSON-RPC service.
///
/// `interfaces` lists every method table the type exposes, in priority order.
/// A plain service returns one table describing its own methods; a proxy-style
/// service that forwards several contracts returns one table per contract and
/// the first one wins name collisions.
pub trait RpcService: Send + Sync + 'static {
    fn interfaces(&self) -> Vec<Interface<Self>>
    where
        Self: Sized;
}

/// A method bound to a handler instance
#[derive(Clone)]
pub(crate) struct BoundMethod {
    pub(crate) descriptor: MethodDescriptor,
    invoke: BoundInvoker,
}

impl BoundMethod {
    pub(crate) fn invoke(&self, args: Arguments) -> MethodFuture {
        (self.invoke)(args)
    }
}

impl AsRef<MethodDescriptor> for BoundMethod {
    fn as_ref(&self) -> &MethodDescriptor {
        &self.descriptor
    }
}

pub(crate) struct BoundInterface {
    pub(crate) name: String,
    pub(crate) methods: Vec<BoundMethod>,
}

impl BoundInterface {
    pub(crate) fn descriptor(&self) -> InterfaceDescriptor {
        InterfaceDescriptor {
            name: self.name.clone(),
            methods: self.methods.iter().map(|m| m.descriptor.clone()).collect(),
        }
    }
}
