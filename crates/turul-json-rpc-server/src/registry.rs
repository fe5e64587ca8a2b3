//! Named service registry.
//!
//! Populated at composition time and read on every dispatch. Readers clone
//! the `Arc`'d entry and release the lock before any method runs, so a slow
//! handler never blocks registration or other lookups.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::descriptor::InterfaceDescriptor;
use crate::error::DispatchError;
use crate::service::{BoundInterface, Interface, RpcService};

/// A registered handler together with its bound method tables
pub(crate) struct ServiceEntry {
    handler: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    pub(crate) interfaces: Vec<BoundInterface>,
}

impl ServiceEntry {
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Maps service names to handlers
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<ServiceEntry>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, exposing every interface it declares.
    ///
    /// An existing registration with the same name is replaced.
    pub fn register<S: RpcService>(&self, name: impl Into<String>, handler: Arc<S>) -> &Self {
        let interfaces = handler.interfaces();
        self.insert(name.into(), handler, interfaces)
    }

    /// Register `handler` under `name`, exposing only `interface`.
    pub fn register_with_interface<S: RpcService>(
        &self,
        name: impl Into<String>,
        handler: Arc<S>,
        interface: Interface<S>,
    ) -> &Self {
        self.insert(name.into(), handler, vec![interface])
    }

    fn insert<S: RpcService>(
        &self,
        name: String,
        handler: Arc<S>,
        interfaces: Vec<Interface<S>>,
    ) -> &Self {
        let interfaces: Vec<BoundInterface> =
            interfaces.into_iter().map(|i| i.bind(&handler)).collect();
        if interfaces.iter().all(|i| i.methods.is_empty()) {
            warn!("Service '{}' exposes no invocable methods", name);
        }
        let entry = Arc::new(ServiceEntry {
            handler,
            type_name: std::any::type_name::<S>(),
            interfaces,
        });

        debug!("Registering service '{}' ({})", name, entry.type_name);
        if self.services.write().insert(name.clone(), entry).is_some() {
            debug!("Service '{}' replaced an earlier registration", name);
        }
        self
    }

    /// Remove a service; returns whether it was registered
    pub fn unregister(&self, name: &str) -> bool {
        self.services.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    /// The handler registered under `name`
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, DispatchError> {
        Ok(Arc::clone(&self.entry(name)?.handler))
    }

    /// The handler registered under `name`, as its concrete type
    pub fn lookup_as<S: Any + Send + Sync>(&self, name: &str) -> Result<Arc<S>, DispatchError> {
        let entry = self.entry(name)?;
        Arc::clone(&entry.handler).downcast::<S>().map_err(|_| {
            DispatchError::Internal(format!(
                "service '{}' is a {}, not a {}",
                name,
                entry.type_name,
                std::any::type_name::<S>()
            ))
        })
    }

    /// Method tables visible for dispatch on `name`, in priority order
    pub fn interfaces_for(&self, name: &str) -> Result<Vec<InterfaceDescriptor>, DispatchError> {
        Ok(self
            .entry(name)?
            .interfaces
            .iter()
            .map(BoundInterface::descriptor)
            .collect())
    }

    /// Registered service names, sorted
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    pub(crate) fn entry(&self, name: &str) -> Result<Arc<ServiceEntry>, DispatchError> {
        self.services
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::ServiceNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::service::Method;

    struct Echo;

    impl Echo {
        fn text() -> Interface<Echo> {
            Interface::new("TextEcho").method(
                Method::new("echo")
                    .param::<String>("text")
                    .returns::<String>()
                    .sync_handler(|_: &Echo, args| args.get::<String>(0)),
            )
        }

        fn numbers() -> Interface<Echo> {
            Interface::new("NumberEcho").method(
                Method::new("echo")
                    .param::<i64>("n")
                    .returns::<i64>()
                    .sync_handler(|_: &Echo, args| args.get::<i64>(0)),
            )
        }
    }

    impl RpcService for Echo {
        fn interfaces(&self) -> Vec<Interface<Self>> {
            vec![Echo::text(), Echo::numbers()]
        }
    }

    struct Silent;

    impl RpcService for Silent {
        fn interfaces(&self) -> Vec<Interface<Self>> {
            vec![Interface::new("Silent").method(
                Method::new("noop").sync_handler(|_: &Silent, _| Ok::<_, ServiceError>(())),
            )]
        }
    }

    #[test]
    fn test_lookup_preserves_identity() {
        let registry = ServiceRegistry::new();
        let echo = Arc::new(Echo);
        registry.register("Echo", Arc::clone(&echo));

        let found = registry.lookup_as::<Echo>("Echo").unwrap();
        assert!(Arc::ptr_eq(&found, &echo));
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = ServiceRegistry::new();
        let first = Arc::new(Echo);
        let second = Arc::new(Echo);
        registry
            .register("Echo", Arc::clone(&first))
            .register("Echo", Arc::clone(&second));

        let found = registry.lookup_as::<Echo>("Echo").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_service() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            registry.lookup("Nope"),
            Err(DispatchError::ServiceNotFound(name)) if name == "Nope"
        ));
        assert!(!registry.unregister("Nope"));
    }

    #[test]
    fn test_wrong_type_lookup() {
        let registry = ServiceRegistry::new();
        registry.register("Echo", Arc::new(Echo));
        assert!(matches!(
            registry.lookup_as::<Silent>("Echo"),
            Err(DispatchError::Internal(_))
        ));
    }

    #[test]
    fn test_interfaces_default_to_declared_order() {
        let registry = ServiceRegistry::new();
        registry.register("Echo", Arc::new(Echo));

        let names: Vec<String> = registry
            .interfaces_for("Echo")
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["TextEcho", "NumberEcho"]);
    }

    #[test]
    fn test_explicit_interface_restricts_methods() {
        let registry = ServiceRegistry::new();
        registry.register_with_interface("Numbers", Arc::new(Echo), Echo::numbers());

        let interfaces = registry.interfaces_for("Numbers").unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "NumberEcho");
    }

    #[test]
    fn test_service_names_sorted() {
        let registry = ServiceRegistry::new();
        registry
            .register("b", Arc::new(Silent))
            .register("a", Arc::new(Echo));
        assert_eq!(registry.service_names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.unregister("a"));
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_concurrent_reads_during_registration() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register("Echo", Arc::new(Echo));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(registry.lookup("Echo").is_ok());
                    }
                })
            })
            .collect();
        for i in 0..100 {
            registry.register(format!("Extra{}", i), Arc::new(Silent));
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.len(), 101);
    }
}
