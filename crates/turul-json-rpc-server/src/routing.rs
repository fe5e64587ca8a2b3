//! Mapping a wire method name to a service and a method.

/// Split `raw` at the first `separator`.
///
/// Only a separator after the first character counts: when it is missing or
/// sits at index 0, both halves are the whole input.
///
/// ```
/// use turul_json_rpc_server::routing::split_method_name;
///
/// assert_eq!(split_method_name("Foo.bar", '.'), ("Foo", "bar"));
/// assert_eq!(split_method_name(".bar", '.'), (".bar", ".bar"));
/// assert_eq!(split_method_name("bar", '.'), ("bar", "bar"));
/// ```
pub fn split_method_name(raw: &str, separator: char) -> (&str, &str) {
    match raw.find(separator) {
        Some(index) if index > 0 => (&raw[..index], &raw[index + separator.len_utf8()..]),
        _ => (raw, raw),
    }
}

/// Where a call goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub service: String,
    pub method: String,
}

/// Strategy that picks the target service and method for a wire method name
pub trait MethodRouter: Send + Sync {
    fn route(&self, method: &str) -> Route;

    /// Wire names that route to `target`, preferred spelling first.
    ///
    /// The provided version only offers the bare method name, and only when
    /// it routes back to `target`.
    fn wire_names(&self, target: &Route) -> Vec<String> {
        if self.route(&target.method) == *target {
            vec![target.method.clone()]
        } else {
            Vec::new()
        }
    }
}

/// Routes `Service<sep>method` names, falling back to a default service for
/// unqualified names when one is configured.
#[derive(Debug, Clone)]
pub struct SeparatorRouter {
    separator: char,
    default_service: Option<String>,
}

impl SeparatorRouter {
    pub fn new(separator: char, default_service: Option<String>) -> Self {
        Self {
            separator,
            default_service,
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn default_service(&self) -> Option<&str> {
        self.default_service.as_deref()
    }
}

impl Default for SeparatorRouter {
    fn default() -> Self {
        Self::new('.', None)
    }
}

impl MethodRouter for SeparatorRouter {
    fn route(&self, method: &str) -> Route {
        let (service, name) = split_method_name(method, self.separator);
        // An unsplit name comes back unchanged in both halves.
        let service = if service.len() == method.len() {
            self.default_service.as_deref().unwrap_or(service)
        } else {
            service
        };
        Route {
            service: service.to_string(),
            method: name.to_string(),
        }
    }

    fn wire_names(&self, target: &Route) -> Vec<String> {
        let qualified = format!("{}{}{}", target.service, self.separator, target.method);
        [qualified, target.method.clone()]
            .into_iter()
            .filter(|name| self.route(name) == *target)
            .collect()
    }
}
