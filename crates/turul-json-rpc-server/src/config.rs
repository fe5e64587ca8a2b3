//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`JsonRpcDispatcher`](crate::dispatcher::JsonRpcDispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DispatcherConfig {
    /// Separates the service name from the method name
    pub separator: char,
    /// Service used for method names without a separator
    pub default_service: Option<String>,
    /// Run the calls of a batch concurrently
    pub parallel_batches: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            separator: '.',
            default_service: None,
            parallel_batches: true,
        }
    }
}
