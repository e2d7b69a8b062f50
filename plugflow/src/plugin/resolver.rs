//! Plugin lookup by id, safe under concurrent calls.

use super::{ComposablePlugin, PluginKind};
use dashmap::DashMap;
use std::sync::Arc;

/// Lookup service mapping a plugin identifier to a [`ComposablePlugin`].
///
/// Implementations must be safe under concurrent `resolve` calls from
/// multiple in-flight pipeline executions.
pub trait PluginResolver: Send + Sync {
    /// Resolves a plugin by id. `None` means unknown or non-composable.
    fn resolve(&self, plugin_id: &str) -> Option<Arc<dyn ComposablePlugin>>;

    /// Returns all resolvable plugins, for discovery.
    fn available_plugins(&self) -> Vec<Arc<dyn ComposablePlugin>>;
}

/// The default resolver: a concurrent cache of registered plugin adapters
/// keyed by plugin id.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: DashMap<String, Arc<dyn ComposablePlugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, replacing any previous registration under the
    /// same id. Returns the replaced plugin, if any.
    pub fn register(&self, plugin: Arc<dyn ComposablePlugin>) -> Option<Arc<dyn ComposablePlugin>> {
        let id = plugin.plugin_id().to_string();
        tracing::debug!(plugin_id = %id, kind = %plugin.kind(), "Registered plugin");
        self.plugins.insert(id, plugin)
    }

    /// Removes a plugin by id, returning it if it was registered.
    pub fn unregister(&self, plugin_id: &str) -> Option<Arc<dyn ComposablePlugin>> {
        self.plugins.remove(plugin_id).map(|(_, plugin)| plugin)
    }

    /// Returns all plugins providing the given capability.
    #[must_use]
    pub fn find_by_kind(&self, kind: PluginKind) -> Vec<Arc<dyn ComposablePlugin>> {
        self.plugins
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Returns the id of some plugin providing the given capability.
    #[must_use]
    pub fn first_id_of_kind(&self, kind: PluginKind) -> Option<String> {
        self.plugins
            .iter()
            .find(|entry| entry.value().kind() == kind)
            .map(|entry| entry.key().clone())
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginResolver for PluginRegistry {
    fn resolve(&self, plugin_id: &str) -> Option<Arc<dyn ComposablePlugin>> {
        self.plugins
            .get(plugin_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn available_plugins(&self) -> Vec<Arc<dyn ComposablePlugin>> {
        self.plugins
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
