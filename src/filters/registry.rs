//! Filter registry for resolving `(library, name)` pairs to filter instances.

use crate::core::error::{FilterError, FilterResult};
use crate::core::node::{Category, Filter, FilterMetadata};
use crate::core::types::{Library, Parameters};
use indexmap::IndexMap;
use std::sync::Arc;

/// Factory function for creating filter instances bound to a parameter bag.
pub type FilterFactory = Arc<dyn Fn(Parameters) -> Box<dyn Filter> + Send + Sync>;

/// A registry shared between every open document.
pub type SharedRegistry = Arc<FilterRegistry>;

/// Registry entry containing metadata and factory.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Factory function to create instances.
    pub factory: FilterFactory,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: FilterMetadata,
    /// Whether this filter is enabled.
    pub enabled: bool,
}

/// Registry for all available filter kinds.
///
/// Lookup is two-level: the provider library first, then the filter name
/// within it. Providers may reuse each other's names freely.
pub struct FilterRegistry {
    libraries: IndexMap<Library, IndexMap<String, RegistryEntry>>,
}

impl FilterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            libraries: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        crate::filters::builtin::register_all(&mut registry);

        registry
    }

    /// Wrap into a shareable handle.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(self)
    }

    /// Make a library known without registering any filter in it.
    pub fn declare_library(&mut self, library: Library) {
        self.libraries.entry(library).or_default();
    }

    /// Register a filter kind.
    ///
    /// The factory is called once with an empty parameter bag to read the
    /// metadata; library and name come from there. Registering the same
    /// pair twice replaces the earlier entry.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn(Parameters) -> Box<dyn Filter> + Send + Sync + 'static,
    {
        let metadata = factory(Parameters::new()).metadata();
        let library = metadata.library;
        let name = metadata.name.to_lowercase();

        let entry = RegistryEntry {
            factory: Arc::new(factory),
            metadata,
            enabled: true,
        };

        if self.libraries.entry(library).or_default().insert(name.clone(), entry).is_some() {
            log::warn!("filter {}/{} registered twice, keeping the latest", library, name);
        }
    }

    /// Create a filter instance bound to `parameters`.
    pub fn create(&self, library: Library, name: &str, parameters: Parameters) -> FilterResult<Box<dyn Filter>> {
        self.libraries
            .get(&library)
            .and_then(|filters| filters.get(name))
            .filter(|entry| entry.enabled)
            .map(|entry| (entry.factory)(parameters))
            .ok_or_else(|| FilterError::UnknownFilter {
                library: library.as_str().to_string(),
                name: name.to_string(),
            })
    }

    /// Get a registry entry.
    pub fn get_entry(&self, library: Library, name: &str) -> Option<&RegistryEntry> {
        self.libraries.get(&library).and_then(|filters| filters.get(name))
    }

    /// Get metadata for a filter without creating an instance.
    pub fn get_metadata(&self, library: Library, name: &str) -> Option<&FilterMetadata> {
        self.get_entry(library, name).map(|e| &e.metadata)
    }

    /// Check if a filter is registered.
    pub fn contains(&self, library: Library, name: &str) -> bool {
        self.get_entry(library, name).is_some()
    }

    /// Libraries known to the registry, in registration order.
    pub fn libraries(&self) -> impl Iterator<Item = Library> + '_ {
        self.libraries.keys().copied()
    }

    /// Filter names registered in one library.
    pub fn filters_in(&self, library: Library) -> Vec<&str> {
        self.libraries
            .get(&library)
            .map(|filters| filters.keys().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Iterate every entry.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.libraries.values().flat_map(|filters| filters.values())
    }

    /// Search filters by name or description.
    pub fn search(&self, query: &str) -> Vec<&FilterMetadata> {
        let query = query.to_lowercase();

        self.entries()
            .filter(|entry| {
                let metadata = &entry.metadata;
                metadata.name.to_lowercase().contains(&query)
                    || metadata.display_name.to_lowercase().contains(&query)
                    || metadata.description.to_lowercase().contains(&query)
            })
            .map(|entry| &entry.metadata)
            .collect()
    }

    /// Enable or disable a filter.
    pub fn set_enabled(&mut self, library: Library, name: &str, enabled: bool) -> bool {
        match self.libraries.get_mut(&library).and_then(|filters| filters.get_mut(name)) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Unregister a filter.
    pub fn unregister(&mut self, library: Library, name: &str) -> bool {
        self.libraries
            .get_mut(&library)
            .map(|filters| filters.shift_remove(name).is_some())
            .unwrap_or(false)
    }

    /// Get the total number of registered filters.
    pub fn len(&self) -> usize {
        self.libraries.values().map(|filters| filters.len()).sum()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get enabled filters of one library grouped by category for menus.
    pub fn grouped_by_category(&self, library: Library) -> IndexMap<Category, Vec<&FilterMetadata>> {
        let mut grouped: IndexMap<Category, Vec<&FilterMetadata>> = IndexMap::new();

        if let Some(filters) = self.libraries.get(&library) {
            for entry in filters.values().filter(|e| e.enabled) {
                grouped
                    .entry(entry.metadata.category)
                    .or_default()
                    .push(&entry.metadata);
            }
        }

        for filters in grouped.values_mut() {
            filters.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        }

        grouped
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    registry: FilterRegistry,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: FilterRegistry::new(),
            include_builtins: true,
        }
    }

    /// Include or exclude built-in filters.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Register a custom filter.
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: Fn(Parameters) -> Box<dyn Filter> + Send + Sync + 'static,
    {
        self.registry.register(factory);
        self
    }

    /// Build the registry. Custom filters win over builtins of the same name.
    pub fn build(self) -> FilterRegistry {
        if !self.include_builtins {
            return self.registry;
        }

        let mut registry = FilterRegistry::with_builtins();
        for (library, filters) in self.registry.libraries {
            let target = registry.libraries.entry(library).or_default();
            for (name, entry) in filters {
                target.insert(name, entry);
            }
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
