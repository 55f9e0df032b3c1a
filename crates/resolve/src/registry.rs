use crate::provider::DependencyProvider;
use repolens_primitives::FetchScope;
use std::{collections::HashMap, fmt, sync::Arc};

/// Capability summary of a registered provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Dependency key served.
    pub key: &'static str,
    /// Scope of the key.
    pub scope: FetchScope,
}

/// Mapping from dependency key to provider.
///
/// The registry is populated once at composition time and then shared
/// immutably behind an `Arc`, which makes every lookup lock-free. The
/// resolver takes a registry handle; nothing consults a process global.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn DependencyProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry").field("keys", &self.providers.len()).finish()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its key.
    ///
    /// # Panics
    ///
    /// Panics on an empty or duplicate key; both are programming errors that
    /// must abort startup.
    pub fn register(&mut self, provider: Arc<dyn DependencyProvider>) {
        let key = provider.key();
        assert!(!key.is_empty(), "provider key must not be empty");
        let previous = self.providers.insert(key, provider);
        assert!(previous.is_none(), "duplicate provider registration for key `{key}`");
    }

    /// The provider registered for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn DependencyProvider>> {
        self.providers.get(key)
    }

    /// Descriptors of every registered provider, sorted by key ascending.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self
            .providers
            .values()
            .map(|provider| ProviderDescriptor { key: provider.key(), scope: provider.scope() })
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.key);
        descriptors
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
