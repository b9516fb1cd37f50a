use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    algorithms::BUILTIN_PROVIDERS, capability::Algorithm, error::EngineError,
    function_name::FunctionName, params::AlgorithmParams,
};

/// Builds a fresh algorithm instance from optional parameters.
pub type AlgorithmFactory = Arc<
    dyn Fn(Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>> + Send + Sync,
>;

/// Constructor signature used by provider tables.
pub type ConstructFn = fn(Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>>;

/// One row of a provider table.
#[derive(Clone, Copy)]
pub struct ProviderEntry {
    /// Function the provider declares.
    pub function_name: FunctionName,
    /// Constructor; `None` parameters select the provider defaults.
    pub construct: ConstructFn,
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("function_name", &self.function_name)
            .finish_non_exhaustive()
    }
}

/// Lookup table from [`FunctionName`] to factory.
///
/// Populated once at start-up. Later writes take the writer lock; readers clone the
/// factory out so no lock is held while an algorithm runs.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    providers: Arc<RwLock<IndexMap<FunctionName, AlgorithmFactory>>>,
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

impl AlgorithmRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in provider.
    #[must_use]
    pub fn builtin() -> Self {
        let registry = Self::new();
        for entry in BUILTIN_PROVIDERS {
            registry.register(entry.function_name, entry.construct);
        }
        registry
    }

    /// Populates a registry from a provider table.
    ///
    /// Fails only when the table is empty.
    pub fn from_providers(entries: &[ProviderEntry]) -> Result<Self, EngineError> {
        if entries.is_empty() {
            return Err(EngineError::NoProviders);
        }
        let registry = Self::new();
        for entry in entries {
            registry.register(entry.function_name, entry.construct);
        }
        Ok(registry)
    }

    /// Associates `factory` with `function_name`; the last write wins.
    ///
    /// Returns `true` when an earlier factory was replaced.
    pub fn register<F>(&self, function_name: FunctionName, factory: F) -> bool
    where
        F: Fn(Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>>
            + Send
            + Sync
            + 'static,
    {
        self.register_factory(function_name, Arc::new(factory))
    }

    /// Same as [`AlgorithmRegistry::register`] for an already shared factory.
    pub fn register_factory(&self, function_name: FunctionName, factory: AlgorithmFactory) -> bool {
        let replaced = self
            .providers
            .write()
            .insert(function_name, factory)
            .is_some();
        tracing::debug!(%function_name, replaced, "algorithm provider registered");
        replaced
    }

    /// Factory registered for `function_name`.
    pub fn resolve(&self, function_name: FunctionName) -> Result<AlgorithmFactory, EngineError> {
        self.providers
            .read()
            .get(&function_name)
            .cloned()
            .ok_or_else(|| EngineError::unsupported(function_name, "no provider registered"))
    }

    /// Constructs a fresh instance, wrapping factory failures with their cause chain.
    pub fn instantiate(
        &self,
        function_name: FunctionName,
        params: Option<&AlgorithmParams>,
    ) -> Result<Box<dyn Algorithm>, EngineError> {
        let factory = self.resolve(function_name)?;
        factory(params).map_err(|err| EngineError::Construction {
            function_name,
            cause: format!("{err:#}"),
        })
    }

    /// Registered functions in registration order.
    #[must_use]
    pub fn function_names(&self) -> Vec<FunctionName> {
        self.providers.read().keys().copied().collect()
    }

    /// Copy of every registration, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(FunctionName, AlgorithmFactory)> {
        self.providers
            .read()
            .iter()
            .map(|(name, factory)| (*name, Arc::clone(factory)))
            .collect()
    }

    /// Whether `function_name` has a provider.
    #[must_use]
    pub fn contains(&self, function_name: FunctionName) -> bool {
        self.providers.read().contains_key(&function_name)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
