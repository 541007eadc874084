//! Dispatch-time registries: chains, interceptor factories, invoker thunks.
//!
//! All three registries are populated once — the chain and invoker
//! registries by generated code, the interceptor registry by application
//! setup — and are read-only afterwards. Lookups never synchronize.

use std::collections::HashMap;
use std::sync::Arc;

use crate::contracts::{BoxFuture, Interceptor};
use crate::descriptor::{BindingArg, ChainDescriptor, ChainKey, InterceptorBinding};
use crate::error::{AspectError, AspectResult};
use crate::value::{CallArgs, CallTarget, CallValue};

/// Generated thunk performing the typed call against a unit's inner method.
pub type InvokeFn = fn(CallTarget, CallArgs) -> BoxFuture<'static, AspectResult<CallValue>>;

/// Generated thunk constructing a unit's default instance.
pub type ConstructFn = fn() -> AspectResult<CallValue>;

/// Factory producing a live interceptor from the binding's recorded
/// construction arguments.
pub type InterceptorFactory =
    Box<dyn Fn(&[BindingArg]) -> AspectResult<Arc<dyn Interceptor>> + Send + Sync>;

/// The process-wide table of chain descriptors, keyed by chain key.
#[derive(Debug, Default)]
pub struct ChainRegistry {
    chains: HashMap<ChainKey, ChainDescriptor>,
}

impl ChainRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor under its own chain key.
    pub fn insert(&mut self, descriptor: ChainDescriptor) {
        self.chains.insert(descriptor.chain_key(), descriptor);
    }

    /// Looks up the descriptor for a chain key.
    #[must_use]
    pub fn get(&self, key: &ChainKey) -> Option<&ChainDescriptor> {
        self.chains.get(key)
    }

    /// `true` when a descriptor is registered under the key.
    #[must_use]
    pub fn contains(&self, key: &ChainKey) -> bool {
        self.chains.contains_key(key)
    }

    /// Number of registered chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// `true` when no chains are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Iterates all registered chain keys.
    pub fn keys(&self) -> impl Iterator<Item = &ChainKey> {
        self.chains.keys()
    }
}

/// Maps interceptor type identifiers to their factories.
#[derive(Default)]
pub struct InterceptorRegistry {
    factories: HashMap<String, InterceptorFactory>,
}

impl InterceptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under an interceptor type identifier.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[BindingArg]) -> AspectResult<Arc<dyn Interceptor>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiates the interceptor a binding names, passing the binding's
    /// recorded construction arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError::UnknownInterceptor`] when no factory is
    /// registered, or whatever the factory itself raises.
    pub fn instantiate(&self, binding: &InterceptorBinding) -> AspectResult<Arc<dyn Interceptor>> {
        let factory = self
            .factories
            .get(&binding.interceptor)
            .ok_or_else(|| AspectError::unknown_interceptor(&binding.interceptor))?;
        factory(&binding.args)
    }

    /// `true` when a factory is registered under the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// `true` when no factories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Maps chain keys to generated invoker thunks, and units to their generated
/// default constructors.
#[derive(Debug, Default)]
pub struct InvokerRegistry {
    invokers: HashMap<ChainKey, InvokeFn>,
    constructors: HashMap<String, ConstructFn>,
}

impl InvokerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the invoker thunk for a chain key.
    pub fn register_invoker(&mut self, key: impl Into<ChainKey>, invoke: InvokeFn) {
        self.invokers.insert(key.into(), invoke);
    }

    /// Registers the default-constructor thunk for a unit.
    pub fn register_constructor(&mut self, unit: impl Into<String>, construct: ConstructFn) {
        self.constructors.insert(unit.into(), construct);
    }

    /// Looks up the invoker thunk for a chain key.
    #[must_use]
    pub fn invoker(&self, key: &ChainKey) -> Option<InvokeFn> {
        self.invokers.get(key).copied()
    }

    /// Looks up the default-constructor thunk for a unit.
    #[must_use]
    pub fn constructor(&self, unit: &str) -> Option<ConstructFn> {
        self.constructors.get(unit).copied()
    }

    /// Number of registered invoker thunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    /// `true` when no invoker thunks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }
}
