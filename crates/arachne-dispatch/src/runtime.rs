//! The installed aspect runtime: one process-wide set of registries.

use std::sync::OnceLock;

use arachne_core::{
    AspectError, AspectResult, ChainDescriptor, ChainKey, ChainRegistry, InterceptorRegistry,
    InvokerRegistry,
};

/// Global runtime instance, installed once at process start.
static RUNTIME: OnceLock<AspectRuntime> = OnceLock::new();

/// The registries one dispatch pass runs against.
///
/// Generated code builds the chain and invoker registries; the application
/// supplies the interceptor factories. Once assembled, a runtime is
/// immutable. Install it globally with [`install`] for woven stubs, or hand
/// it directly to [`dispatch`](crate::dispatch) in tests.
#[derive(Debug)]
pub struct AspectRuntime {
    chains: ChainRegistry,
    interceptors: InterceptorRegistry,
    invokers: InvokerRegistry,
}

impl AspectRuntime {
    /// Assembles a runtime from its three registries.
    #[must_use]
    pub const fn new(
        chains: ChainRegistry,
        interceptors: InterceptorRegistry,
        invokers: InvokerRegistry,
    ) -> Self {
        Self {
            chains,
            interceptors,
            invokers,
        }
    }

    /// The chain descriptor table.
    #[must_use]
    pub const fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// The interceptor factory table.
    #[must_use]
    pub const fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }

    /// The generated invoker table.
    #[must_use]
    pub const fn invokers(&self) -> &InvokerRegistry {
        &self.invokers
    }

    /// Looks up a chain descriptor, failing loudly on unknown keys.
    pub(crate) fn descriptor(&self, key: &ChainKey) -> AspectResult<&ChainDescriptor> {
        self.chains
            .get(key)
            .ok_or_else(|| AspectError::unknown_chain(key.as_str()))
    }
}

/// Installs the process-wide runtime.
///
/// # Errors
///
/// Returns [`AspectError::AlreadyInstalled`] on a second call; the first
/// installation wins.
pub fn install(runtime: AspectRuntime) -> AspectResult<()> {
    RUNTIME
        .set(runtime)
        .map_err(|_| AspectError::AlreadyInstalled)
}

/// The installed runtime.
///
/// # Errors
///
/// Returns [`AspectError::NotInstalled`] before [`install`] has run.
pub fn global() -> AspectResult<&'static AspectRuntime> {
    RUNTIME.get().ok_or(AspectError::NotInstalled)
}

/// The installed runtime, if any.
#[must_use]
pub fn try_global() -> Option<&'static AspectRuntime> {
    RUNTIME.get()
}
