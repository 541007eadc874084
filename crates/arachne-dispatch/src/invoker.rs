//! The method invoker: the innermost, unconditional call.

use arachne_core::{
    AspectError, AspectResult, BoxFuture, CallArgs, CallTarget, CallValue, ChainDescriptor,
    ChainKey, ConstructFn, InvokeFn,
};

use crate::runtime::AspectRuntime;

/// Trampoline performing the actual call against a woven method's inner
/// implementation.
///
/// Resolution happens once per dispatch, before any interceptor runs; the
/// resolved invoker captures only copyable thunks, so the terminal pipeline
/// link can own it without borrowing the runtime. The invoker applies no
/// interception logic of its own.
#[derive(Debug, Clone)]
pub struct MethodInvoker {
    chain_key: ChainKey,
    unit: String,
    is_static: bool,
    arity: usize,
    invoke: InvokeFn,
    construct: Option<ConstructFn>,
}

impl MethodInvoker {
    /// Resolves the generated thunks for a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError::UnknownInvoker`] when no thunk was generated
    /// for the descriptor's chain key.
    pub fn resolve(runtime: &AspectRuntime, descriptor: &ChainDescriptor) -> AspectResult<Self> {
        let chain_key = descriptor.chain_key();
        let invoke = runtime
            .invokers()
            .invoker(&chain_key)
            .ok_or_else(|| AspectError::unknown_invoker(chain_key.as_str()))?;
        Ok(Self {
            chain_key,
            unit: descriptor.unit.clone(),
            is_static: descriptor.is_static,
            arity: descriptor.arity,
            invoke,
            construct: runtime.invokers().constructor(&descriptor.unit),
        })
    }

    /// The chain key this invoker calls.
    #[must_use]
    pub const fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Performs the call.
    ///
    /// For static methods the target passes through as the unit reference.
    /// For instance methods dispatched with a unit reference instead of an
    /// instance, a default instance is constructed first via the unit's
    /// generated constructor thunk.
    ///
    /// # Errors
    ///
    /// - [`AspectError::ArityMismatch`] when the argument count differs from
    ///   the woven method's declared arity.
    /// - [`AspectError::TargetResolution`] when a default instance is needed
    ///   but the unit has no registered constructor.
    /// - Whatever the inner method itself raises.
    pub fn call(
        &self,
        target: CallTarget,
        args: CallArgs,
    ) -> BoxFuture<'static, AspectResult<CallValue>> {
        let chain_key = self.chain_key.clone();
        let unit = self.unit.clone();
        let is_static = self.is_static;
        let arity = self.arity;
        let invoke = self.invoke;
        let construct = self.construct;
        Box::pin(async move {
            if args.len() != arity {
                return Err(AspectError::arity_mismatch(
                    chain_key.as_str(),
                    arity,
                    args.len(),
                ));
            }
            let target = match target {
                CallTarget::Unit(_) if !is_static => {
                    let construct =
                        construct.ok_or_else(|| AspectError::target_resolution(&unit))?;
                    CallTarget::Instance(construct()?)
                }
                other => other,
            };
            invoke(target, args).await
        })
    }
}
