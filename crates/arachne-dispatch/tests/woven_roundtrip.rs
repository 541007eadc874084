//! End-to-end dispatch through a unit shaped like weaver output.
//!
//! The `billing` module below is a hand-expanded copy of what the weaver
//! emits for one woven unit: outer stubs keeping the original method
//! signatures, the renamed inner bodies, and the per-method invoker thunks.
//! The `chain_registry` module mirrors the generated registry file. All
//! tests run against the process-wide installed runtime, the way woven
//! application code does.

use std::sync::{Arc, Once};

use arachne_core::{
    arg, take, value, AspectResult, BindingArg, BoxFuture, CallValue, ContextStack, Interceptor,
    InterceptorRegistry, Next, PipelineStage, StageContext,
};

/// Hand-expanded mirror of the weaver's output for `billing.rs`.
mod billing {
    use arachne_core::{AspectError, AspectResult, CallArgs, CallTarget, CallValue};

    /// Application error carried through interception unchanged.
    ///
    /// Woven `Result` methods need a `From<AspectError>` conversion so the
    /// stub has somewhere to put infrastructure failures.
    #[derive(Debug, thiserror::Error)]
    pub enum BillingError {
        #[error("amount {0} exceeds the account limit")]
        OverLimit(u64),
        #[error(transparent)]
        Dispatch(#[from] AspectError),
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Invoices {
        surcharge: u64,
    }

    impl Invoices {
        pub fn new(surcharge: u64) -> Self {
            Self { surcharge }
        }

        pub async fn total(&self, amount: u64) -> Result<u64, BillingError> {
            let __result = arachne_dispatch::dispatch_global(
                &arachne_core::ChainKey::from("billing::Invoices::total"),
                CallTarget::Instance(arachne_core::value(self.clone())),
                arachne_core::call_args![amount],
            )
            .await;
            let _ = arachne_core::ContextStack::pop();
            match __result {
                Ok(value) => match arachne_core::take::<u64>(&value) {
                    Ok(typed) => Ok(typed),
                    Err(infra) => Err(BillingError::from(infra)),
                },
                Err(err) => match err.into_app::<BillingError>() {
                    Ok(app) => Err(app),
                    Err(infra) => Err(BillingError::from(infra)),
                },
            }
        }

        #[doc(hidden)]
        pub async fn total__inner(&self, amount: u64) -> Result<u64, BillingError> {
            Ok(self.surcharge + amount)
        }

        pub async fn clamp(&self, amount: u64) -> Result<u64, BillingError> {
            let __result = arachne_dispatch::dispatch_global(
                &arachne_core::ChainKey::from("billing::Invoices::clamp"),
                CallTarget::Instance(arachne_core::value(self.clone())),
                arachne_core::call_args![amount],
            )
            .await;
            let _ = arachne_core::ContextStack::pop();
            match __result {
                Ok(value) => match arachne_core::take::<u64>(&value) {
                    Ok(typed) => Ok(typed),
                    Err(infra) => Err(BillingError::from(infra)),
                },
                Err(err) => match err.into_app::<BillingError>() {
                    Ok(app) => Err(app),
                    Err(infra) => Err(BillingError::from(infra)),
                },
            }
        }

        #[doc(hidden)]
        pub async fn clamp__inner(&self, amount: u64) -> Result<u64, BillingError> {
            Ok(amount)
        }

        pub async fn reject_over_limit(&self, amount: u64) -> Result<u64, BillingError> {
            let __result = arachne_dispatch::dispatch_global(
                &arachne_core::ChainKey::from("billing::Invoices::reject_over_limit"),
                CallTarget::Instance(arachne_core::value(self.clone())),
                arachne_core::call_args![amount],
            )
            .await;
            let _ = arachne_core::ContextStack::pop();
            match __result {
                Ok(value) => match arachne_core::take::<u64>(&value) {
                    Ok(typed) => Ok(typed),
                    Err(infra) => Err(BillingError::from(infra)),
                },
                Err(err) => match err.into_app::<BillingError>() {
                    Ok(app) => Err(app),
                    Err(infra) => Err(BillingError::from(infra)),
                },
            }
        }

        #[doc(hidden)]
        pub async fn reject_over_limit__inner(
            &self,
            amount: u64,
        ) -> Result<u64, BillingError> {
            if amount > 500 {
                return Err(BillingError::OverLimit(amount));
            }
            Ok(amount)
        }

        pub async fn flat_rate() -> u64 {
            let __result = arachne_dispatch::dispatch_global(
                &arachne_core::ChainKey::from("billing::Invoices::flat_rate"),
                CallTarget::Unit("billing::Invoices"),
                arachne_core::CallArgs::new(),
            )
            .await;
            let _ = arachne_core::ContextStack::pop();
            match __result.and_then(|value| arachne_core::take::<u64>(&value)) {
                Ok(out) => out,
                Err(err) => {
                    panic!("intercepted call billing::Invoices::flat_rate failed: {err}")
                }
            }
        }

        #[doc(hidden)]
        pub async fn flat_rate__inner() -> u64 {
            99
        }

        pub async fn touch(&self) {
            let __result = arachne_dispatch::dispatch_global(
                &arachne_core::ChainKey::from("billing::Invoices::touch"),
                CallTarget::Instance(arachne_core::value(self.clone())),
                arachne_core::CallArgs::new(),
            )
            .await;
            let _ = arachne_core::ContextStack::pop();
            if let Err(err) = __result {
                panic!("intercepted call billing::Invoices::touch failed: {err}");
            }
        }

        #[doc(hidden)]
        pub async fn touch__inner(&self) {}
    }

    #[allow(non_snake_case)]
    pub fn __arachne_invoke_Invoices_total(
        target: CallTarget,
        args: CallArgs,
    ) -> arachne_core::BoxFuture<'static, AspectResult<CallValue>> {
        Box::pin(async move {
            let receiver = match target {
                CallTarget::Instance(instance) => arachne_core::take::<Invoices>(&instance)?,
                CallTarget::Unit(unit) => return Err(AspectError::target_resolution(unit)),
            };
            let amount = arachne_core::arg::<u64>(&args, 0)?;
            match receiver.total__inner(amount).await {
                Ok(out) => Ok(arachne_core::value(out)),
                Err(err) => Err(AspectError::app(err)),
            }
        })
    }

    #[allow(non_snake_case)]
    pub fn __arachne_invoke_Invoices_clamp(
        target: CallTarget,
        args: CallArgs,
    ) -> arachne_core::BoxFuture<'static, AspectResult<CallValue>> {
        Box::pin(async move {
            let receiver = match target {
                CallTarget::Instance(instance) => arachne_core::take::<Invoices>(&instance)?,
                CallTarget::Unit(unit) => return Err(AspectError::target_resolution(unit)),
            };
            let amount = arachne_core::arg::<u64>(&args, 0)?;
            match receiver.clamp__inner(amount).await {
                Ok(out) => Ok(arachne_core::value(out)),
                Err(err) => Err(AspectError::app(err)),
            }
        })
    }

    #[allow(non_snake_case)]
    pub fn __arachne_invoke_Invoices_reject_over_limit(
        target: CallTarget,
        args: CallArgs,
    ) -> arachne_core::BoxFuture<'static, AspectResult<CallValue>> {
        Box::pin(async move {
            let receiver = match target {
                CallTarget::Instance(instance) => arachne_core::take::<Invoices>(&instance)?,
                CallTarget::Unit(unit) => return Err(AspectError::target_resolution(unit)),
            };
            let amount = arachne_core::arg::<u64>(&args, 0)?;
            match receiver.reject_over_limit__inner(amount).await {
                Ok(out) => Ok(arachne_core::value(out)),
                Err(err) => Err(AspectError::app(err)),
            }
        })
    }

    #[allow(non_snake_case)]
    pub fn __arachne_invoke_Invoices_flat_rate(
        _target: CallTarget,
        _args: CallArgs,
    ) -> arachne_core::BoxFuture<'static, AspectResult<CallValue>> {
        Box::pin(async move {
            let out = Invoices::flat_rate__inner().await;
            Ok(arachne_core::value(out))
        })
    }

    #[allow(non_snake_case)]
    pub fn __arachne_invoke_Invoices_touch(
        target: CallTarget,
        _args: CallArgs,
    ) -> arachne_core::BoxFuture<'static, AspectResult<CallValue>> {
        Box::pin(async move {
            let receiver = match target {
                CallTarget::Instance(instance) => arachne_core::take::<Invoices>(&instance)?,
                CallTarget::Unit(unit) => return Err(AspectError::target_resolution(unit)),
            };
            receiver.touch__inner().await;
            Ok(arachne_core::unit_value())
        })
    }

    #[allow(non_snake_case)]
    pub fn __arachne_construct_Invoices() -> AspectResult<CallValue> {
        Ok(arachne_core::value(Invoices::default()))
    }
}

/// Hand-expanded mirror of the generated `chain_registry.rs`.
mod chain_registry {
    use arachne_core::{
        AspectResult, BindingArg, ChainDescriptor, ChainRegistry, InterceptorBinding,
        InterceptorRegistry, InvokerRegistry,
    };

    pub fn build_chain_registry() -> ChainRegistry {
        let mut chains = ChainRegistry::new();
        chains.insert(
            ChainDescriptor::new("billing::Invoices", "total")
                .with_arity(1)
                .with_binding(
                    InterceptorBinding::new("Fee", 10).with_args(vec![BindingArg::Int(5)]),
                ),
        );
        chains.insert(
            ChainDescriptor::new("billing::Invoices", "clamp")
                .with_arity(1)
                .with_binding(
                    InterceptorBinding::new("Limiter", 10).with_args(vec![BindingArg::Int(100)]),
                ),
        );
        chains.insert(ChainDescriptor::new("billing::Invoices", "reject_over_limit").with_arity(1));
        chains.insert(ChainDescriptor::new("billing::Invoices", "flat_rate").with_static(true));
        chains.insert(ChainDescriptor::new("billing::Invoices", "touch").with_returns_value(false));
        chains
    }

    pub fn build_invoker_registry() -> InvokerRegistry {
        let mut invokers = InvokerRegistry::new();
        invokers.register_invoker(
            "billing::Invoices::total",
            crate::billing::__arachne_invoke_Invoices_total,
        );
        invokers.register_invoker(
            "billing::Invoices::clamp",
            crate::billing::__arachne_invoke_Invoices_clamp,
        );
        invokers.register_invoker(
            "billing::Invoices::reject_over_limit",
            crate::billing::__arachne_invoke_Invoices_reject_over_limit,
        );
        invokers.register_invoker(
            "billing::Invoices::flat_rate",
            crate::billing::__arachne_invoke_Invoices_flat_rate,
        );
        invokers.register_invoker(
            "billing::Invoices::touch",
            crate::billing::__arachne_invoke_Invoices_touch,
        );
        invokers.register_constructor(
            "billing::Invoices",
            crate::billing::__arachne_construct_Invoices,
        );
        invokers
    }

    pub fn install_aspect_runtime(interceptors: InterceptorRegistry) -> AspectResult<()> {
        arachne_dispatch::install(arachne_dispatch::AspectRuntime::new(
            build_chain_registry(),
            interceptors,
            build_invoker_registry(),
        ))
    }
}

/// Adds a fixed fee to the first argument before the call proceeds.
struct Fee {
    amount: u64,
}

impl PipelineStage for Fee {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut StageContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, AspectResult<CallValue>> {
        Box::pin(async move {
            let amount = arg::<u64>(ctx.args(), 0)? + self.amount;
            ctx.args_mut()[0] = value(amount);
            next.run(ctx).await
        })
    }
}

impl Interceptor for Fee {
    fn name(&self) -> &'static str {
        "Fee"
    }

    fn as_stage(&self) -> Option<&dyn PipelineStage> {
        Some(self)
    }
}

/// Answers with the cap instead of continuing when the amount exceeds it.
struct Limiter {
    cap: u64,
}

impl PipelineStage for Limiter {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut StageContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, AspectResult<CallValue>> {
        Box::pin(async move {
            let amount = arg::<u64>(ctx.args(), 0)?;
            if amount > self.cap {
                return Ok(value(self.cap));
            }
            next.run(ctx).await
        })
    }
}

impl Interceptor for Limiter {
    fn name(&self) -> &'static str {
        "Limiter"
    }

    fn as_stage(&self) -> Option<&dyn PipelineStage> {
        Some(self)
    }
}

fn install_runtime() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let mut interceptors = InterceptorRegistry::new();
        interceptors.register("Fee", |args| {
            let amount = args.first().and_then(BindingArg::as_i64).unwrap_or(0);
            Ok(Arc::new(Fee {
                amount: u64::try_from(amount).unwrap_or(0),
            }))
        });
        interceptors.register("Limiter", |args| {
            let cap = args.first().and_then(BindingArg::as_i64).unwrap_or(i64::MAX);
            Ok(Arc::new(Limiter {
                cap: u64::try_from(cap).unwrap_or(u64::MAX),
            }))
        });
        chain_registry::install_aspect_runtime(interceptors).expect("install once per process");
    });
}

#[tokio::test]
async fn test_woven_instance_method_round_trip() {
    install_runtime();
    ContextStack::scope(async {
        let invoices = billing::Invoices::new(3);
        let total = invoices.total(40).await.expect("woven call succeeds");
        // 40 plus the bound fee of 5, plus the instance surcharge of 3.
        assert_eq!(total, 48);
    })
    .await;
}

#[tokio::test]
async fn test_stage_short_circuit_caps_result() {
    install_runtime();
    ContextStack::scope(async {
        let invoices = billing::Invoices::new(0);
        assert_eq!(invoices.clamp(1000).await.expect("capped"), 100);
        assert_eq!(invoices.clamp(7).await.expect("under cap"), 7);
    })
    .await;
}

#[tokio::test]
async fn test_app_error_returns_to_caller_unchanged() {
    install_runtime();
    ContextStack::scope(async {
        let invoices = billing::Invoices::new(0);
        let err = invoices
            .reject_over_limit(900)
            .await
            .expect_err("over limit");
        assert!(matches!(err, billing::BillingError::OverLimit(900)));

        assert_eq!(
            invoices.reject_over_limit(10).await.expect("under limit"),
            10
        );
    })
    .await;
}

#[tokio::test]
async fn test_static_method_dispatch() {
    install_runtime();
    ContextStack::scope(async {
        assert_eq!(billing::Invoices::flat_rate().await, 99);
    })
    .await;
}

#[tokio::test]
async fn test_void_method_dispatch() {
    install_runtime();
    ContextStack::scope(async {
        billing::Invoices::new(1).touch().await;
    })
    .await;
}

#[tokio::test]
async fn test_stub_outside_scope_surfaces_context_error() {
    install_runtime();
    let err = billing::Invoices::new(1)
        .total(1)
        .await
        .expect_err("no context scope entered");
    assert!(matches!(
        err,
        billing::BillingError::Dispatch(arachne_core::AspectError::ContextMissing)
    ));
}

#[tokio::test]
async fn test_default_construction_for_unit_target() {
    install_runtime();
    ContextStack::scope(async {
        // A framework-level call by type reference, the way a scheduler
        // would invoke a woven method without holding an instance.
        let result = arachne_dispatch::dispatch_global(
            &arachne_core::ChainKey::from("billing::Invoices::total"),
            arachne_core::CallTarget::Unit("billing::Invoices"),
            arachne_core::call_args![40_u64],
        )
        .await
        .expect("default-constructed receiver");
        let _ = ContextStack::pop();
        assert_eq!(take::<u64>(&result).expect("u64"), 45);
    })
    .await;
}
