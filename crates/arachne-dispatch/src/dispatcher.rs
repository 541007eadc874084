//! The three-phase dispatch engine.
//!
//! A woven stub hands every intercepted call to [`dispatch`], which runs the
//! method's interceptor chain in three phases:
//!
//! 1. `before` on every lifecycle-capable interceptor, highest binding
//!    priority first.
//! 2. The stage pipeline: stage-capable interceptors folded around the
//!    terminal call, outermost stage entered first. A stage that declines
//!    its continuation short-circuits everything inside it; the dispatcher
//!    detects this from the frame's entry count and attributes it.
//! 3. `after` on every lifecycle-capable interceptor when the pipeline
//!    succeeded, `after_throwing` when any earlier phase failed. Both run in
//!    the same order as `before`, and the error path rethrows the original
//!    error unchanged.
//!
//! Each dispatch pushes exactly one frame onto the calling context's stack
//! before anything else can fail, so the caller always pops exactly one
//! frame after the call returns, whatever the outcome.

use std::sync::Arc;

use arachne_core::{
    AspectError, AspectResult, CallArgs, CallTarget, CallValue, ChainKey, ContextStack,
    DispatchFrame, FrameToken, Interceptor, JoinPoint, Next, PipelineStage, StageContext,
};

use crate::invoker::MethodInvoker;
use crate::runtime::AspectRuntime;

/// Dispatches one intercepted call through its chain.
///
/// The caller owns the frame this pushes: pop it via
/// [`ContextStack::pop`] once the call returns to inspect per-stage
/// results, the terminal value, and short-circuit attribution.
///
/// # Errors
///
/// - [`AspectError::ContextMissing`] outside a [`ContextStack`] scope.
/// - [`AspectError::UnknownChain`] / [`AspectError::UnknownInterceptor`] /
///   [`AspectError::UnknownInvoker`] on registry gaps.
/// - Any error an interceptor hook or the inner method raises; application
///   errors round-trip unchanged through [`AspectError::App`].
pub async fn dispatch(
    runtime: &AspectRuntime,
    chain_key: &ChainKey,
    target: CallTarget,
    args: CallArgs,
) -> AspectResult<CallValue> {
    // Push before anything can fail so callers may pop unconditionally.
    let frame = DispatchFrame::new(chain_key.clone());
    let dispatch_id = frame.id();
    let token = ContextStack::push(frame)?;

    tracing::debug!(
        chain_key = %chain_key,
        %dispatch_id,
        depth = ContextStack::depth(),
        "dispatching intercepted call"
    );

    let descriptor = runtime.descriptor(chain_key)?;
    let invoker = MethodInvoker::resolve(runtime, descriptor)?;

    let order = descriptor.dispatch_order();
    let mut instances = Vec::with_capacity(order.len());
    for binding in &order {
        instances.push((
            binding.interceptor.as_str(),
            runtime.interceptors().instantiate(binding)?,
        ));
    }

    let joinpoint = JoinPoint::new(
        target.clone(),
        descriptor.unit.clone(),
        descriptor.method.clone(),
        args.clone(),
    );

    let outcome = match before_phase(&instances, &joinpoint).await {
        Ok(()) => {
            pipeline_phase(
                &instances,
                invoker,
                descriptor.method.as_str(),
                chain_key,
                target,
                args,
                token,
            )
            .await
        }
        Err(error) => Err(error),
    };

    match outcome {
        Ok(result) => {
            after_phase(&instances, &joinpoint, &result).await?;
            tracing::debug!(chain_key = %chain_key, %dispatch_id, "dispatch completed");
            Ok(result)
        }
        Err(error) => {
            tracing::debug!(chain_key = %chain_key, %dispatch_id, %error, "dispatch failed");
            Err(exception_phase(&instances, &joinpoint, error).await)
        }
    }
}

/// Dispatches through the process-wide installed runtime.
///
/// This is the entry point woven stubs call.
///
/// # Errors
///
/// [`AspectError::NotInstalled`] when no runtime has been installed;
/// otherwise as [`dispatch`].
pub async fn dispatch_global(
    chain_key: &ChainKey,
    target: CallTarget,
    args: CallArgs,
) -> AspectResult<CallValue> {
    dispatch(crate::runtime::global()?, chain_key, target, args).await
}

async fn before_phase(
    aspects: &[(&str, Arc<dyn Interceptor>)],
    joinpoint: &JoinPoint,
) -> AspectResult<()> {
    for (name, aspect) in aspects {
        if let Some(lifecycle) = aspect.as_lifecycle() {
            tracing::trace!(interceptor = *name, "before hook");
            lifecycle.before(joinpoint).await?;
        }
    }
    Ok(())
}

async fn pipeline_phase(
    instances: &[(&str, Arc<dyn Interceptor>)],
    invoker: MethodInvoker,
    method: &str,
    chain_key: &ChainKey,
    target: CallTarget,
    args: CallArgs,
    token: FrameToken,
) -> AspectResult<CallValue> {
    // Lifecycle-only interceptors take no pipeline slot.
    let stages: Vec<(&str, &dyn PipelineStage)> = instances
        .iter()
        .filter_map(|(name, aspect)| aspect.as_stage().map(|stage| (*name, stage)))
        .collect();

    let terminal = Next::terminal(move |ctx| {
        let token = ctx.frame();
        let call = invoker.call(ctx.target().clone(), ctx.args().clone());
        Box::pin(async move {
            let result = call.await?;
            let _ = ContextStack::with_frame_mut(token, |frame| {
                frame.record_terminal(result.clone());
            });
            Ok(result)
        })
    });
    let chain = stages
        .iter()
        .rev()
        .fold(terminal, |next, &(name, stage)| Next::stage(stage, name, next));

    let mut ctx = StageContext::new(chain_key.clone(), method, target, args, token);
    let result = chain.run(&mut ctx).await?;

    // The chain ticks the frame once per entered link. Completing with
    // fewer entries than stages plus terminal means the last entered stage
    // declined its continuation.
    let entered = ContextStack::with_frame_mut(token, |frame| frame.entered()).unwrap_or(0);
    if entered < stages.len() + 1 {
        if let Some(&(culprit, _)) = stages.get(entered.saturating_sub(1)) {
            let _ = ContextStack::with_frame_mut(token, |frame| frame.mark_short_circuit(culprit));
            tracing::debug!(
                chain_key = %chain_key,
                interceptor = culprit,
                "pipeline short-circuited"
            );
        }
    }
    Ok(result)
}

async fn after_phase(
    aspects: &[(&str, Arc<dyn Interceptor>)],
    joinpoint: &JoinPoint,
    result: &CallValue,
) -> AspectResult<()> {
    for (name, aspect) in aspects {
        if let Some(lifecycle) = aspect.as_lifecycle() {
            tracing::trace!(interceptor = *name, "after hook");
            lifecycle.after(joinpoint, result).await?;
        }
    }
    Ok(())
}

/// Notifies every lifecycle hook of the failure, then returns the original
/// error unchanged. A hook that itself fails aborts the notification pass
/// and surfaces as [`AspectError::AfterThrowingFailed`] with the original
/// error chained underneath.
async fn exception_phase(
    aspects: &[(&str, Arc<dyn Interceptor>)],
    joinpoint: &JoinPoint,
    error: AspectError,
) -> AspectError {
    for (name, aspect) in aspects {
        if let Some(lifecycle) = aspect.as_lifecycle() {
            tracing::trace!(interceptor = *name, "after_throwing hook");
            if let Err(failure) = lifecycle.after_throwing(joinpoint, &error).await {
                tracing::error!(
                    interceptor = *name,
                    %failure,
                    "after_throwing hook failed; remaining hooks skipped"
                );
                return AspectError::after_throwing_failed(*name, &failure, error);
            }
        }
    }
    error
}
