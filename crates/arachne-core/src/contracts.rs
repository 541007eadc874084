//! Interceptor capability traits and the pipeline continuation.
//!
//! An interceptor may expose two independent capability shapes:
//!
//! - [`Lifecycle`] — observation hooks around the call: `before` runs ahead
//!   of the pipeline, `after` on success, `after_throwing` on failure.
//! - [`PipelineStage`] — around-style control over the call itself: the
//!   stage receives the in-flight [`StageContext`] and a [`Next`]
//!   continuation, and decides whether the rest of the chain runs.
//!
//! One type may implement both. The umbrella [`Interceptor`] trait is what
//! factories produce; the dispatcher asks it for capability membership via
//! [`Interceptor::as_lifecycle`] and [`Interceptor::as_stage`] rather than
//! inspecting concrete types.
//!
//! # Example
//!
//! ```ignore
//! use arachne_core::{AspectResult, BoxFuture, CallValue, Next, PipelineStage, StageContext};
//!
//! struct Timing;
//!
//! impl PipelineStage for Timing {
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut StageContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, AspectResult<CallValue>> {
//!         Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             let result = next.run(ctx).await;
//!             tracing::debug!(elapsed = ?started.elapsed(), "call finished");
//!             result
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::{ContextStack, DispatchFrame, FrameToken};
use crate::descriptor::ChainKey;
use crate::error::{AspectError, AspectResult};
use crate::joinpoint::JoinPoint;
use crate::value::{CallArgs, CallTarget, CallValue};

/// A boxed future, the return shape of all interceptor hooks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle-hook capability: observation points around an intercepted call.
///
/// All three hooks default to pass-through, so an implementor only overrides
/// the phases it cares about. Hooks receive the shared [`JoinPoint`] of the
/// call; they observe but never alter control flow, except by raising an
/// error.
pub trait Lifecycle: Send + Sync {
    /// Runs before the pipeline, in descending binding-priority order.
    /// An error here aborts the call without entering the pipeline.
    fn before<'a>(&'a self, _joinpoint: &'a JoinPoint) -> BoxFuture<'a, AspectResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs after the pipeline completed without error, in the same order as
    /// `before`. Receives the call's final result.
    fn after<'a>(
        &'a self,
        _joinpoint: &'a JoinPoint,
        _result: &'a CallValue,
    ) -> BoxFuture<'a, AspectResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs when any phase raised, in the same order as `before`. Receives
    /// the error that will be rethrown to the original caller.
    fn after_throwing<'a>(
        &'a self,
        _joinpoint: &'a JoinPoint,
        _error: &'a AspectError,
    ) -> BoxFuture<'a, AspectResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Pipeline-stage capability: around-style interception.
///
/// # Invariants
///
/// - A stage calls `next.run(ctx)` at most once; declining to call it
///   short-circuits every lower-priority stage and the terminal call.
/// - The stage's own return value is recorded on the dispatch frame under
///   its interceptor type, whether or not it continued the chain.
pub trait PipelineStage: Send + Sync {
    /// Handles the call, either continuing via `next` or producing a result
    /// of its own.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut StageContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, AspectResult<CallValue>>;
}

/// The umbrella trait interceptor factories produce.
///
/// Capability membership is answered through the accessors: a lifecycle-only
/// interceptor returns `None` from [`Interceptor::as_stage`] and is excluded
/// from the pipeline; a dual-shape interceptor answers both.
pub trait Interceptor: Send + Sync + 'static {
    /// The interceptor's type name, for logs and diagnostics. By convention
    /// this matches the identifier the type is registered under.
    fn name(&self) -> &'static str;

    /// The lifecycle capability of this interceptor, if implemented.
    fn as_lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }

    /// The pipeline capability of this interceptor, if implemented.
    fn as_stage(&self) -> Option<&dyn PipelineStage> {
        None
    }
}

/// The mutable in-flight view of one dispatched call, handed to every
/// pipeline stage.
///
/// Argument rewrites made through [`StageContext::args_mut`] are visible to
/// later stages and to the terminal call.
pub struct StageContext {
    chain_key: ChainKey,
    method: String,
    target: CallTarget,
    args: CallArgs,
    frame: FrameToken,
}

impl StageContext {
    /// Creates the context for one dispatch.
    #[must_use]
    pub fn new(
        chain_key: ChainKey,
        method: impl Into<String>,
        target: CallTarget,
        args: CallArgs,
        frame: FrameToken,
    ) -> Self {
        Self {
            chain_key,
            method: method.into(),
            target,
            args,
            frame,
        }
    }

    /// The chain key being dispatched.
    #[must_use]
    pub const fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// The intercepted method's name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The call's receiver.
    #[must_use]
    pub const fn target(&self) -> &CallTarget {
        &self.target
    }

    /// The in-flight argument list.
    #[must_use]
    pub const fn args(&self) -> &CallArgs {
        &self.args
    }

    /// Mutable access to the in-flight argument list.
    pub fn args_mut(&mut self) -> &mut CallArgs {
        &mut self.args
    }

    /// Token addressing this call's dispatch frame.
    #[must_use]
    pub const fn frame(&self) -> FrameToken {
        self.frame
    }

    /// Applies a closure to this call's dispatch frame.
    ///
    /// Returns `None` when the frame has already been popped.
    pub fn with_frame<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DispatchFrame) -> R,
    {
        ContextStack::with_frame_mut(self.frame, f)
    }
}

/// Continuation handed to a pipeline stage.
///
/// Calling [`Next::run`] continues the chain; `run` consumes the value so a
/// stage cannot continue twice. A stage that returns without calling it
/// short-circuits the remainder of the chain, which the dispatcher detects
/// and attributes on the frame.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More stages to run.
    Chain {
        stage: &'a dyn PipelineStage,
        name: &'a str,
        rest: Box<Next<'a>>,
    },
    /// End of chain: the terminal call against the inner method.
    Terminal(TerminalFn<'a>),
}

type TerminalFn<'a> = Box<
    dyn for<'b> FnOnce(&'b mut StageContext) -> BoxFuture<'b, AspectResult<CallValue>> + Send + 'a,
>;

impl<'a> Next<'a> {
    /// Creates a link that will run the given stage.
    #[must_use]
    pub fn stage(stage: &'a dyn PipelineStage, name: &'a str, rest: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                stage,
                name,
                rest: Box::new(rest),
            },
        }
    }

    /// Creates the terminal link.
    pub fn terminal<F>(f: F) -> Self
    where
        F: for<'b> FnOnce(&'b mut StageContext) -> BoxFuture<'b, AspectResult<CallValue>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Terminal(Box::new(f)),
        }
    }

    /// Runs the remainder of the chain.
    ///
    /// Consumes `self` so it can be invoked at most once. Every entered link
    /// is counted on the dispatch frame; a stage's return value is recorded
    /// there under its interceptor type once its `handle` completes.
    pub async fn run(self, ctx: &mut StageContext) -> AspectResult<CallValue> {
        let _ = ContextStack::with_frame_mut(ctx.frame(), DispatchFrame::mark_entered);
        match self.inner {
            NextInner::Chain { stage, name, rest } => {
                tracing::trace!(stage = name, chain_key = %ctx.chain_key(), "running pipeline stage");
                let result = stage.handle(ctx, *rest).await?;
                let _ = ContextStack::with_frame_mut(ctx.frame(), |frame| {
                    frame.record_stage_result(name, result.clone());
                });
                Ok(result)
            }
            NextInner::Terminal(terminal) => terminal(ctx).await,
        }
    }
}
