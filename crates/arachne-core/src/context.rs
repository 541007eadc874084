//! Per-execution-context dispatch frames and the frame stack.
//!
//! Every call to the dispatcher pushes one [`DispatchFrame`] onto the stack
//! of the current logical execution context. The frame collects the call's
//! side-channel records: per-interceptor pipeline results, the terminal
//! return value, and short-circuit attribution. The caller that initiated
//! the dispatch pops the frame after the call returns to inspect it.
//!
//! The stack is task-local. Each tokio task owns exactly one stack, entered
//! with [`ContextStack::scope`]; nested dispatch calls inside that task grow
//! the same stack, and concurrent tasks never share frames. Because the
//! stack is exclusively owned by its task, no locking is involved. Forking a
//! child task does not propagate the stack; use [`ContextStack::snapshot`]
//! and [`ContextStack::scope_with`] when a host concurrency layer wants
//! explicit propagation.

use std::cell::RefCell;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::ChainKey;
use crate::error::{AspectError, AspectResult};
use crate::value::CallValue;

/// Unique identifier of one dispatch call, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchId(Uuid);

impl DispatchId {
    /// Creates a new time-ordered identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Addresses one live frame on the current context's stack.
///
/// Tokens are handed out by [`ContextStack::push`] and stay valid until the
/// frame is popped. A token held across a pop resolves to nothing rather
/// than to whatever frame later occupies the same depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken {
    index: usize,
    id: DispatchId,
}

/// The per-call record of one dispatch invocation.
#[derive(Clone)]
pub struct DispatchFrame {
    id: DispatchId,
    chain_key: ChainKey,
    stage_results: IndexMap<String, CallValue>,
    terminal: Option<CallValue>,
    short_circuit: Option<String>,
    entered: usize,
}

impl DispatchFrame {
    /// Creates an empty frame for the given chain.
    #[must_use]
    pub fn new(chain_key: ChainKey) -> Self {
        Self {
            id: DispatchId::new(),
            chain_key,
            stage_results: IndexMap::new(),
            terminal: None,
            short_circuit: None,
            entered: 0,
        }
    }

    /// The dispatch identifier of this call.
    #[must_use]
    pub const fn id(&self) -> DispatchId {
        self.id
    }

    /// The chain key this frame was dispatched under.
    #[must_use]
    pub const fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Records a pipeline stage's own return value under its interceptor
    /// type identifier.
    pub fn record_stage_result(&mut self, interceptor: impl Into<String>, value: CallValue) {
        self.stage_results.insert(interceptor.into(), value);
    }

    /// The recorded pipeline result of one interceptor type, if any.
    #[must_use]
    pub fn stage_result(&self, interceptor: &str) -> Option<&CallValue> {
        self.stage_results.get(interceptor)
    }

    /// All recorded pipeline results, in recording order.
    #[must_use]
    pub const fn stage_results(&self) -> &IndexMap<String, CallValue> {
        &self.stage_results
    }

    /// Records the terminal (real) return value of the inner method.
    pub fn record_terminal(&mut self, value: CallValue) {
        self.terminal = Some(value);
    }

    /// The terminal return value, absent when the call short-circuited or
    /// failed before the inner method ran.
    #[must_use]
    pub const fn terminal(&self) -> Option<&CallValue> {
        self.terminal.as_ref()
    }

    /// `true` once the inner method's return value has been recorded.
    ///
    /// Distinguishes "not yet set" from a terminal value that happens to be
    /// unit or otherwise empty-looking.
    #[must_use]
    pub const fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Attributes a short-circuit to the given interceptor type.
    pub fn mark_short_circuit(&mut self, interceptor: impl Into<String>) {
        self.short_circuit = Some(interceptor.into());
    }

    /// The interceptor type that short-circuited the pipeline, if any.
    #[must_use]
    pub fn short_circuit(&self) -> Option<&str> {
        self.short_circuit.as_deref()
    }

    /// `true` when a pipeline stage declined to call its continuation.
    #[must_use]
    pub const fn is_short_circuit(&self) -> bool {
        self.short_circuit.is_some()
    }

    /// Counts one entered pipeline link. Called by the chain on every
    /// continuation step; the dispatcher compares the count against the
    /// chain length to attribute short-circuits.
    pub fn mark_entered(&mut self) {
        self.entered += 1;
    }

    /// Number of pipeline links (stages plus terminal) entered so far.
    #[must_use]
    pub const fn entered(&self) -> usize {
        self.entered
    }
}

impl std::fmt::Debug for DispatchFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchFrame")
            .field("id", &self.id)
            .field("chain_key", &self.chain_key)
            .field(
                "stage_results",
                &self.stage_results.keys().collect::<Vec<_>>(),
            )
            .field("has_terminal", &self.terminal.is_some())
            .field("short_circuit", &self.short_circuit)
            .field("entered", &self.entered)
            .finish()
    }
}

/// A copy of one context's frame stack, for explicit propagation into a
/// child context.
#[derive(Debug, Clone, Default)]
pub struct StackSnapshot {
    frames: Vec<DispatchFrame>,
}

impl StackSnapshot {
    /// Number of frames in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when the snapshot holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

tokio::task_local! {
    static DISPATCH_STACK: RefCell<Vec<DispatchFrame>>;
}

/// The task-local dispatch frame stack.
///
/// All operations act on the calling task's own stack. Outside a scope,
/// [`ContextStack::push`] fails with [`AspectError::ContextMissing`] and the
/// read operations report an empty stack.
///
/// Closures passed to [`ContextStack::current`] must not call the mutating
/// stack operations; the stack is borrowed for the closure's duration.
pub struct ContextStack;

impl ContextStack {
    /// Runs a future with a fresh, empty stack for the current task.
    pub async fn scope<F>(fut: F) -> F::Output
    where
        F: std::future::Future,
    {
        DISPATCH_STACK.scope(RefCell::new(Vec::new()), fut).await
    }

    /// Runs a future with a stack seeded from a snapshot.
    pub async fn scope_with<F>(snapshot: StackSnapshot, fut: F) -> F::Output
    where
        F: std::future::Future,
    {
        DISPATCH_STACK
            .scope(RefCell::new(snapshot.frames), fut)
            .await
    }

    /// Runs a synchronous closure with a fresh, empty stack.
    pub fn in_scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        DISPATCH_STACK.sync_scope(RefCell::new(Vec::new()), f)
    }

    /// `true` when the current task has entered a stack scope.
    #[must_use]
    pub fn is_active() -> bool {
        DISPATCH_STACK.try_with(|_| ()).is_ok()
    }

    /// Pushes a frame, returning a token addressing it.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError::ContextMissing`] outside a stack scope.
    pub fn push(frame: DispatchFrame) -> AspectResult<FrameToken> {
        DISPATCH_STACK
            .try_with(|stack| {
                let mut frames = stack.borrow_mut();
                let token = FrameToken {
                    index: frames.len(),
                    id: frame.id(),
                };
                frames.push(frame);
                token
            })
            .map_err(|_| AspectError::ContextMissing)
    }

    /// Removes and returns the most recently pushed frame.
    ///
    /// Returns `None` on an empty stack or outside a scope; popping an empty
    /// stack is not an error.
    pub fn pop() -> Option<DispatchFrame> {
        DISPATCH_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten()
    }

    /// Applies a closure to the most recently pushed frame.
    pub fn current<F, R>(f: F) -> Option<R>
    where
        F: FnOnce(&DispatchFrame) -> R,
    {
        DISPATCH_STACK
            .try_with(|stack| stack.borrow().last().map(f))
            .ok()
            .flatten()
    }

    /// Current nesting depth of dispatched calls; 0 outside a scope.
    #[must_use]
    pub fn depth() -> usize {
        DISPATCH_STACK
            .try_with(|stack| stack.borrow().len())
            .unwrap_or(0)
    }

    /// Drops every frame on the current stack.
    pub fn clear() {
        let _ = DISPATCH_STACK.try_with(|stack| stack.borrow_mut().clear());
    }

    /// Applies a closure to the frame a token addresses.
    ///
    /// Returns `None` when the frame has been popped (or the token belongs
    /// to another context), so late bookkeeping against a withdrawn frame is
    /// silently dropped rather than corrupting an unrelated frame.
    pub fn with_frame_mut<F, R>(token: FrameToken, f: F) -> Option<R>
    where
        F: FnOnce(&mut DispatchFrame) -> R,
    {
        DISPATCH_STACK
            .try_with(|stack| {
                let mut frames = stack.borrow_mut();
                frames
                    .get_mut(token.index)
                    .filter(|frame| frame.id() == token.id)
                    .map(f)
            })
            .ok()
            .flatten()
    }

    /// Copies the current stack for explicit propagation to a child task.
    #[must_use]
    pub fn snapshot() -> Option<StackSnapshot> {
        DISPATCH_STACK
            .try_with(|stack| StackSnapshot {
                frames: stack.borrow().clone(),
            })
            .ok()
    }
}
