//! Per-call join point passed to lifecycle hooks.

use std::time::{Duration, Instant};

use crate::error::AspectResult;
use crate::value::{arg, CallArgs, CallTarget};

/// The observable shape of one intercepted call.
///
/// Constructed fresh for every dispatch and shared by all lifecycle hooks of
/// that call. The argument list is a snapshot taken at dispatch entry, so it
/// reflects what the caller passed even if a pipeline stage later rewrites
/// the in-flight arguments.
#[derive(Debug, Clone)]
pub struct JoinPoint {
    target: CallTarget,
    unit: String,
    method: String,
    args: CallArgs,
    at: Instant,
}

impl JoinPoint {
    /// Creates a join point for one dispatched call.
    #[must_use]
    pub fn new(
        target: CallTarget,
        unit: impl Into<String>,
        method: impl Into<String>,
        args: CallArgs,
    ) -> Self {
        Self {
            target,
            unit: unit.into(),
            method: method.into(),
            args,
            at: Instant::now(),
        }
    }

    /// The call's receiver.
    #[must_use]
    pub const fn target(&self) -> &CallTarget {
        &self.target
    }

    /// The declaring unit's full path.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The intercepted method's name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The argument snapshot taken at dispatch entry.
    #[must_use]
    pub const fn args(&self) -> &CallArgs {
        &self.args
    }

    /// Typed access to the `index`-th argument.
    ///
    /// # Errors
    ///
    /// Returns a type-mismatch error when the slot is absent or holds a
    /// different type.
    pub fn arg<T>(&self, index: usize) -> AspectResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        arg::<T>(&self.args, index)
    }

    /// `Unit::method` form, for logs and frame keys.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}::{}", self.unit, self.method)
    }

    /// Time elapsed since this join point was constructed.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.at.elapsed()
    }
}
