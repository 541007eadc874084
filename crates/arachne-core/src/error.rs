//! Error types for the interception engine.
//!
//! This module provides the [`AspectError`] type used across weaving-aware
//! runtime code. Two families of failures flow through it:
//!
//! - **Engine errors** — misconfiguration or misuse of the dispatch machinery
//!   (unknown chain key, missing factory, arity mismatch). These indicate
//!   programmer error and are meant to fail loudly.
//! - **Application errors** — whatever an intercepted method or an interceptor
//!   itself raised. These are carried opaquely in [`AspectError::App`] and can
//!   be recovered with their original type via [`AspectError::into_app`], so
//!   callers of a woven method observe the real underlying error rather than
//!   an engine-specific wrapper.

use thiserror::Error;

/// Result type alias using [`AspectError`].
pub type AspectResult<T> = Result<T, AspectError>;

/// Standard error type for dispatch and invocation.
#[derive(Error, Debug)]
pub enum AspectError {
    /// No chain descriptor is registered under the requested key.
    ///
    /// A woven stub referenced a key absent from the chain registry. This is
    /// fatal: silently skipping interception would hide security, validation,
    /// or caching bindings.
    #[error("unknown chain key `{key}`")]
    UnknownChain {
        /// The chain key that failed to resolve.
        key: String,
    },

    /// No interceptor factory is registered under the bound type name.
    #[error("no interceptor factory registered for `{name}`")]
    UnknownInterceptor {
        /// The interceptor type identifier from the binding.
        name: String,
    },

    /// No invoker thunk is registered for the chain key.
    #[error("no invoker registered for chain key `{key}`")]
    UnknownInvoker {
        /// The chain key that failed to resolve.
        key: String,
    },

    /// An instance call was dispatched with a unit reference as target, and
    /// no default constructor is registered for that unit.
    #[error("cannot construct a default instance of unit `{unit}`")]
    TargetResolution {
        /// The declaring unit that could not be constructed.
        unit: String,
    },

    /// The argument list length does not match the woven method's arity.
    #[error("argument count mismatch for `{key}`: expected {expected}, got {got}")]
    ArityMismatch {
        /// The chain key of the mismatched call.
        key: String,
        /// Number of arguments the woven method declares.
        expected: usize,
        /// Number of arguments actually passed.
        got: usize,
    },

    /// A value could not be downcast to the requested concrete type.
    ///
    /// Raised by the typed value accessors when a stub, thunk, or interceptor
    /// disagrees with the registry about a value's type.
    #[error("value type mismatch: expected `{expected}`")]
    TypeMismatch {
        /// The type name that was requested.
        expected: &'static str,
    },

    /// An interceptor factory rejected its construction arguments.
    #[error("failed to construct interceptor `{name}`: {message}")]
    Construction {
        /// The interceptor type identifier.
        name: String,
        /// Why construction failed.
        message: String,
    },

    /// Dispatch was attempted outside an active context-stack scope.
    #[error("dispatch requires an active dispatch-context scope")]
    ContextMissing,

    /// The global aspect runtime was installed more than once.
    #[error("aspect runtime already installed")]
    AlreadyInstalled,

    /// The global aspect runtime has not been installed yet.
    #[error("aspect runtime not installed")]
    NotInstalled,

    /// An `after_throwing` hook itself failed while reporting an earlier
    /// error.
    ///
    /// The hook's own failure is recorded in `failure`; the error that the
    /// hook was being notified about is preserved as the source, so walking
    /// the chain still reaches the original cause.
    #[error("after_throwing hook `{hook}` failed: {failure}")]
    AfterThrowingFailed {
        /// Type identifier of the hook that failed.
        hook: String,
        /// Display form of the hook's own error.
        failure: String,
        /// The original error the hook was being notified about.
        #[source]
        source: Box<AspectError>,
    },

    /// An application-level error raised by an intercepted method or an
    /// interceptor. Carried unchanged so the original caller can recover it.
    #[error(transparent)]
    App(#[from] anyhow::Error),
}

impl AspectError {
    /// Creates an unknown-chain error.
    #[must_use]
    pub fn unknown_chain(key: impl Into<String>) -> Self {
        Self::UnknownChain { key: key.into() }
    }

    /// Creates an unknown-interceptor error.
    #[must_use]
    pub fn unknown_interceptor(name: impl Into<String>) -> Self {
        Self::UnknownInterceptor { name: name.into() }
    }

    /// Creates an unknown-invoker error.
    #[must_use]
    pub fn unknown_invoker(key: impl Into<String>) -> Self {
        Self::UnknownInvoker { key: key.into() }
    }

    /// Creates a target-resolution error.
    #[must_use]
    pub fn target_resolution(unit: impl Into<String>) -> Self {
        Self::TargetResolution { unit: unit.into() }
    }

    /// Creates an arity-mismatch error.
    #[must_use]
    pub fn arity_mismatch(key: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ArityMismatch {
            key: key.into(),
            expected,
            got,
        }
    }

    /// Creates a type-mismatch error for the requested type `T`.
    #[must_use]
    pub fn type_mismatch<T>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Creates an interceptor-construction error.
    #[must_use]
    pub fn construction(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wraps an application-level error for transport through dispatch.
    #[must_use]
    pub fn app(err: impl Into<anyhow::Error>) -> Self {
        Self::App(err.into())
    }

    /// Creates an after-throwing-failed error chaining the original cause.
    #[must_use]
    pub fn after_throwing_failed(hook: impl Into<String>, failure: &Self, original: Self) -> Self {
        Self::AfterThrowingFailed {
            hook: hook.into(),
            failure: failure.to_string(),
            source: Box::new(original),
        }
    }

    /// Attempts to recover the concrete application error this dispatch
    /// failure carries.
    ///
    /// Returns `Ok(err)` when the failure is [`AspectError::App`] holding an
    /// `E`; otherwise hands the error back unchanged so the caller can map
    /// engine failures separately. Woven stubs use this to round-trip the
    /// declared error type of a `Result`-returning method.
    pub fn into_app<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            Self::App(err) => err.downcast::<E>().map_err(Self::App),
            other => Err(other),
        }
    }

    /// Returns `true` if this error is an application-level error rather
    /// than an engine failure.
    #[must_use]
    pub const fn is_app(&self) -> bool {
        matches!(self, Self::App(_))
    }
}
