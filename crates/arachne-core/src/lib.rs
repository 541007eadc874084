//! # Arachne Core
//!
//! Core contracts and data model for the Arachne method-interception engine.
//!
//! This crate provides the foundational types shared by the weaver, the
//! dispatcher, and application interceptors:
//!
//! - [`Interceptor`], [`Lifecycle`], [`PipelineStage`] - the capability
//!   shapes an interceptor may implement
//! - [`ChainDescriptor`] / [`InterceptorBinding`] - the weave-time model of
//!   an intercepted method
//! - [`JoinPoint`] - the per-call view handed to lifecycle hooks
//! - [`DispatchFrame`] / [`ContextStack`] - per-call result records on a
//!   task-local stack
//! - [`ChainRegistry`] / [`InterceptorRegistry`] / [`InvokerRegistry`] - the
//!   read-only lookup tables dispatch runs against
//! - [`AspectError`] - the error channel shared by all of the above

#![doc(html_root_url = "https://docs.rs/arachne-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod contracts;
mod descriptor;
mod error;
mod joinpoint;
mod registry;
mod value;

pub use context::{ContextStack, DispatchFrame, DispatchId, FrameToken, StackSnapshot};
pub use contracts::{BoxFuture, Interceptor, Lifecycle, Next, PipelineStage, StageContext};
pub use descriptor::{
    sort_bindings, BindingArg, ChainDescriptor, ChainKey, InterceptorBinding,
    TRANSACTIONAL_INTERCEPTOR, TRANSACTIONAL_PRIORITY,
};
pub use error::{AspectError, AspectResult};
pub use joinpoint::JoinPoint;
pub use registry::{
    ChainRegistry, ConstructFn, InterceptorFactory, InterceptorRegistry, InvokeFn, InvokerRegistry,
};
pub use value::{arg, take, unit_value, value, CallArgs, CallTarget, CallValue};
