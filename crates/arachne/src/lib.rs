//! # Arachne
//!
//! **Aspect-oriented method interception for Rust**
//!
//! Arachne splits interception into a build-time half and a runtime half:
//!
//! - The **weaver** (`arachne-weave`, a separate build-time tool) scans a
//!   source tree for methods carrying [`intercept`] or [`transactional`]
//!   bindings and rewrites each one into an outer dispatch stub plus a
//!   renamed inner copy, emitting a static chain registry alongside.
//! - The **dispatcher** (re-exported here) executes those stubs through a
//!   priority-ordered, three-phase protocol: `before` hooks, the stage
//!   pipeline around the real call, then `after` or `after_throwing`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use arachne::prelude::*;
//!
//! impl AccountService {
//!     #[intercept(name = "RateLimit", priority = 20, args(60))]
//!     #[intercept(name = "Audit", priority = 5)]
//!     #[transactional]
//!     pub async fn transfer(&self, to: AccountId, amount: u64)
//!         -> Result<Receipt, TransferError>
//!     {
//!         // original body; the weaver moves it to `transfer__inner`
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut interceptors = InterceptorRegistry::new();
//!     interceptors.register("Audit", |_args| Ok(std::sync::Arc::new(Audit) as _));
//!     // generated by the weaver:
//!     generated::install_aspect_runtime(interceptors)?;
//!
//!     ContextStack::scope(async {
//!         let service = AccountService::default();
//!         let receipt = service.transfer(to, 100).await?;
//!         Ok(())
//!     })
//!     .await
//! }
//! ```
//!
//! The weaver itself is not re-exported: it is a build-time tool with its own
//! binary, and applications depend on it from build scripts only.

#![doc(html_root_url = "https://docs.rs/arachne/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the contract and data-model crate
pub use arachne_core as core;

// Re-export the runtime dispatcher crate
pub use arachne_dispatch as dispatch;

// Re-export the binding markers
pub use arachne_macros::{intercept, transactional};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use arachne::prelude::*;
///
/// let descriptor = ChainDescriptor::new("billing::Invoices", "total")
///     .with_binding(InterceptorBinding::new("Audit", 5));
/// assert_eq!(descriptor.chain_key().as_str(), "billing::Invoices::total");
/// ```
pub mod prelude {
    pub use arachne_core::{
        arg, call_args, take, value, AspectError, AspectResult, BindingArg, BoxFuture, CallArgs,
        CallTarget, CallValue, ChainDescriptor, ChainKey, ChainRegistry, ContextStack,
        DispatchFrame, Interceptor, InterceptorBinding, InterceptorRegistry, InvokerRegistry,
        JoinPoint, Lifecycle, Next, PipelineStage, StageContext,
    };
    pub use arachne_dispatch::{dispatch, dispatch_global, install, AspectRuntime};
    pub use arachne_macros::{intercept, transactional};
}
