//! # Arachne Dispatch
//!
//! Runtime half of the Arachne method-interception engine: the proxy
//! dispatcher woven stubs call into, the method invoker that performs the
//! innermost call, and the process-wide [`AspectRuntime`] holding the
//! generated registries.
//!
//! The flow at runtime:
//!
//! 1. Generated code assembles an [`AspectRuntime`] from the chain and
//!    invoker registries and the application's interceptor factories, then
//!    [`install`]s it once at startup.
//! 2. A woven stub calls [`dispatch_global`] with its chain key, receiver,
//!    and boxed arguments, inside a [`ContextStack`] scope
//!    ([`ContextStack::scope`](arachne_core::ContextStack::scope)).
//! 3. [`dispatch`] runs the three-phase interception protocol and returns
//!    the call's result; the stub pops its [`DispatchFrame`]
//!    ([`ContextStack::pop`](arachne_core::ContextStack::pop)) and unboxes.
//!
//! [`ContextStack`]: arachne_core::ContextStack
//! [`DispatchFrame`]: arachne_core::DispatchFrame

#![doc(html_root_url = "https://docs.rs/arachne-dispatch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatcher;
mod invoker;
mod runtime;

pub use dispatcher::{dispatch, dispatch_global};
pub use invoker::MethodInvoker;
pub use runtime::{global, install, try_global, AspectRuntime};
