//! Attribute macros declaring interceptor bindings on methods.
//!
//! These attributes are the source-level surface of the weaver: a method
//! carrying at least one of them qualifies for weaving, and the weaver reads
//! the bindings back out of the source to build the method's chain
//! descriptor. At compile time the attributes are inert. They validate
//! their own grammar and re-emit the method unchanged, so annotated code
//! builds identically whether or not a weave pass has run.
//!
//! # Example
//!
//! ```rust,ignore
//! use arachne::prelude::*;
//!
//! impl AccountService {
//!     #[intercept(name = "RateLimit", priority = 20, args(60, "user"))]
//!     #[intercept(name = "Audit", priority = 5)]
//!     #[transactional]
//!     pub async fn transfer(&self, from: AccountId, to: AccountId, amount: u64)
//!         -> Result<Receipt, TransferError>
//!     {
//!         // ...
//!     }
//! }
//! ```
//!
//! Semantic rules (async-ness, receiver shape, genericity) are enforced by
//! the weaver at weave time, where a violation is reported per method
//! instead of aborting the build.

mod parse;

use proc_macro::TokenStream;

/// Binds an interceptor to a method.
///
/// # Attributes
///
/// - `name`: interceptor type identifier, resolved through the interceptor
///   registry at dispatch time (required)
/// - `priority`: chain ordering, higher runs first (optional, defaults to 0)
/// - `args(...)`: literal construction arguments handed to the interceptor
///   factory, in order (optional)
///
/// Repeat the attribute to bind several interceptors to one method.
#[proc_macro_attribute]
pub fn intercept(attr: TokenStream, item: TokenStream) -> TokenStream {
    parse::expand_intercept(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Marks a method's chain as transactional.
///
/// The weaver merges one `Transactional` binding into the method's chain,
/// by default at the maximum priority so it wraps every other interceptor.
///
/// # Attributes
///
/// - `priority`: overrides the wrapper's position in the chain (optional)
///
/// At most one `#[transactional]` per method; duplicates are a weave-time
/// error.
#[proc_macro_attribute]
pub fn transactional(attr: TokenStream, item: TokenStream) -> TokenStream {
    parse::expand_transactional(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
