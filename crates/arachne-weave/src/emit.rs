//! Generated-output emission.
//!
//! Writes the rewritten mirror files and the single aggregated registry
//! module, and deletes stale output from earlier passes. Every file written
//! here carries a fixed header; stale cleanup only ever deletes files bearing
//! that header, so hand-written files sharing the output tree are safe.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use walkdir::WalkDir;

use arachne_core::BindingArg;

use crate::error::{WeaveError, WeaveResult};
use crate::model::{MethodPlan, UnitPlan};

/// First line of every file the weaver writes.
pub const GENERATED_HEADER: &str = "// @generated by arachne-weave";

/// Writes a generated syntax tree to `path`, creating parent directories.
pub(crate) fn write_generated(path: &Path, file: &syn::File) -> WeaveResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| WeaveError::write(parent, e))?;
    }
    let body = prettyplease::unparse(file);
    let content = format!("{GENERATED_HEADER}\n{body}");
    fs::write(path, content).map_err(|e| WeaveError::write(path, e))
}

/// `true` when the file starts with the generated header.
pub(crate) fn is_generated_file(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.starts_with(GENERATED_HEADER))
        .unwrap_or(false)
}

/// Deletes generated files under the output root that this pass did not
/// produce and that are not protected by `keep`.
///
/// Only files bearing [`GENERATED_HEADER`] are candidates; anything else in
/// the output tree is left alone. Returns the deleted paths.
pub(crate) fn delete_stale(
    output_root: &Path,
    keep: &HashSet<PathBuf>,
) -> WeaveResult<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    if !output_root.is_dir() {
        return Ok(deleted);
    }

    for entry in WalkDir::new(output_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                let path = error.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::warn!(path = %path.display(), error = %error, "skipping unreadable output entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        if keep.contains(path) || !is_generated_file(path) {
            continue;
        }

        fs::remove_file(path).map_err(|e| WeaveError::write(path, e))?;
        tracing::debug!(path = %path.display(), "deleted stale generated file");
        deleted.push(path.to_path_buf());
    }

    Ok(deleted)
}

/// Builds the aggregated registry module from every unit woven this pass.
///
/// The module compiles into the consuming application and provides
/// `build_chain_registry()`, `build_invoker_registry()`, and an
/// `install_aspect_runtime(interceptors)` helper; generated code supplies
/// chains and invoker thunks, the application supplies the interceptor
/// factories.
pub(crate) fn registry_module(units: &[UnitPlan]) -> WeaveResult<syn::File> {
    let chain_inserts: Vec<TokenStream> = units
        .iter()
        .flat_map(|unit| unit.methods.iter().map(|method| descriptor_insert(unit, method)))
        .collect();

    let invoker_inserts: Vec<TokenStream> = units
        .iter()
        .flat_map(|unit| {
            let mut entries: Vec<TokenStream> = unit
                .methods
                .iter()
                .map(|method| {
                    let chain_key = format!("{}::{}", unit.unit, method.name);
                    let thunk = thunk_path(
                        unit,
                        &format_ident!("__arachne_invoke_{}_{}", unit.type_name, method.name),
                    );
                    quote! { registry.register_invoker(#chain_key, #thunk); }
                })
                .collect();
            if unit.has_default {
                let unit_name = &unit.unit;
                let thunk = thunk_path(
                    unit,
                    &format_ident!("__arachne_construct_{}", unit.type_name),
                );
                entries.push(quote! { registry.register_constructor(#unit_name, #thunk); });
            }
            entries
        })
        .collect();

    let chain_count = chain_inserts.len();
    let doc = format!(
        " Chain registry for {chain_count} woven method(s) across {} unit(s).",
        units.len()
    );

    syn::parse2(quote! {
        #![doc = #doc]

        /// Builds the chain-descriptor table for every woven method.
        pub fn build_chain_registry() -> arachne_core::ChainRegistry {
            let mut registry = arachne_core::ChainRegistry::new();
            #(#chain_inserts)*
            registry
        }

        /// Builds the invoker table mapping chain keys to generated thunks.
        pub fn build_invoker_registry() -> arachne_core::InvokerRegistry {
            let mut registry = arachne_core::InvokerRegistry::new();
            #(#invoker_inserts)*
            registry
        }

        /// Assembles the aspect runtime from the generated registries and the
        /// application's interceptor factories, and installs it process-wide.
        pub fn install_aspect_runtime(
            interceptors: arachne_core::InterceptorRegistry,
        ) -> arachne_core::AspectResult<()> {
            arachne_dispatch::install(arachne_dispatch::AspectRuntime::new(
                build_chain_registry(),
                interceptors,
                build_invoker_registry(),
            ))
        }
    })
    .map_err(|e| WeaveError::parse("<registry>", format!("failed to assemble registry module: {e}")))
}

fn descriptor_insert(unit: &UnitPlan, method: &MethodPlan) -> TokenStream {
    let unit_name = &unit.unit;
    let method_name = &method.name;
    let is_static = method.is_static;
    let returns_value = method.returns_value;
    let arity = method.arity;

    // Insertion order is declaration order; the builder keeps the list
    // sorted by descending priority with stable ties.
    let bindings: Vec<TokenStream> = method
        .bindings
        .iter()
        .map(|binding| {
            let name = &binding.name;
            let priority = binding.priority;
            let base = quote! { arachne_core::InterceptorBinding::new(#name, #priority) };
            if binding.args.is_empty() {
                quote! { .with_binding(#base) }
            } else {
                let args: Vec<TokenStream> = binding.args.iter().map(binding_arg).collect();
                quote! { .with_binding(#base.with_args(vec![#(#args),*])) }
            }
        })
        .collect();

    let transactional = method.transactional.as_ref().map(|txn| match txn.priority {
        Some(priority) => quote! {
            .with_transactional(arachne_core::InterceptorBinding::new(
                arachne_core::TRANSACTIONAL_INTERCEPTOR,
                #priority,
            ))
        },
        None => quote! {
            .with_transactional(arachne_core::InterceptorBinding::transactional())
        },
    });

    quote! {
        registry.insert(
            arachne_core::ChainDescriptor::new(#unit_name, #method_name)
                .with_static(#is_static)
                .with_returns_value(#returns_value)
                .with_arity(#arity)
                #(#bindings)*
                #transactional,
        );
    }
}

fn binding_arg(arg: &BindingArg) -> TokenStream {
    match arg {
        BindingArg::Str(s) => quote! { arachne_core::BindingArg::Str(#s.to_string()) },
        BindingArg::Int(v) => quote! { arachne_core::BindingArg::Int(#v) },
        BindingArg::Float(v) => quote! { arachne_core::BindingArg::Float(#v) },
        BindingArg::Bool(v) => quote! { arachne_core::BindingArg::Bool(#v) },
    }
}

fn thunk_path(unit: &UnitPlan, thunk: &syn::Ident) -> TokenStream {
    let segments: Vec<syn::Ident> = unit
        .module_path
        .iter()
        .map(|segment| format_ident!("{segment}"))
        .collect();
    quote! { crate::#(#segments::)*#thunk }
}
