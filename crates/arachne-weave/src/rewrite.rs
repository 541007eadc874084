//! Source rewriting.
//!
//! Each qualifying method is split in two: an outer stub keeping the original
//! name and signature whose body routes the call through
//! `arachne_dispatch::dispatch_global`, and a renamed inner copy carrying the
//! original body. Alongside the rewritten `impl`, the pass appends the
//! type-erased invoker thunk for each woven method and, when the type visibly
//! implements `Default`, a default-constructor thunk.
//!
//! The walk recurses through inline modules (skipping `#[cfg(test)]`), so a
//! unit's path combines the file's module location with any inline nesting.
//! Methods that cannot be woven are recorded as issues and left untouched;
//! the rest of the file still weaves.

use std::collections::HashMap;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::Token;

use crate::config::WeaveConfig;
use crate::model::{MethodPlan, UnitPlan};
use crate::parse::{self, MethodShape, ReturnShape};

/// Outcome of rewriting one source file.
pub(crate) struct RewriteOutcome {
    /// The rewritten syntax tree, a drop-in replacement for the source file.
    pub file: syn::File,
    /// One plan per `impl` block with at least one woven method.
    pub units: Vec<UnitPlan>,
    /// Methods and impl blocks that could not be woven.
    pub issues: Vec<MethodIssue>,
}

/// A problem found while rewriting, scoped to a unit or a single method.
#[derive(Debug)]
pub(crate) struct MethodIssue {
    pub unit: String,
    pub method: Option<String>,
    pub message: String,
}

impl MethodIssue {
    fn of_unit(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            method: None,
            message: message.into(),
        }
    }

    fn of_method(
        unit: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            method: Some(method.into()),
            message: message.into(),
        }
    }
}

/// Rewrites every qualifying method in a parsed file.
pub(crate) fn rewrite_file(
    mut file: syn::File,
    file_module_path: &[String],
    config: &WeaveConfig,
) -> RewriteOutcome {
    let mut units = Vec::new();
    let mut issues = Vec::new();
    rewrite_items(
        &mut file.items,
        file_module_path,
        config,
        &mut units,
        &mut issues,
    );
    RewriteOutcome {
        file,
        units,
        issues,
    }
}

fn rewrite_items(
    items: &mut Vec<syn::Item>,
    module_path: &[String],
    config: &WeaveConfig,
    units: &mut Vec<UnitPlan>,
    issues: &mut Vec<MethodIssue>,
) {
    let types = collect_local_types(items);

    let mut i = 0;
    while i < items.len() {
        let injected: Vec<syn::Item> = match &mut items[i] {
            syn::Item::Mod(module) if !is_cfg_test(&module.attrs) => {
                if let Some((_, inner)) = module.content.as_mut() {
                    let mut inner_path = module_path.to_vec();
                    inner_path.push(module.ident.to_string());
                    rewrite_items(inner, &inner_path, config, units, issues);
                }
                Vec::new()
            }
            syn::Item::Impl(imp) => process_impl(imp, &types, module_path, config, units, issues),
            _ => Vec::new(),
        };

        let count = injected.len();
        for (offset, item) in injected.into_iter().enumerate() {
            items.insert(i + 1 + offset, item);
        }
        i += 1 + count;
    }
}

/// Syntactic facts about a type declared at the current module level.
#[derive(Debug, Default, Clone, Copy)]
struct TypeInfo {
    has_default: bool,
    has_clone: bool,
}

fn collect_local_types(items: &[syn::Item]) -> HashMap<String, TypeInfo> {
    let mut types = HashMap::new();

    for item in items {
        match item {
            syn::Item::Struct(s) => {
                types.insert(s.ident.to_string(), derive_info(&s.attrs));
            }
            syn::Item::Enum(e) => {
                types.insert(e.ident.to_string(), derive_info(&e.attrs));
            }
            _ => {}
        }
    }

    // Manual trait impls count the same as derives.
    for item in items {
        let syn::Item::Impl(imp) = item else { continue };
        let Some((_, trait_path, _)) = &imp.trait_ else {
            continue;
        };
        let Some(trait_name) = trait_path.segments.last().map(|s| s.ident.to_string()) else {
            continue;
        };
        let Some(type_ident) = plain_type_ident(&imp.self_ty) else {
            continue;
        };
        if let Some(info) = types.get_mut(&type_ident.to_string()) {
            match trait_name.as_str() {
                "Default" => info.has_default = true,
                "Clone" => info.has_clone = true,
                _ => {}
            }
        }
    }

    types
}

fn derive_info(attrs: &[syn::Attribute]) -> TypeInfo {
    let mut info = TypeInfo::default();
    for attr in attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let Ok(paths) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
        else {
            continue;
        };
        for path in paths {
            match path.segments.last().map(|s| s.ident.to_string()).as_deref() {
                Some("Default") => info.has_default = true,
                Some("Clone") => info.has_clone = true,
                _ => {}
            }
        }
    }
    info
}

fn plain_type_ident(ty: &syn::Type) -> Option<&syn::Ident> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() || path.path.segments.len() != 1 {
        return None;
    }
    let segment = &path.path.segments[0];
    if !segment.arguments.is_empty() {
        return None;
    }
    Some(&segment.ident)
}

fn is_cfg_test(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .meta
                .require_list()
                .map(|list| {
                    list.tokens
                        .to_string()
                        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                        .any(|word| word == "test")
                })
                .unwrap_or(false)
    })
}

fn impl_has_bindings(imp: &syn::ItemImpl) -> bool {
    imp.items.iter().any(|item| {
        matches!(item, syn::ImplItem::Fn(f) if f.attrs.iter().any(parse::is_binding_attr))
    })
}

fn unit_name(module_path: &[String], type_name: &str) -> String {
    if module_path.is_empty() {
        type_name.to_string()
    } else {
        format!("{}::{type_name}", module_path.join("::"))
    }
}

fn process_impl(
    imp: &mut syn::ItemImpl,
    types: &HashMap<String, TypeInfo>,
    module_path: &[String],
    config: &WeaveConfig,
    units: &mut Vec<UnitPlan>,
    issues: &mut Vec<MethodIssue>,
) -> Vec<syn::Item> {
    // Trait impls are inherited behavior and never rewritten.
    if imp.trait_.is_some() {
        return Vec::new();
    }

    let Some(type_ident) = plain_type_ident(&imp.self_ty).cloned() else {
        if impl_has_bindings(imp) {
            let ty = &imp.self_ty;
            issues.push(MethodIssue::of_unit(
                quote!(#ty).to_string(),
                "impl target is not a plain local type",
            ));
        }
        return Vec::new();
    };
    let type_name = type_ident.to_string();

    if !imp.generics.params.is_empty() || imp.generics.where_clause.is_some() {
        if impl_has_bindings(imp) {
            issues.push(MethodIssue::of_unit(
                unit_name(module_path, &type_name),
                "generic impl blocks cannot be woven",
            ));
        }
        return Vec::new();
    }

    let Some(info) = types.get(&type_name).copied() else {
        if impl_has_bindings(imp) {
            issues.push(MethodIssue::of_unit(
                unit_name(module_path, &type_name),
                format!("type `{type_name}` is not declared in this file"),
            ));
        }
        return Vec::new();
    };

    let unit = unit_name(module_path, &type_name);
    let mut new_items = Vec::with_capacity(imp.items.len());
    let mut thunks: Vec<syn::Item> = Vec::new();
    let mut plans: Vec<MethodPlan> = Vec::new();

    for impl_item in std::mem::take(&mut imp.items) {
        let syn::ImplItem::Fn(method) = impl_item else {
            new_items.push(impl_item);
            continue;
        };
        let method_name = method.sig.ident.to_string();

        let bindings = match parse::collect_bindings(&method.attrs) {
            Ok(bindings) => bindings,
            Err(message) => {
                issues.push(MethodIssue::of_method(&unit, &method_name, message));
                new_items.push(syn::ImplItem::Fn(method));
                continue;
            }
        };
        if !bindings.qualifies() {
            new_items.push(syn::ImplItem::Fn(method));
            continue;
        }

        if parse::is_constructor(&method.sig, &type_name) {
            issues.push(MethodIssue::of_method(
                &unit,
                &method_name,
                "constructor methods are excluded from weaving",
            ));
            new_items.push(syn::ImplItem::Fn(method));
            continue;
        }

        let shape = match parse::method_shape(&method.sig) {
            Ok(shape) => shape,
            Err(message) => {
                issues.push(MethodIssue::of_method(&unit, &method_name, message));
                new_items.push(syn::ImplItem::Fn(method));
                continue;
            }
        };

        match weave_method(&method, &shape, bindings, &unit, &type_ident, config) {
            Ok(woven) => {
                tracing::debug!(unit = %unit, method = %method_name, "rewrote method into dispatch stub");
                new_items.push(woven.stub);
                new_items.push(woven.inner);
                thunks.push(woven.thunk);
                plans.push(woven.plan);
            }
            Err(message) => {
                issues.push(MethodIssue::of_method(&unit, &method_name, message));
                new_items.push(syn::ImplItem::Fn(method));
            }
        }
    }

    imp.items = new_items;
    if plans.is_empty() {
        return Vec::new();
    }

    if plans.iter().any(|plan| !plan.is_static) && !info.has_clone {
        tracing::warn!(
            unit = %unit,
            "woven type does not visibly implement Clone; instance stubs clone the receiver"
        );
    }

    if info.has_default {
        match construct_thunk(&type_ident) {
            Ok(thunk) => thunks.push(thunk),
            Err(message) => issues.push(MethodIssue::of_unit(&unit, message)),
        }
    }

    units.push(UnitPlan {
        unit,
        type_name,
        module_path: module_path.to_vec(),
        has_default: info.has_default,
        methods: plans,
    });
    thunks
}

struct WovenMethod {
    stub: syn::ImplItem,
    inner: syn::ImplItem,
    thunk: syn::Item,
    plan: MethodPlan,
}

fn weave_method(
    method: &syn::ImplItemFn,
    shape: &MethodShape,
    bindings: parse::MethodBindings,
    unit: &str,
    type_ident: &syn::Ident,
    config: &WeaveConfig,
) -> Result<WovenMethod, String> {
    let method_ident = &method.sig.ident;
    let method_name = method_ident.to_string();
    let chain_key = format!("{unit}::{method_name}");
    let inner_ident = format_ident!("{}{}", method_ident, config.inner_suffix);

    let kept_attrs: Vec<syn::Attribute> = method
        .attrs
        .iter()
        .filter(|attr| !parse::is_binding_attr(attr))
        .cloned()
        .collect();

    let stub = syn::ImplItem::Fn(syn::ImplItemFn {
        attrs: kept_attrs.clone(),
        vis: method.vis.clone(),
        defaultness: None,
        sig: method.sig.clone(),
        block: stub_body(shape, unit, &chain_key)?,
    });

    let mut inner_attrs: Vec<syn::Attribute> = vec![syn::parse_quote!(#[doc(hidden)])];
    inner_attrs.extend(
        kept_attrs
            .into_iter()
            .filter(|attr| !attr.path().is_ident("doc")),
    );
    let mut inner_sig = method.sig.clone();
    inner_sig.ident = inner_ident.clone();
    let inner = syn::ImplItem::Fn(syn::ImplItemFn {
        attrs: inner_attrs,
        vis: syn::Visibility::Public(syn::token::Pub::default()),
        defaultness: None,
        sig: inner_sig,
        block: method.block.clone(),
    });

    let thunk = invoke_thunk(type_ident, &inner_ident, method_ident, shape)?;

    let plan = MethodPlan {
        name: method_name,
        is_static: shape.is_static(),
        returns_value: shape.shape.returns_value(),
        arity: shape.arity(),
        bindings: bindings.bindings,
        transactional: bindings.transactional,
    };

    Ok(WovenMethod {
        stub,
        inner,
        thunk,
        plan,
    })
}

fn stub_body(shape: &MethodShape, unit: &str, chain_key: &str) -> Result<syn::Block, String> {
    let arg_idents = &shape.arg_names;
    let dispatch_args = if arg_idents.is_empty() {
        quote! { arachne_core::CallArgs::new() }
    } else {
        quote! { arachne_core::call_args![#(#arg_idents),*] }
    };
    let target = if shape.is_static() {
        quote! { arachne_core::CallTarget::Unit(#unit) }
    } else {
        quote! { arachne_core::CallTarget::Instance(arachne_core::value(self.clone())) }
    };

    let adapt = match &shape.shape {
        ReturnShape::Result { ok, err } => quote! {
            match __result {
                Ok(value) => match arachne_core::take::<#ok>(&value) {
                    Ok(typed) => Ok(typed),
                    Err(infra) => Err(<#err>::from(infra)),
                },
                Err(err) => match err.into_app::<#err>() {
                    Ok(app) => Err(app),
                    Err(infra) => Err(<#err>::from(infra)),
                },
            }
        },
        ReturnShape::Value(ok) => {
            let message = format!("intercepted call {chain_key} failed: {{err}}");
            quote! {
                match __result.and_then(|value| arachne_core::take::<#ok>(&value)) {
                    Ok(out) => out,
                    Err(err) => panic!(#message),
                }
            }
        }
        ReturnShape::Unit => {
            let message = format!("intercepted call {chain_key} failed: {{err}}");
            quote! {
                if let Err(err) = __result {
                    panic!(#message);
                }
            }
        }
    };

    syn::parse2(quote! {{
        let __result = arachne_dispatch::dispatch_global(
            &arachne_core::ChainKey::from(#chain_key),
            #target,
            #dispatch_args,
        )
        .await;
        let _ = arachne_core::ContextStack::pop();
        #adapt
    }})
    .map_err(|e| format!("failed to assemble stub body: {e}"))
}

fn invoke_thunk(
    type_ident: &syn::Ident,
    inner_ident: &syn::Ident,
    method_ident: &syn::Ident,
    shape: &MethodShape,
) -> Result<syn::Item, String> {
    let thunk_ident = format_ident!("__arachne_invoke_{}_{}", type_ident, method_ident);
    let arg_idents = &shape.arg_names;

    let extract: Vec<TokenStream> = arg_idents
        .iter()
        .zip(&shape.arg_types)
        .enumerate()
        .map(|(index, (name, ty))| {
            let index = proc_macro2::Literal::usize_unsuffixed(index);
            quote! { let #name = arachne_core::arg::<#ty>(&args, #index)?; }
        })
        .collect();

    let call = if shape.is_static() {
        quote! { #type_ident::#inner_ident(#(#arg_idents),*) }
    } else {
        quote! { receiver.#inner_ident(#(#arg_idents),*) }
    };
    let finish = match &shape.shape {
        ReturnShape::Result { .. } => quote! {
            match #call.await {
                Ok(out) => Ok(arachne_core::value(out)),
                Err(err) => Err(arachne_core::AspectError::app(err)),
            }
        },
        ReturnShape::Value(_) => quote! {
            let out = #call.await;
            Ok(arachne_core::value(out))
        },
        ReturnShape::Unit => quote! {
            #call.await;
            Ok(arachne_core::unit_value())
        },
    };

    let receiver_bind = if shape.is_static() {
        quote! {}
    } else {
        quote! {
            let receiver = match target {
                arachne_core::CallTarget::Instance(instance) => {
                    arachne_core::take::<#type_ident>(&instance)?
                }
                arachne_core::CallTarget::Unit(unit) => {
                    return Err(arachne_core::AspectError::target_resolution(unit));
                }
            };
        }
    };
    let target_pat = if shape.is_static() {
        quote!(_target)
    } else {
        quote!(target)
    };
    let args_pat = if arg_idents.is_empty() {
        quote!(_args)
    } else {
        quote!(args)
    };

    syn::parse2(quote! {
        #[allow(non_snake_case)]
        pub fn #thunk_ident(
            #target_pat: arachne_core::CallTarget,
            #args_pat: arachne_core::CallArgs,
        ) -> arachne_core::BoxFuture<'static, arachne_core::AspectResult<arachne_core::CallValue>> {
            Box::pin(async move {
                #receiver_bind
                #(#extract)*
                #finish
            })
        }
    })
    .map_err(|e| format!("failed to assemble invoker thunk: {e}"))
}

fn construct_thunk(type_ident: &syn::Ident) -> Result<syn::Item, String> {
    let thunk_ident = format_ident!("__arachne_construct_{}", type_ident);
    syn::parse2(quote! {
        #[allow(non_snake_case)]
        pub fn #thunk_ident() -> arachne_core::AspectResult<arachne_core::CallValue> {
            Ok(arachne_core::value(#type_ident::default()))
        }
    })
    .map_err(|e| format!("failed to assemble constructor thunk: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arachne_core::BindingArg;
    use syn::parse_quote;

    fn rewrite(file: syn::File, module_path: &[&str]) -> RewriteOutcome {
        let path: Vec<String> = module_path.iter().map(ToString::to_string).collect();
        rewrite_file(file, &path, &WeaveConfig::default())
    }

    fn render(outcome: &RewriteOutcome) -> String {
        prettyplease::unparse(&outcome.file)
    }

    #[test]
    fn test_rewrites_method_into_stub_and_inner() {
        let file: syn::File = parse_quote! {
            #[derive(Debug, Clone, Default)]
            pub struct Invoices {
                surcharge: u64,
            }

            impl Invoices {
                /// Totals an invoice.
                #[intercept(name = "Fee", priority = 10, args(5))]
                pub async fn total(&self, amount: u64) -> Result<u64, BillingError> {
                    Ok(self.surcharge + amount)
                }
            }
        };

        let outcome = rewrite(file, &["billing"]);
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.units.len(), 1);

        let unit = &outcome.units[0];
        assert_eq!(unit.unit, "billing::Invoices");
        assert!(unit.has_default);
        assert_eq!(unit.methods.len(), 1);
        assert_eq!(unit.methods[0].arity, 1);
        assert!(unit.methods[0].returns_value);
        assert_eq!(unit.methods[0].bindings[0].name, "Fee");
        assert_eq!(unit.methods[0].bindings[0].priority, 10);
        assert_eq!(unit.methods[0].bindings[0].args, vec![BindingArg::Int(5)]);

        let out = render(&outcome);
        assert!(out.contains("pub async fn total(&self, amount: u64)"));
        assert!(out.contains("dispatch_global"));
        assert!(out.contains("billing::Invoices::total"));
        assert!(out.contains("ContextStack::pop"));
        assert!(out.contains("pub async fn total__inner"));
        assert!(out.contains("#[doc(hidden)]"));
        assert!(out.contains("__arachne_invoke_Invoices_total"));
        assert!(out.contains("__arachne_construct_Invoices"));
        // Binding attrs never survive into woven output.
        assert!(!out.contains("intercept"));
        // The stub's doc comment survives; the inner copy is hidden instead.
        assert!(out.contains("Totals an invoice"));
    }

    #[test]
    fn test_static_method_targets_unit() {
        let file: syn::File = parse_quote! {
            #[derive(Default)]
            struct Rates;

            impl Rates {
                #[intercept(name = "Audit")]
                pub async fn flat() -> u64 {
                    99
                }
            }
        };

        let outcome = rewrite(file, &["billing"]);
        assert!(outcome.issues.is_empty());
        assert!(outcome.units[0].methods[0].is_static);

        let out = render(&outcome);
        assert!(out.contains("CallTarget::Unit(\"billing::Rates\")"));
        assert!(out.contains("Rates::flat__inner()"));
        assert!(out.contains("panic!"));
    }

    #[test]
    fn test_void_method_reports_no_value() {
        let file: syn::File = parse_quote! {
            #[derive(Clone, Default)]
            struct Ledger;

            impl Ledger {
                #[transactional]
                pub async fn touch(&self) {}
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.issues.is_empty());
        let plan = &outcome.units[0].methods[0];
        assert!(!plan.returns_value);
        assert!(plan.bindings.is_empty());
        assert!(plan.transactional.is_some());

        let out = render(&outcome);
        assert!(out.contains("unit_value"));
        assert!(out.contains("if let Err(err) = __result"));
    }

    #[test]
    fn test_unannotated_methods_left_alone() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Plain;

            impl Plain {
                pub async fn nothing(&self) -> u64 {
                    1
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert!(outcome.issues.is_empty());
        let out = render(&outcome);
        assert!(!out.contains("dispatch_global"));
        assert!(!out.contains("__inner"));
    }

    #[test]
    fn test_non_async_method_recorded_and_left_unwoven() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Sync;

            impl Sync {
                #[intercept(name = "Audit")]
                pub fn now(&self) -> u64 {
                    1
                }

                #[intercept(name = "Audit")]
                pub async fn later(&self) -> u64 {
                    2
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].method.as_deref(), Some("now"));
        assert!(outcome.issues[0].message.contains("async"));

        // The async sibling still weaves.
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].methods[0].name, "later");

        // The failed method keeps its original body and attribute.
        let out = render(&outcome);
        assert!(out.contains("pub fn now"));
        assert!(out.contains("#[intercept(name = \"Audit\")]"));
        assert!(!out.contains("now__inner"));
    }

    #[test]
    fn test_annotated_constructor_rejected() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Accounts;

            impl Accounts {
                #[intercept(name = "Audit")]
                pub async fn new() -> Self {
                    Self
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].message.contains("constructor"));
    }

    #[test]
    fn test_duplicate_transactional_rejected() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Ledger;

            impl Ledger {
                #[transactional]
                #[transactional(priority = 2)]
                pub async fn commit(&self) {}
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].message.contains("duplicate"));
    }

    #[test]
    fn test_annotated_method_on_undeclared_type_rejected() {
        let file: syn::File = parse_quote! {
            impl Elsewhere {
                #[intercept(name = "Audit")]
                pub async fn run(&self) {}
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].message.contains("not declared"));
    }

    #[test]
    fn test_generic_impl_with_bindings_rejected() {
        let file: syn::File = parse_quote! {
            struct Holder;

            impl<T> Holder {
                #[intercept(name = "Audit")]
                pub async fn run(&self) {}
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].message.contains("generic impl"));
    }

    #[test]
    fn test_trait_impls_never_rewritten() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Worker;

            impl Runner for Worker {
                async fn run(&self) {}
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_cfg_test_modules_skipped() {
        let file: syn::File = parse_quote! {
            #[cfg(test)]
            mod tests {
                struct Fixture;

                impl Fixture {
                    #[intercept(name = "Audit")]
                    pub async fn run(&self) {}
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units.is_empty());
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_inline_module_extends_unit_path() {
        let file: syn::File = parse_quote! {
            pub mod billing {
                #[derive(Clone)]
                pub struct Invoices;

                impl Invoices {
                    #[intercept(name = "Audit")]
                    pub async fn total(&self) -> u64 {
                        1
                    }
                }
            }
        };

        let outcome = rewrite(file, &["api"]);
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].unit, "api::billing::Invoices");
        assert_eq!(
            outcome.units[0].module_path,
            vec!["api".to_string(), "billing".to_string()]
        );

        let out = render(&outcome);
        assert!(out.contains("api::billing::Invoices::total"));
    }

    #[test]
    fn test_manual_default_impl_enables_constructor_thunk() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Counter {
                n: u64,
            }

            impl Default for Counter {
                fn default() -> Self {
                    Self { n: 0 }
                }
            }

            impl Counter {
                #[intercept(name = "Audit")]
                pub async fn get(&self) -> u64 {
                    self.n
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(outcome.units[0].has_default);
        assert!(render(&outcome).contains("__arachne_construct_Counter"));
    }

    #[test]
    fn test_no_default_means_no_constructor_thunk() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Sealed {
                key: u64,
            }

            impl Sealed {
                #[intercept(name = "Audit")]
                pub async fn get(&self) -> u64 {
                    self.key
                }
            }
        };

        let outcome = rewrite(file, &[]);
        assert!(!outcome.units[0].has_default);
        assert!(!render(&outcome).contains("__arachne_construct_Sealed"));
    }

    #[test]
    fn test_custom_inner_suffix() {
        let file: syn::File = parse_quote! {
            #[derive(Clone)]
            struct Api;

            impl Api {
                #[intercept(name = "Audit")]
                pub async fn call(&self) -> u64 {
                    1
                }
            }
        };

        let path: Vec<String> = Vec::new();
        let config = WeaveConfig::default().with_inner_suffix("__base");
        let outcome = rewrite_file(file, &path, &config);
        let out = prettyplease::unparse(&outcome.file);
        assert!(out.contains("call__base"));
        assert!(!out.contains("call__inner"));
    }
}
