//! Binding-attribute grammar and method shape analysis.
//!
//! The grammar here matches what `arachne-macros` validates at compile time:
//! `#[intercept(name = "...", priority = N, args(lit, ...))]` with positional
//! literal args, and `#[transactional]` with an optional `priority` key.
//! Proc-macro crates cannot export ordinary library items, so the weaver
//! carries its own parser for the same surface.
//!
//! Per-method analysis errors are returned as plain strings; the pass wraps
//! them into report entries so one unweavable method never aborts a file.

use arachne_core::BindingArg;
use syn::punctuated::Punctuated;
use syn::{Expr, Lit, Meta, Token, UnOp};

use crate::model::{BindingPlan, TransactionalPlan};

/// Returns `true` for `#[intercept(...)]`, including path-qualified forms.
pub(crate) fn is_intercept_attr(attr: &syn::Attribute) -> bool {
    last_segment_is(attr, "intercept")
}

/// Returns `true` for `#[transactional]`, including path-qualified forms.
pub(crate) fn is_transactional_attr(attr: &syn::Attribute) -> bool {
    last_segment_is(attr, "transactional")
}

/// Returns `true` for either binding marker.
pub(crate) fn is_binding_attr(attr: &syn::Attribute) -> bool {
    is_intercept_attr(attr) || is_transactional_attr(attr)
}

fn last_segment_is(attr: &syn::Attribute, name: &str) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| segment.ident == name)
}

/// Parses one `#[intercept(...)]` attribute into a binding plan.
pub(crate) fn parse_intercept(attr: &syn::Attribute) -> Result<BindingPlan, String> {
    let metas = attr
        .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .map_err(|e| format!("malformed #[intercept]: {e}"))?;

    let mut name = None;
    let mut priority = 0_i32;
    let mut args = Vec::new();

    for meta in metas {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                name = Some(str_value(&nv)?);
            }
            Meta::NameValue(nv) if nv.path.is_ident("priority") => {
                priority = int_value(&nv)?;
            }
            Meta::List(list) if list.path.is_ident("args") => {
                let exprs = list
                    .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)
                    .map_err(|e| format!("malformed args(...) list: {e}"))?;
                for expr in exprs {
                    args.push(literal_arg(&expr)?);
                }
            }
            other => {
                return Err(format!(
                    "unsupported key `{}` in #[intercept]",
                    meta_key(&other)
                ));
            }
        }
    }

    let name = name.ok_or("missing `name` key in #[intercept]")?;
    Ok(BindingPlan {
        name,
        priority,
        args,
    })
}

/// Parses one `#[transactional]` attribute into a marker plan.
pub(crate) fn parse_transactional(attr: &syn::Attribute) -> Result<TransactionalPlan, String> {
    match &attr.meta {
        Meta::Path(_) => Ok(TransactionalPlan { priority: None }),
        Meta::List(_) => {
            let metas = attr
                .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
                .map_err(|e| format!("malformed #[transactional]: {e}"))?;

            let mut priority = None;
            for meta in metas {
                match meta {
                    Meta::NameValue(nv) if nv.path.is_ident("priority") => {
                        priority = Some(int_value(&nv)?);
                    }
                    other => {
                        return Err(format!(
                            "unsupported key `{}` in #[transactional]",
                            meta_key(&other)
                        ));
                    }
                }
            }
            Ok(TransactionalPlan { priority })
        }
        Meta::NameValue(_) => Err("malformed #[transactional]".to_string()),
    }
}

/// All bindings declared on one method.
#[derive(Debug, Default)]
pub(crate) struct MethodBindings {
    pub bindings: Vec<BindingPlan>,
    pub transactional: Option<TransactionalPlan>,
}

impl MethodBindings {
    /// A method qualifies for weaving when it carries any binding.
    pub(crate) fn qualifies(&self) -> bool {
        !self.bindings.is_empty() || self.transactional.is_some()
    }
}

/// Collects every binding attribute on a method, in declaration order.
pub(crate) fn collect_bindings(attrs: &[syn::Attribute]) -> Result<MethodBindings, String> {
    let mut out = MethodBindings::default();
    for attr in attrs {
        if is_intercept_attr(attr) {
            out.bindings.push(parse_intercept(attr)?);
        } else if is_transactional_attr(attr) {
            if out.transactional.is_some() {
                return Err("duplicate #[transactional] marker".to_string());
            }
            out.transactional = Some(parse_transactional(attr)?);
        }
    }
    Ok(out)
}

/// The declared return type of a method, reduced to the three shapes the
/// generated stub distinguishes.
#[derive(Debug, Clone)]
pub(crate) enum ReturnShape {
    /// `-> ()` or no return type.
    Unit,
    /// A plain value type.
    Value(Box<syn::Type>),
    /// `Result<T, E>` with both parameters spelled out.
    Result {
        ok: Box<syn::Type>,
        err: Box<syn::Type>,
    },
}

impl ReturnShape {
    pub(crate) fn returns_value(&self) -> bool {
        !matches!(self, Self::Unit)
    }
}

/// Classifies a method's return type.
///
/// `Result` is detected syntactically by its last path segment, so aliases
/// such as `anyhow::Result<T>` that hide the error parameter are rejected:
/// the stub needs the concrete error type to round-trip failures.
pub(crate) fn return_shape(output: &syn::ReturnType) -> Result<ReturnShape, String> {
    let ty = match output {
        syn::ReturnType::Default => return Ok(ReturnShape::Unit),
        syn::ReturnType::Type(_, ty) => ty.as_ref(),
    };

    match ty {
        syn::Type::Tuple(tuple) if tuple.elems.is_empty() => Ok(ReturnShape::Unit),
        syn::Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return Err("unsupported return type".to_string());
            };
            if segment.ident != "Result" {
                return Ok(ReturnShape::Value(Box::new(ty.clone())));
            }

            let syn::PathArguments::AngleBracketed(generics) = &segment.arguments else {
                return Err(
                    "Result return types must spell both type parameters".to_string()
                );
            };
            let types: Vec<&syn::Type> = generics
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(t) => Some(t),
                    _ => None,
                })
                .collect();
            match types.as_slice() {
                [ok, err] => Ok(ReturnShape::Result {
                    ok: Box::new((*ok).clone()),
                    err: Box::new((*err).clone()),
                }),
                _ => Err("Result return types must spell both type parameters".to_string()),
            }
        }
        _ => Ok(ReturnShape::Value(Box::new(ty.clone()))),
    }
}

/// How a method receives its instance, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiverKind {
    /// Associated function with no receiver.
    Static,
    /// `&self`.
    Ref,
    /// `self` by value, possibly `mut self`.
    Owned,
}

/// Shape facts extracted from a qualifying method's signature.
#[derive(Debug)]
pub(crate) struct MethodShape {
    pub receiver: ReceiverKind,
    pub arg_names: Vec<syn::Ident>,
    pub arg_types: Vec<syn::Type>,
    pub shape: ReturnShape,
}

impl MethodShape {
    pub(crate) fn is_static(&self) -> bool {
        self.receiver == ReceiverKind::Static
    }

    pub(crate) fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

/// Validates a qualifying method's signature and extracts its shape.
///
/// Rejections here become per-method report entries: non-async methods,
/// `&mut self` receivers, generic methods, borrowed or pattern-bound
/// parameters. Each would make the generated stub or thunk unsound.
pub(crate) fn method_shape(sig: &syn::Signature) -> Result<MethodShape, String> {
    if sig.asyncness.is_none() {
        return Err("intercepted methods must be async".to_string());
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err("generic methods cannot be woven".to_string());
    }

    let mut receiver = ReceiverKind::Static;
    let mut arg_names = Vec::new();
    let mut arg_types = Vec::new();

    for input in &sig.inputs {
        match input {
            syn::FnArg::Receiver(r) => {
                if r.colon_token.is_some() {
                    return Err("unsupported receiver type".to_string());
                }
                if r.reference.is_some() && r.mutability.is_some() {
                    return Err(
                        "&mut self receivers cannot be woven, dispatch clones the receiver"
                            .to_string(),
                    );
                }
                receiver = if r.reference.is_none() {
                    ReceiverKind::Owned
                } else {
                    ReceiverKind::Ref
                };
            }
            syn::FnArg::Typed(typed) => {
                let syn::Pat::Ident(pat) = typed.pat.as_ref() else {
                    return Err("parameters must be plain identifiers".to_string());
                };
                check_owned_type(&typed.ty)?;
                arg_names.push(pat.ident.clone());
                arg_types.push(typed.ty.as_ref().clone());
            }
        }
    }

    let shape = return_shape(&sig.output)?;
    Ok(MethodShape {
        receiver,
        arg_names,
        arg_types,
        shape,
    })
}

/// Returns `true` for constructor-style associated functions, which are
/// excluded from weaving even when annotated.
pub(crate) fn is_constructor(sig: &syn::Signature, type_name: &str) -> bool {
    if sig.ident != "new" {
        return false;
    }
    match &sig.output {
        syn::ReturnType::Default => false,
        syn::ReturnType::Type(_, ty) => {
            let rendered = quote::quote!(#ty).to_string();
            rendered.contains("Self") || rendered.contains(type_name)
        }
    }
}

fn check_owned_type(ty: &syn::Type) -> Result<(), String> {
    if matches!(ty, syn::Type::Reference(_)) {
        return Err("parameter types must be owned, not references".to_string());
    }
    if matches!(ty, syn::Type::ImplTrait(_)) {
        return Err("impl Trait parameters cannot be woven".to_string());
    }
    // Catches borrows nested inside otherwise-owned types, e.g. Vec<&str>.
    if quote::quote!(#ty).to_string().contains('&') {
        return Err("parameter types must be owned, not references".to_string());
    }
    Ok(())
}

fn meta_key(meta: &Meta) -> String {
    meta.path()
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
        .unwrap_or_default()
}

fn str_value(nv: &syn::MetaNameValue) -> Result<String, String> {
    match &nv.value {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            _ => Err("expected a string literal".to_string()),
        },
        _ => Err("expected a string literal".to_string()),
    }
}

fn int_value(nv: &syn::MetaNameValue) -> Result<i32, String> {
    let wide = match &nv.value {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Int(i) => i.base10_parse::<i64>().map_err(|e| e.to_string())?,
            _ => return Err("expected an integer literal".to_string()),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => match unary.expr.as_ref() {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Int(i) => -i.base10_parse::<i64>().map_err(|e| e.to_string())?,
                _ => return Err("expected an integer literal".to_string()),
            },
            _ => return Err("expected an integer literal".to_string()),
        },
        _ => return Err("expected an integer literal".to_string()),
    };
    i32::try_from(wide).map_err(|_| "priority out of range".to_string())
}

fn literal_arg(expr: &Expr) -> Result<BindingArg, String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(BindingArg::Str(s.value())),
            Lit::Int(i) => Ok(BindingArg::Int(
                i.base10_parse::<i64>().map_err(|e| e.to_string())?,
            )),
            Lit::Float(f) => Ok(BindingArg::Float(
                f.base10_parse::<f64>().map_err(|e| e.to_string())?,
            )),
            Lit::Bool(b) => Ok(BindingArg::Bool(b.value)),
            _ => Err("binding args must be string, integer, float, or bool literals".to_string()),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            match literal_arg(&unary.expr)? {
                BindingArg::Int(v) => Ok(BindingArg::Int(-v)),
                BindingArg::Float(v) => Ok(BindingArg::Float(-v)),
                _ => Err("only numeric binding args may be negated".to_string()),
            }
        }
        _ => Err("binding args must be string, integer, float, or bool literals".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_intercept_all_keys() {
        let attr: syn::Attribute =
            parse_quote!(#[intercept(name = "Cache", priority = 10, args(60, "user", true))]);
        let plan = parse_intercept(&attr).unwrap();
        assert_eq!(plan.name, "Cache");
        assert_eq!(plan.priority, 10);
        assert_eq!(
            plan.args,
            vec![
                BindingArg::Int(60),
                BindingArg::Str("user".into()),
                BindingArg::Bool(true),
            ]
        );
    }

    #[test]
    fn test_parse_intercept_priority_defaults_to_zero() {
        let attr: syn::Attribute = parse_quote!(#[intercept(name = "Audit")]);
        let plan = parse_intercept(&attr).unwrap();
        assert_eq!(plan.priority, 0);
        assert!(plan.args.is_empty());
    }

    #[test]
    fn test_parse_intercept_negative_literals() {
        let attr: syn::Attribute =
            parse_quote!(#[intercept(name = "Clamp", priority = -5, args(-3, -2.5))]);
        let plan = parse_intercept(&attr).unwrap();
        assert_eq!(plan.priority, -5);
        assert_eq!(plan.args, vec![BindingArg::Int(-3), BindingArg::Float(-2.5)]);
    }

    #[test]
    fn test_parse_intercept_missing_name_rejected() {
        let attr: syn::Attribute = parse_quote!(#[intercept(priority = 1)]);
        let err = parse_intercept(&attr).unwrap_err();
        assert!(err.contains("name"));
    }

    #[test]
    fn test_parse_intercept_unknown_key_rejected() {
        let attr: syn::Attribute = parse_quote!(#[intercept(name = "A", weight = 2)]);
        let err = parse_intercept(&attr).unwrap_err();
        assert!(err.contains("weight"));
    }

    #[test]
    fn test_parse_intercept_named_args_rejected() {
        let attr: syn::Attribute = parse_quote!(#[intercept(name = "Cache", args(ttl = 60))]);
        assert!(parse_intercept(&attr).is_err());
    }

    #[test]
    fn test_parse_intercept_non_literal_arg_rejected() {
        let attr: syn::Attribute = parse_quote!(#[intercept(name = "Cache", args(ttl()))]);
        assert!(parse_intercept(&attr).is_err());
    }

    #[test]
    fn test_parse_transactional_bare() {
        let attr: syn::Attribute = parse_quote!(#[transactional]);
        let plan = parse_transactional(&attr).unwrap();
        assert_eq!(plan.priority, None);
    }

    #[test]
    fn test_parse_transactional_priority() {
        let attr: syn::Attribute = parse_quote!(#[transactional(priority = 7)]);
        let plan = parse_transactional(&attr).unwrap();
        assert_eq!(plan.priority, Some(7));
    }

    #[test]
    fn test_parse_transactional_unknown_key_rejected() {
        let attr: syn::Attribute = parse_quote!(#[transactional(mode = "strict")]);
        assert!(parse_transactional(&attr).is_err());
    }

    #[test]
    fn test_collect_bindings_keeps_declaration_order() {
        let attrs: Vec<syn::Attribute> = vec![
            parse_quote!(#[intercept(name = "RateLimit", priority = 20)]),
            parse_quote!(#[intercept(name = "Audit", priority = 5)]),
            parse_quote!(#[transactional]),
        ];
        let bindings = collect_bindings(&attrs).unwrap();
        assert!(bindings.qualifies());
        assert_eq!(bindings.bindings[0].name, "RateLimit");
        assert_eq!(bindings.bindings[1].name, "Audit");
        assert!(bindings.transactional.is_some());
    }

    #[test]
    fn test_collect_bindings_duplicate_transactional_rejected() {
        let attrs: Vec<syn::Attribute> = vec![
            parse_quote!(#[transactional]),
            parse_quote!(#[transactional(priority = 1)]),
        ];
        let err = collect_bindings(&attrs).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_collect_bindings_ignores_foreign_attrs() {
        let attrs: Vec<syn::Attribute> = vec![
            parse_quote!(#[allow(dead_code)]),
            parse_quote!(#[doc = "plain method"]),
        ];
        let bindings = collect_bindings(&attrs).unwrap();
        assert!(!bindings.qualifies());
    }

    #[test]
    fn test_binding_attr_detection_path_qualified() {
        let attr: syn::Attribute = parse_quote!(#[arachne_macros::intercept(name = "A")]);
        assert!(is_intercept_attr(&attr));
        assert!(is_binding_attr(&attr));
    }

    #[test]
    fn test_return_shape_unit_forms() {
        assert!(matches!(
            return_shape(&parse_quote!(-> ())).unwrap(),
            ReturnShape::Unit
        ));
        assert!(matches!(
            return_shape(&syn::ReturnType::Default).unwrap(),
            ReturnShape::Unit
        ));
    }

    #[test]
    fn test_return_shape_result() {
        let shape = return_shape(&parse_quote!(-> Result<u64, BillingError>)).unwrap();
        let ReturnShape::Result { ok, err } = shape else {
            panic!("expected result shape");
        };
        assert_eq!(quote::quote!(#ok).to_string(), "u64");
        assert_eq!(quote::quote!(#err).to_string(), "BillingError");
    }

    #[test]
    fn test_return_shape_qualified_result() {
        let shape = return_shape(&parse_quote!(-> std::result::Result<u64, E>)).unwrap();
        assert!(matches!(shape, ReturnShape::Result { .. }));
    }

    #[test]
    fn test_return_shape_plain_value() {
        let shape = return_shape(&parse_quote!(-> Vec<String>)).unwrap();
        assert!(matches!(shape, ReturnShape::Value(_)));
        assert!(shape.returns_value());
    }

    #[test]
    fn test_return_shape_single_param_result_rejected() {
        let err = return_shape(&parse_quote!(-> Result<u64>)).unwrap_err();
        assert!(err.contains("both type parameters"));
    }

    #[test]
    fn test_method_shape_ref_receiver() {
        let sig: syn::Signature = parse_quote!(async fn total(&self, amount: u64) -> u64);
        let shape = method_shape(&sig).unwrap();
        assert_eq!(shape.receiver, ReceiverKind::Ref);
        assert_eq!(shape.arity(), 1);
        assert_eq!(shape.arg_names[0], "amount");
    }

    #[test]
    fn test_method_shape_static() {
        let sig: syn::Signature = parse_quote!(async fn flat_rate() -> u64);
        let shape = method_shape(&sig).unwrap();
        assert!(shape.is_static());
        assert_eq!(shape.arity(), 0);
    }

    #[test]
    fn test_method_shape_owned_receiver_allowed() {
        let sig: syn::Signature = parse_quote!(async fn consume(self) -> u64);
        let shape = method_shape(&sig).unwrap();
        assert_eq!(shape.receiver, ReceiverKind::Owned);
    }

    #[test]
    fn test_method_shape_rejects_sync() {
        let sig: syn::Signature = parse_quote!(fn total(&self) -> u64);
        let err = method_shape(&sig).unwrap_err();
        assert!(err.contains("async"));
    }

    #[test]
    fn test_method_shape_rejects_mut_receiver() {
        let sig: syn::Signature = parse_quote!(async fn bump(&mut self));
        let err = method_shape(&sig).unwrap_err();
        assert!(err.contains("&mut self"));
    }

    #[test]
    fn test_method_shape_rejects_generics() {
        let sig: syn::Signature = parse_quote!(async fn find<T: Clone>(&self, key: T));
        let err = method_shape(&sig).unwrap_err();
        assert!(err.contains("generic"));
    }

    #[test]
    fn test_method_shape_rejects_reference_param() {
        let sig: syn::Signature = parse_quote!(async fn find(&self, name: &str));
        let err = method_shape(&sig).unwrap_err();
        assert!(err.contains("owned"));
    }

    #[test]
    fn test_method_shape_rejects_nested_borrow() {
        let sig: syn::Signature = parse_quote!(async fn find(&self, names: Vec<&'static str>));
        assert!(method_shape(&sig).is_err());
    }

    #[test]
    fn test_method_shape_rejects_pattern_param() {
        let sig: syn::Signature = parse_quote!(async fn add(&self, (a, b): (u64, u64)));
        let err = method_shape(&sig).unwrap_err();
        assert!(err.contains("identifiers"));
    }

    #[test]
    fn test_is_constructor() {
        let new_self: syn::Signature = parse_quote!(fn new(limit: u64) -> Self);
        assert!(is_constructor(&new_self, "Invoices"));

        let new_named: syn::Signature = parse_quote!(fn new() -> Invoices);
        assert!(is_constructor(&new_named, "Invoices"));

        let new_other: syn::Signature = parse_quote!(fn new() -> u64);
        assert!(!is_constructor(&new_other, "Invoices"));

        let not_new: syn::Signature = parse_quote!(fn create() -> Self);
        assert!(!is_constructor(&not_new, "Invoices"));
    }
}
