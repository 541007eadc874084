//! Parsing for interception attributes.
//!
//! The weaver reads the same grammar back out of source files with its own
//! parser; this module is the compile-time validation of it.

use proc_macro2::TokenStream;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Expr, ExprLit, ExprUnary, Lit, Meta, Token, UnOp,
};

/// A literal construction argument in an `args(...)` list.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingLiteral {
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
}

/// Parsed `#[intercept(...)]` attribute contents.
#[derive(Debug)]
pub struct InterceptAttrs {
    /// Interceptor type identifier.
    pub name: String,
    /// Chain ordering; higher runs first.
    pub priority: i32,
    /// Literal construction arguments, in declaration order.
    pub args: Vec<BindingLiteral>,
}

impl Parse for InterceptAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut priority = None;
        let mut args = Vec::new();

        let meta_list: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;
        for meta in meta_list {
            match &meta {
                Meta::NameValue(nv) => {
                    let ident = nv
                        .path
                        .get_ident()
                        .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))?
                        .to_string();
                    match ident.as_str() {
                        "name" => name = Some(str_value(&nv.value)?),
                        "priority" => priority = Some(int_value(&nv.value)?),
                        _ => {
                            return Err(syn::Error::new(
                                nv.path.span(),
                                format!("unknown attribute: {ident}"),
                            ))
                        }
                    }
                }
                Meta::List(list) if list.path.is_ident("args") => {
                    let exprs: Punctuated<Expr, Token![,]> =
                        list.parse_args_with(Punctuated::parse_terminated)?;
                    for expr in &exprs {
                        args.push(literal_value(expr)?);
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        meta.span(),
                        "expected `name = \"...\"`, `priority = N`, or `args(...)`",
                    ))
                }
            }
        }

        let name = name.ok_or_else(|| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "missing required attribute: name",
            )
        })?;

        Ok(Self {
            name,
            priority: priority.unwrap_or(0),
            args,
        })
    }
}

/// Parsed `#[transactional]` attribute contents.
#[derive(Debug)]
pub struct TransactionalAttrs {
    /// Optional priority override for the wrapper binding.
    pub priority: Option<i32>,
}

impl Parse for TransactionalAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(Self { priority: None });
        }

        let mut priority = None;
        let meta_list: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;
        for meta in meta_list {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("priority") => {
                    priority = Some(int_value(&nv.value)?);
                }
                _ => return Err(syn::Error::new(meta.span(), "expected `priority = N`")),
            }
        }
        Ok(Self { priority })
    }
}

/// Validates an `#[intercept(...)]` attribute and re-emits the method
/// unchanged.
pub fn expand_intercept(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let _attrs: InterceptAttrs = syn::parse2(attr)?;
    let _method: syn::ImplItemFn = syn::parse2(item.clone())?;
    Ok(item)
}

/// Validates a `#[transactional]` attribute and re-emits the method
/// unchanged.
pub fn expand_transactional(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let _attrs: TransactionalAttrs = syn::parse2(attr)?;
    let _method: syn::ImplItemFn = syn::parse2(item.clone())?;
    Ok(item)
}

fn str_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

fn int_value(expr: &Expr) -> syn::Result<i32> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(i), ..
        }) => i.base10_parse(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr: inner,
            ..
        }) => match &**inner {
            Expr::Lit(ExprLit {
                lit: Lit::Int(i), ..
            }) => {
                let negated = -i.base10_parse::<i64>()?;
                i32::try_from(negated)
                    .map_err(|_| syn::Error::new(expr.span(), "priority out of range"))
            }
            _ => Err(syn::Error::new(expr.span(), "expected integer literal")),
        },
        _ => Err(syn::Error::new(expr.span(), "expected integer literal")),
    }
}

fn literal_value(expr: &Expr) -> syn::Result<BindingLiteral> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Str(s) => Ok(BindingLiteral::Str(s.value())),
            Lit::Int(i) => Ok(BindingLiteral::Int(i.base10_parse()?)),
            Lit::Float(f) => Ok(BindingLiteral::Float(f.base10_parse()?)),
            Lit::Bool(b) => Ok(BindingLiteral::Bool(b.value)),
            _ => Err(syn::Error::new(lit.span(), "unsupported literal type")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr: inner,
            ..
        }) => match literal_value(inner)? {
            BindingLiteral::Int(v) => Ok(BindingLiteral::Int(-v)),
            BindingLiteral::Float(v) => Ok(BindingLiteral::Float(-v)),
            _ => Err(syn::Error::new(expr.span(), "cannot negate this literal")),
        },
        _ => Err(syn::Error::new(expr.span(), "expected a literal argument")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn test_parse_intercept_attrs() {
        let attrs: InterceptAttrs =
            syn::parse_quote!(name = "RateLimit", priority = 10, args(60, "user"));
        assert_eq!(attrs.name, "RateLimit");
        assert_eq!(attrs.priority, 10);
        assert_eq!(
            attrs.args,
            vec![BindingLiteral::Int(60), BindingLiteral::Str("user".into())]
        );
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        let attrs: InterceptAttrs = syn::parse_quote!(name = "Audit");
        assert_eq!(attrs.priority, 0);
        assert!(attrs.args.is_empty());
    }

    #[test]
    fn test_negative_priority() {
        let attrs: InterceptAttrs = syn::parse_quote!(name = "Audit", priority = -5);
        assert_eq!(attrs.priority, -5);
    }

    #[test]
    fn test_mixed_literal_args() {
        let attrs: InterceptAttrs = syn::parse_quote!(name = "Cache", args(2.5, true, -3));
        assert_eq!(
            attrs.args,
            vec![
                BindingLiteral::Float(2.5),
                BindingLiteral::Bool(true),
                BindingLiteral::Int(-3),
            ]
        );
    }

    #[test]
    fn test_missing_name_rejected() {
        let result: syn::Result<InterceptAttrs> = syn::parse2(quote!(priority = 10));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: syn::Result<InterceptAttrs> = syn::parse2(quote!(name = "X", weight = 3));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_transactional_bare() {
        let attrs: TransactionalAttrs = syn::parse2(quote!()).unwrap();
        assert!(attrs.priority.is_none());
    }

    #[test]
    fn test_parse_transactional_with_priority() {
        let attrs: TransactionalAttrs = syn::parse_quote!(priority = 7);
        assert_eq!(attrs.priority, Some(7));
    }

    #[test]
    fn test_expand_intercept_re_emits_method_unchanged() {
        let item = quote! {
            pub async fn transfer(&self, amount: u64) -> Result<u64, TransferError> {
                self.ledger.apply(amount).await
            }
        };
        let out = expand_intercept(quote!(name = "Audit"), item.clone()).unwrap();
        assert_eq!(out.to_string(), item.to_string());
    }

    #[test]
    fn test_expand_intercept_rejects_malformed_attr() {
        let item = quote! {
            pub async fn transfer(&self) {}
        };
        assert!(expand_intercept(quote!(name = 42), item).is_err());
    }

    #[test]
    fn test_expand_transactional_re_emits_method_unchanged() {
        let item = quote! {
            async fn settle(&self) -> Result<(), SettleError> {
                Ok(())
            }
        };
        let out = expand_transactional(quote!(), item.clone()).unwrap();
        assert_eq!(out.to_string(), item.to_string());
    }
}
