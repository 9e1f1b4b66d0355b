//! Function definition evaluation

use syn::spanned::Spanned;

use crate::value::Param;
use crate::{EvalError, FunctionValue};

/// Extract a FunctionValue from a syn::ItemFn.
///
/// Parameter types are checked by the parser only; at runtime a parameter is
/// a name and a mutability flag.
///
/// # Errors
///
/// Returns `UnsupportedExpr` for `self` receivers and destructuring parameters.
pub fn function_from_item(item_fn: &syn::ItemFn) -> Result<FunctionValue, EvalError> {
    let name = item_fn.sig.ident.to_string();
    let params = extract_params(&item_fn.sig)?;
    let body = item_fn.block.as_ref().clone();

    Ok(FunctionValue::new(name, params, body))
}

fn extract_params(sig: &syn::Signature) -> Result<Vec<Param>, EvalError> {
    sig.inputs
        .iter()
        .map(|input| match input {
            syn::FnArg::Typed(pat_type) => extract_param(&pat_type.pat),
            syn::FnArg::Receiver(receiver) => Err(EvalError::UnsupportedExpr {
                kind: "self parameter".to_string(),
                span: Some(receiver.span()),
            }),
        })
        .collect()
}

fn extract_param(pat: &syn::Pat) -> Result<Param, EvalError> {
    match pat {
        syn::Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => Ok(Param {
            name: pat_ident.ident.to_string(),
            mutable: pat_ident.mutability.is_some(),
        }),
        syn::Pat::Wild(_) => Ok(Param {
            name: "_".to_string(),
            mutable: false,
        }),
        syn::Pat::Reference(pat_ref) => extract_param(&pat_ref.pat),
        _ => Err(EvalError::UnsupportedExpr {
            kind: "destructuring parameter".to_string(),
            span: Some(pat.span()),
        }),
    }
}
