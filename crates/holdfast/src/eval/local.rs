//! Local binding (let statement) evaluation
//!
//! At global scope `let` defines a runtime global; everywhere else it
//! defines a local in the current frame.

use syn::spanned::Spanned;

use crate::heap::HeapObject;
use crate::{BindingMode, Environment, EvalError, Runtime, Value};

use super::Evaluate;

/// Evaluate a local (let) binding.
///
/// # Errors
///
/// Returns an error if the initializer fails, the pattern is not supported,
/// or the value does not destructure into the pattern.
pub fn eval_local(local: &syn::Local, env: &mut Environment, rt: &Runtime) -> Result<(), EvalError> {
    let value = match &local.init {
        Some(init) if init.diverge.is_some() => {
            return Err(EvalError::UnsupportedExpr {
                kind: "let-else".to_string(),
                span: Some(local.let_token.span),
            })
        }
        Some(init) => init.expr.eval(env, rt)?,
        None => Value::Unit,
    };

    bind_pattern(&local.pat, value, env, rt)
}

/// Bind `value` to an irrefutable pattern.
///
/// Supports identifiers (with `mut`), type ascriptions, `_`, and tuple
/// patterns over tuples and arrays.
pub(crate) fn bind_pattern(
    pat: &syn::Pat,
    value: Value,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<(), EvalError> {
    match pat {
        syn::Pat::Ident(pat_ident) => {
            if let Some((_, sub)) = &pat_ident.subpat {
                return Err(EvalError::UnsupportedExpr {
                    kind: "binding with subpattern".to_string(),
                    span: Some(sub.span()),
                });
            }
            let mode = if pat_ident.mutability.is_some() {
                BindingMode::Mutable
            } else {
                BindingMode::Immutable
            };
            define(&pat_ident.ident, value, mode, env, rt)
        }

        syn::Pat::Type(pat_type) => bind_pattern(&pat_type.pat, value, env, rt),

        syn::Pat::Wild(_) => Ok(()),

        syn::Pat::Tuple(pat_tuple) => {
            let items = destructure(&value, rt)?;
            if items.len() != pat_tuple.elems.len() {
                return Err(EvalError::TypeError {
                    message: format!(
                        "cannot destructure {} elements into a pattern of {}",
                        items.len(),
                        pat_tuple.elems.len()
                    ),
                    span: Some(pat_tuple.span()),
                });
            }
            for (sub, item) in pat_tuple.elems.iter().zip(items) {
                bind_pattern(sub, item, env, rt)?;
            }
            Ok(())
        }

        other => Err(EvalError::UnsupportedExpr {
            kind: "pattern".to_string(),
            span: Some(other.span()),
        }),
    }
}

fn define(
    ident: &syn::Ident,
    value: Value,
    mode: BindingMode,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<(), EvalError> {
    let name = ident.to_string();
    if env.is_global_scope() {
        rt.define_global_checked(&name, value, mode, Some(ident.span()))
            .map_err(|e| e.with_span(Some(ident.span())))
    } else {
        env.define_with_span(name, value, mode, ident.span());
        Ok(())
    }
}

fn destructure(value: &Value, rt: &Runtime) -> Result<Vec<Value>, EvalError> {
    let not_a_sequence = || EvalError::TypeError {
        message: format!("cannot destructure {}", rt.type_name_of(value)),
        span: None,
    };
    match value {
        Value::Object(id) => rt.with_object(*id, |obj| match obj {
            HeapObject::Tuple(items) | HeapObject::Array(items) => Ok(items.clone()),
            _ => Err(not_a_sequence()),
        }),
        Value::Unit => Ok(Vec::new()),
        _ => Err(not_a_sequence()),
    }
}
