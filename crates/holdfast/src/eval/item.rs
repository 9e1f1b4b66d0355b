//! Item evaluation: `fn`, `const`, `static`, and `struct`
//!
//! At global scope functions, constants, and statics become runtime
//! globals; inside a block they are locals of that block.

use std::sync::Arc;

use syn::spanned::Spanned;

use crate::value::StructDecl;
use crate::{BindingMode, Environment, EvalError, Runtime, Value};

use super::function::function_from_item;
use super::Evaluate;

/// Evaluate an item statement.
///
/// # Errors
///
/// Returns `UnsupportedExpr` for item kinds the runtime does not model,
/// and binding errors such as redefining a constant.
pub fn eval_item(item: &syn::Item, env: &mut Environment, rt: &Runtime) -> Result<(), EvalError> {
    match item {
        syn::Item::Fn(item_fn) => {
            let func = function_from_item(item_fn)?;
            let ident = &item_fn.sig.ident;
            // ALLOW: syn::Block is just AST data, but clippy can't verify
            // Send + Sync automatically
            #[allow(clippy::arc_with_non_send_sync)]
            let value = Value::Function(Arc::new(func));
            bind(ident, value, BindingMode::Immutable, env, rt)
        }

        syn::Item::Const(item_const) => {
            let value = item_const.expr.eval(env, rt)?;
            bind(&item_const.ident, value, BindingMode::Constant, env, rt)
        }

        syn::Item::Static(item_static) => {
            let value = item_static.expr.eval(env, rt)?;
            let mode = match item_static.mutability {
                syn::StaticMutability::Mut(_) => BindingMode::Mutable,
                _ => BindingMode::Immutable,
            };
            bind(&item_static.ident, value, mode, env, rt)
        }

        syn::Item::Struct(item_struct) => {
            let decl = StructDecl::from_item(item_struct).ok_or_else(|| {
                EvalError::UnsupportedExpr {
                    kind: "tuple or unit struct".to_string(),
                    span: Some(item_struct.ident.span()),
                }
            })?;
            rt.define_struct(decl);
            Ok(())
        }

        // No runtime effect
        syn::Item::Type(_) | syn::Item::Use(_) => Ok(()),

        other => Err(EvalError::UnsupportedExpr {
            kind: item_kind_name(other).to_string(),
            span: Some(other.span()),
        }),
    }
}

fn bind(
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

fn item_kind_name(item: &syn::Item) -> &'static str {
    match item {
        syn::Item::Enum(_) => "enum definition",
        syn::Item::Impl(_) => "impl block",
        syn::Item::Mod(_) => "module definition",
        syn::Item::Trait(_) => "trait definition",
        syn::Item::Union(_) => "union definition",
        syn::Item::Macro(_) => "macro definition",
        _ => "item",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_items() {
        let rt = Runtime::new();
        rt.eval_string("fn f() -> i64 { 1 }\nconst C: i64 = 2;\nstatic S: i64 = 3;\nstatic mut M: i64 = 4;")
            .unwrap();
        assert!(matches!(rt.get_global("f"), Some(Value::Function(_))));
        assert_eq!(rt.binding_mode("f"), Some(BindingMode::Immutable));
        assert_eq!(rt.binding_mode("C"), Some(BindingMode::Constant));
        assert_eq!(rt.binding_mode("S"), Some(BindingMode::Immutable));
        assert_eq!(rt.binding_mode("M"), Some(BindingMode::Mutable));
    }

    #[test]
    fn test_nested_items_are_local() {
        let rt = Runtime::new();
        let value = rt.eval_string("fn outer() -> i64 { fn helper() -> i64 { 7 } helper() }\nouter()");
        assert_eq!(value, Some(Value::I64(7)));
        assert_eq!(rt.get_global("helper"), None);
    }

    #[test]
    fn test_constant_cannot_be_redefined() {
        let rt = Runtime::new();
        rt.eval_string("const LIMIT: i64 = 10;").unwrap();
        assert!(rt.eval_string("const LIMIT: i64 = 11;").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::ImmutableError)
        );
    }

    #[test]
    fn test_struct_declaration() {
        let rt = Runtime::new();
        rt.eval_string("struct P { x: i64 }").unwrap();
        assert_eq!(rt.struct_decl("P").map(|d| d.fields), Some(vec!["x".to_string()]));
        assert!(rt.eval_string("struct T(i64);").is_none());
        assert!(rt.eval_string("enum E { A }").is_none());
        rt.take_exception();
    }
}
