//! Assignment expression evaluation
//!
//! Any place expression can be assigned: `x = v`, `a[i] = v`, `p.f = v`,
//! and chains like `r.items[2].x = v`. Writing through a container requires
//! the binding at the root of the place to be mutable, mirroring `let mut`.

use syn::spanned::Spanned;

use crate::{BindingMode, Environment, EvalError, Runtime, Value};

use super::field::{member_name, set_field};
use super::index::set_index;
use super::path::simple_name;
use super::Evaluate;

/// Evaluate an assignment expression. Assignments evaluate to `()`.
pub fn eval_assign(
    assign: &syn::ExprAssign,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let value = assign.right.eval(env, rt)?;
    assign_place(&assign.left, value, env, rt)?;
    Ok(Value::Unit)
}

/// Store `value` into the place denoted by `target`.
pub(crate) fn assign_place(
    target: &syn::Expr,
    value: Value,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<(), EvalError> {
    let span = Some(target.span());
    match target {
        syn::Expr::Path(path) => {
            let name = simple_name(&path.path)?;
            if env.contains(&name) {
                env.assign(&name, value)
                    .map_err(|e| EvalError::from(e).with_span(span))
            } else {
                rt.assign_global_checked(&name, value)
                    .map_err(|e| e.with_span(span))
            }
        }

        syn::Expr::Index(index) => {
            check_root_mutable(&index.expr, env, rt)?;
            let container = index.expr.eval(env, rt)?;
            let key = index.index.eval(env, rt)?;
            set_index(rt, &container, key, value).map_err(|e| e.with_span(span))
        }

        syn::Expr::Field(field) => {
            check_root_mutable(&field.base, env, rt)?;
            let base = field.base.eval(env, rt)?;
            set_field(rt, &base, &member_name(&field.member), value)
                .map_err(|e| e.with_span(span))
        }

        syn::Expr::Paren(paren) => assign_place(&paren.expr, value, env, rt),
        syn::Expr::Group(group) => assign_place(&group.expr, value, env, rt),

        _ => Err(EvalError::InvalidAssignTarget {
            kind: "expression is not assignable".to_string(),
            span,
        }),
    }
}

/// Walk a place expression down to its root variable and require that
/// variable to be a mutable binding.
///
/// Places rooted in a temporary (`f().x = 1`) are allowed; whether the
/// container itself accepts the write is checked when it is written.
fn check_root_mutable(place: &syn::Expr, env: &Environment, rt: &Runtime) -> Result<(), EvalError> {
    match place {
        syn::Expr::Index(index) => check_root_mutable(&index.expr, env, rt),
        syn::Expr::Field(field) => check_root_mutable(&field.base, env, rt),
        syn::Expr::Paren(paren) => check_root_mutable(&paren.expr, env, rt),
        syn::Expr::Group(group) => check_root_mutable(&group.expr, env, rt),
        syn::Expr::Path(path) => {
            let name = simple_name(&path.path)?;
            let span = Some(path.span());
            let mode = match env.get_binding(&name) {
                Some(binding) => Some(binding.mode),
                None => rt.binding_mode(&name),
            };
            match mode {
                Some(BindingMode::Mutable) => Ok(()),
                Some(_) => Err(EvalError::ImmutableBinding { name, span }),
                None => Err(EvalError::UndefinedVariable { name, span }),
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionKind;
    use pretty_assertions::assert_eq;

    fn fails_with(rt: &Runtime, src: &str) -> ExceptionKind {
        assert!(rt.eval_string(src).is_none(), "expected `{}` to fail", src);
        rt.take_exception().map(|e| e.kind).unwrap()
    }

    #[test]
    fn test_assign_local_and_global() {
        let rt = Runtime::new();
        rt.eval_string("let mut g = 1;").unwrap();
        let value = rt
            .eval_string("fn f() { let mut l = 1; l = 10; g = 20; l }\nf()")
            .unwrap();
        assert_eq!(value, Value::I64(10));
        assert_eq!(rt.get_global("g"), Some(Value::I64(20)));
    }

    #[test]
    fn test_nested_place() {
        let rt = Runtime::new();
        let src = "struct Node { items: i64 }\n\
                   let mut r = vec![Node { items: 1 }, Node { items: 2 }];\n\
                   r[1].items = 42;\n\
                   r[1].items";
        assert_eq!(rt.eval_string(src), Some(Value::I64(42)));
    }

    #[test]
    fn test_write_through_immutable_root() {
        let rt = Runtime::new();
        rt.eval_string("let v = vec![1, 2];").unwrap();
        assert_eq!(fails_with(&rt, "v[0] = 5"), ExceptionKind::ImmutableError);
        assert_eq!(rt.eval_string("v[0]"), Some(Value::I64(1)));
    }

    #[test]
    fn test_write_into_tuple_and_frozen_struct() {
        let rt = Runtime::new();
        rt.eval_string("#[frozen]\nstruct P { x: i64 }\nlet mut t = (1, 2); let mut p = P { x: 1 };")
            .unwrap();
        assert_eq!(fails_with(&rt, "t.0 = 5"), ExceptionKind::ImmutableError);
        assert_eq!(fails_with(&rt, "p.x = 5"), ExceptionKind::ImmutableError);
    }

    #[test]
    fn test_invalid_target() {
        let rt = Runtime::new();
        assert_eq!(fails_with(&rt, "1 = 2"), ExceptionKind::UnsupportedError);
        assert_eq!(fails_with(&rt, "nope = 2"), ExceptionKind::UndefVarError);
    }
}
