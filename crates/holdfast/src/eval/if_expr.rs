//! If expression evaluation

use super::{expr_span, stmt::eval_block, Evaluate};
use crate::error::type_name;
use crate::{Environment, EvalError, Runtime, Value};

impl Evaluate for syn::ExprIf {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        if eval_condition(&self.cond, "if", env, rt)? {
            eval_block(&self.then_branch, env, rt)
        } else if let Some((_, else_branch)) = &self.else_branch {
            // `else { .. }` or `else if ..`
            else_branch.eval(env, rt)
        } else {
            Ok(Value::Unit)
        }
    }
}

/// Evaluate a condition that must produce a `bool`.
pub(crate) fn eval_condition(
    cond: &syn::Expr,
    construct: &str,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<bool, EvalError> {
    match cond.eval(env, rt)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::TypeError {
            message: format!(
                "expected `bool` in {} condition, found `{}`",
                construct,
                type_name(&other)
            ),
            span: Some(expr_span(cond)),
        }),
    }
}
