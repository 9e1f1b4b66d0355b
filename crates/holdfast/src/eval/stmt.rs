//! Statement evaluation

use crate::{Environment, EvalError, Runtime, Value};

use super::item::eval_item;
use super::local::eval_local;
use super::macros;
use super::Evaluate;

/// Evaluate a statement.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_stmt(stmt: &syn::Stmt, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    match stmt {
        // Expression without semicolon: value is returned
        syn::Stmt::Expr(expr, None) => expr.eval(env, rt),

        // Expression with semicolon: evaluate for side effects, return unit
        syn::Stmt::Expr(expr, Some(_)) => {
            expr.eval(env, rt)?;
            Ok(Value::Unit)
        }

        syn::Stmt::Local(local) => {
            eval_local(local, env, rt)?;
            Ok(Value::Unit)
        }

        // Item (fn, struct, const, ...) in block
        syn::Stmt::Item(item) => {
            eval_item(item, env, rt)?;
            Ok(Value::Unit)
        }

        // Brace-delimited macro in statement position
        syn::Stmt::Macro(stmt_macro) => {
            let value = macros::eval_macro(&stmt_macro.mac, env, rt)?;
            Ok(if stmt_macro.semi_token.is_some() {
                Value::Unit
            } else {
                value
            })
        }
    }
}

/// Evaluate a block in a fresh scope.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_block(block: &syn::Block, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    let mut scope = env.scope_guard();
    eval_block_stmts(&block.stmts, &mut scope, rt)
}

/// Evaluate statements within a block (without managing scope).
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_block_stmts(
    stmts: &[syn::Stmt],
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let mut last_value = Value::Unit;

    for stmt in stmts {
        if rt.context().is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        last_value = eval_stmt(stmt, env, rt)?;
    }

    Ok(last_value)
}
