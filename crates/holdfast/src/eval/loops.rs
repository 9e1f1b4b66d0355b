//! Loop expression evaluation
//!
//! `loop`, `while`, and `for` all run their body in a fresh scope per
//! iteration and interpret its outcome with [`loop_step`].

use syn::spanned::Spanned;

use crate::heap::HeapObject;
use crate::{Environment, EvalError, Runtime, Value};

use super::control::{loop_step, ControlFlow, LoopStep};
use super::if_expr::eval_condition;
use super::local::bind_pattern;
use super::{eval_block, Evaluate};

fn label_name(label: &Option<syn::Label>) -> Option<String> {
    label.as_ref().map(|l| l.name.ident.to_string())
}

fn check_interrupt(rt: &Runtime) -> Result<(), EvalError> {
    if rt.context().is_interrupted() {
        return Err(EvalError::Interrupted);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// loop / while
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprLoop {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let label = label_name(&self.label);
        loop {
            check_interrupt(rt)?;
            if let LoopStep::Exit(value) = loop_step(eval_block(&self.body, env, rt), label.as_deref())? {
                return Ok(value);
            }
        }
    }
}

impl Evaluate for syn::ExprWhile {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let label = label_name(&self.label);
        while eval_condition(&self.cond, "while", env, rt)? {
            check_interrupt(rt)?;
            if let LoopStep::Exit(_) = loop_step(eval_block(&self.body, env, rt), label.as_deref())? {
                break;
            }
        }
        Ok(Value::Unit)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// for
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprForLoop {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let label = label_name(&self.label);
        let run = |item: Value, env: &mut Environment| -> Result<bool, EvalError> {
            check_interrupt(rt)?;
            let mut scope = env.scope_guard();
            bind_pattern(&self.pat, item, &mut scope, rt)?;
            let step = loop_step(eval_block(&self.body, &mut scope, rt), label.as_deref())?;
            Ok(matches!(step, LoopStep::Next))
        };

        if let Some(range) = as_range(&self.expr) {
            let (start, end) = range_bounds(range, env, rt)?;
            let mut i = start;
            while i < end {
                if !run(Value::I64(i), env)? {
                    break;
                }
                i += 1;
            }
            return Ok(Value::Unit);
        }

        let iterable = self.expr.eval(env, rt)?;
        for item in snapshot_items(rt, &iterable).map_err(|e| e.with_span(Some(self.expr.span())))? {
            if !run(item, env)? {
                break;
            }
        }
        Ok(Value::Unit)
    }
}

fn as_range(expr: &syn::Expr) -> Option<&syn::ExprRange> {
    match expr {
        syn::Expr::Range(range) => Some(range),
        syn::Expr::Paren(paren) => as_range(&paren.expr),
        syn::Expr::Group(group) => as_range(&group.expr),
        _ => None,
    }
}

/// Evaluate `a..b` or `a..=b` to a half-open `[start, end)` pair.
fn range_bounds(
    range: &syn::ExprRange,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<(i64, i64), EvalError> {
    let (Some(start), Some(end)) = (&range.start, &range.end) else {
        return Err(EvalError::UnsupportedExpr {
            kind: "unbounded range".to_string(),
            span: Some(range.span()),
        });
    };
    let bound = |expr: &syn::Expr, env: &mut Environment| -> Result<i64, EvalError> {
        let value = expr.eval(env, rt)?;
        value.as_i64().ok_or_else(|| EvalError::TypeError {
            message: format!("range bound must be an integer, got {}", rt.type_name_of(&value)),
            span: Some(expr.span()),
        })
    };
    let start = bound(start, env)?;
    let end = bound(end, env)?;
    let end = match range.limits {
        syn::RangeLimits::HalfOpen(_) => end,
        syn::RangeLimits::Closed(_) => end.checked_add(1).ok_or(EvalError::IntegerOverflow {
            span: Some(range.span()),
        })?,
    };
    Ok((start, end))
}

/// The items a `for` loop visits, copied up front so the body may mutate
/// the collection.
fn snapshot_items(rt: &Runtime, iterable: &Value) -> Result<Vec<Value>, EvalError> {
    match iterable {
        Value::Object(id) => rt.with_object(*id, |obj| match obj {
            HeapObject::Array(items) | HeapObject::Tuple(items) => Ok(items.clone()),
            HeapObject::Dict(map) => Ok(map.keys().map(|k| k.value().clone()).collect()),
            HeapObject::Struct(s) => Err(not_iterable(&s.type_name)),
        }),
        Value::String(s) => Ok(s.chars().map(Value::Char).collect()),
        other => Err(not_iterable(&rt.type_name_of(other))),
    }
}

fn not_iterable(type_name: &str) -> EvalError {
    EvalError::TypeError {
        message: format!("{} is not iterable", type_name),
        span: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// break / continue
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprBreak {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let value = match &self.expr {
            Some(expr) => expr.eval(env, rt)?,
            None => Value::Unit,
        };
        Err(EvalError::ControlFlow(ControlFlow::Break {
            value,
            label: self.label.as_ref().map(|l| l.ident.to_string()),
        }))
    }
}

impl Evaluate for syn::ExprContinue {
    fn eval(&self, _env: &mut Environment, _rt: &Runtime) -> Result<Value, EvalError> {
        Err(EvalError::ControlFlow(ControlFlow::Continue {
            label: self.label.as_ref().map(|l| l.ident.to_string()),
        }))
    }
}
