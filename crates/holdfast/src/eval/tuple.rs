//! Tuple literal evaluation

use crate::heap::HeapObject;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprTuple {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        eval_tuple(self, env, rt)
    }
}

/// Evaluate a tuple literal expression.
///
/// `()` is the unit value; every other tuple is an immutable heap object.
///
/// # Errors
///
/// Returns errors from evaluating tuple elements.
pub fn eval_tuple(
    tuple: &syn::ExprTuple,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    if tuple.elems.is_empty() {
        return Ok(Value::Unit);
    }

    let mut elements = Vec::with_capacity(tuple.elems.len());
    for elem in &tuple.elems {
        elements.push(elem.eval(env, rt)?);
    }

    Ok(rt.alloc(HeapObject::Tuple(elements)))
}
