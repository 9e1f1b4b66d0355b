//! Array literal evaluation

use proc_macro2::Span;
use syn::spanned::Spanned;

use crate::heap::HeapObject;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprArray {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        eval_array(self, env, rt)
    }
}

impl Evaluate for syn::ExprRepeat {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        eval_array_repeat(self, env, rt)
    }
}

/// Evaluate an array literal expression: `[1, 2, 3]`.
///
/// # Errors
///
/// Returns errors from evaluating array elements.
pub fn eval_array(
    array: &syn::ExprArray,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let elements = array
        .elems
        .iter()
        .map(|elem| elem.eval(env, rt))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rt.alloc(HeapObject::Array(elements)))
}

/// Longest array a repeat expression may build.
pub const MAX_REPEAT_LEN: usize = 1 << 24;

/// Evaluate an array repeat expression `[value; count]`.
///
/// A container value is not copied: every element refers to the same object.
///
/// # Errors
///
/// Returns `TypeError` if count is not a non-negative integer, and
/// `BuiltinError` if the array cannot be allocated.
pub fn eval_array_repeat(
    repeat: &syn::ExprRepeat,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let value = repeat.expr.eval(env, rt)?;
    let count_val = repeat.len.eval(env, rt)?;
    let count = count_val.as_usize().ok_or_else(|| EvalError::TypeError {
        message: format!(
            "array repeat count must be a non-negative integer, got {:?}",
            count_val
        ),
        span: None,
    })?;

    let elements = repeat_elements(value, count, Some(repeat.len.span()))?;
    Ok(rt.alloc(HeapObject::Array(elements)))
}

/// Build `count` copies of `value`, refusing counts the host cannot hold.
pub(crate) fn repeat_elements(
    value: Value,
    count: usize,
    span: Option<Span>,
) -> Result<Vec<Value>, EvalError> {
    let too_large = |detail: String| EvalError::BuiltinError {
        name: "repeat".to_string(),
        message: format!("cannot allocate {} elements: {}", count, detail),
        span,
    };
    if count > MAX_REPEAT_LEN {
        return Err(too_large(format!("limit is {}", MAX_REPEAT_LEN)));
    }
    let mut elements = Vec::new();
    elements
        .try_reserve_exact(count)
        .map_err(|e| too_large(e.to_string()))?;
    elements.resize(count, value);
    Ok(elements)
}

/// Allocate an array from already evaluated elements.
pub(crate) fn alloc_array(rt: &Runtime, elements: Vec<Value>) -> Value {
    rt.alloc(HeapObject::Array(elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_literal_allocates() {
        let rt = Runtime::new();
        let value = rt.eval_string("[1, 2, 3]").unwrap();
        assert!(value.is_object());
        assert_eq!(rt.render(&value), "[1, 2, 3]");
        assert_eq!(rt.render(&rt.eval_string("[]").unwrap()), "[]");
    }

    #[test]
    fn test_repeat() {
        let rt = Runtime::new();
        let value = rt.eval_string("[0; 3]").unwrap();
        assert_eq!(rt.render(&value), "[0, 0, 0]");
        assert!(rt.eval_string("[0; -1]").is_none());
        rt.take_exception();
    }

    #[test]
    fn test_repeat_rejects_huge_count() {
        let rt = Runtime::new();
        assert!(rt.eval_string("[0; 9223372036854775807]").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, crate::ExceptionKind::ArgumentError);
        assert!(repeat_elements(Value::Unit, MAX_REPEAT_LEN + 1, None).is_err());
        assert_eq!(repeat_elements(Value::I64(1), 2, None).unwrap().len(), 2);
    }

    #[test]
    fn test_repeat_aliases_containers() {
        let rt = Runtime::new();
        let src = "let mut grid = [vec![0]; 2]; grid[0][0] = 5; grid[1][0]";
        assert_eq!(rt.eval_string(src), Some(Value::I64(5)));
    }
}
