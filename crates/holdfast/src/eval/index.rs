//! Index expression evaluation and the indexing primitives
//!
//! Indexing is 0-based. Arrays and tuples take integer indices, dicts take
//! any primitive key, and strings index by character. These primitives back
//! both `a[i]` and the `getindex`/`setindex` builtins.

use syn::spanned::Spanned;

use crate::error::type_name;
use crate::heap::HeapObject;
use crate::value::HashableValue;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprIndex {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let container = self.expr.eval(env, rt)?;
        let index = self.index.eval(env, rt)?;
        get_index(rt, &container, &index).map_err(|e| e.with_span(Some(self.span())))
    }
}

/// Read `container[index]`.
pub fn get_index(rt: &Runtime, container: &Value, index: &Value) -> Result<Value, EvalError> {
    match container {
        Value::Object(id) => rt.with_object(*id, |obj| match obj {
            HeapObject::Array(items) | HeapObject::Tuple(items) => {
                let i = position(index, items.len(), obj.type_name())?;
                Ok(items[i].clone())
            }
            HeapObject::Dict(map) => map
                .get(&dict_key(index)?)
                .cloned()
                .ok_or_else(|| EvalError::KeyNotFound {
                    key: format!("{:?}", index),
                    span: None,
                }),
            HeapObject::Struct(s) => Err(not_indexable(&s.type_name)),
        }),
        Value::String(s) => {
            let len = s.chars().count();
            let i = position(index, len, "String")?;
            Ok(s.chars().nth(i).map(Value::Char).unwrap_or(Value::Unit))
        }
        other => Err(not_indexable(type_name(other))),
    }
}

/// Write `container[index] = value`.
///
/// Dict writes insert missing keys; array writes must be in bounds.
pub fn set_index(rt: &Runtime, container: &Value, index: Value, value: Value) -> Result<(), EvalError> {
    match container {
        Value::Object(id) => rt.with_object_mut(*id, |obj| {
            let type_name = obj.type_name().to_string();
            match obj {
                HeapObject::Array(items) => {
                    let i = position(&index, items.len(), &type_name)?;
                    items[i] = value;
                    Ok(())
                }
                HeapObject::Dict(map) => {
                    map.insert(dict_key(&index)?, value);
                    Ok(())
                }
                HeapObject::Tuple(_) => Err(EvalError::ImmutableValue {
                    type_name,
                    span: None,
                }),
                HeapObject::Struct(_) => Err(not_indexable(&type_name)),
            }
        }),
        Value::String(_) => Err(EvalError::ImmutableValue {
            type_name: "String".to_string(),
            span: None,
        }),
        other => Err(not_indexable(type_name(other))),
    }
}

/// Append to an array.
pub fn push(rt: &Runtime, container: &Value, value: Value) -> Result<(), EvalError> {
    let no_push = |type_name: &str| EvalError::NoMethod {
        method: "push".to_string(),
        type_name: type_name.to_string(),
        span: None,
    };
    match container {
        Value::Object(id) => rt.with_object_mut(*id, |obj| match obj {
            HeapObject::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(no_push(other.type_name())),
        }),
        other => Err(no_push(type_name(other))),
    }
}

/// Remove and return the last element of an array (`()` when empty).
pub fn pop(rt: &Runtime, container: &Value) -> Result<Value, EvalError> {
    match container {
        Value::Object(id) => rt.with_object_mut(*id, |obj| match obj {
            HeapObject::Array(items) => Ok(items.pop().unwrap_or(Value::Unit)),
            other => Err(EvalError::NoMethod {
                method: "pop".to_string(),
                type_name: other.type_name().to_string(),
                span: None,
            }),
        }),
        other => Err(EvalError::NoMethod {
            method: "pop".to_string(),
            type_name: type_name(other).to_string(),
            span: None,
        }),
    }
}

/// Check an integer index against `len`.
fn position(index: &Value, len: usize, container: &str) -> Result<usize, EvalError> {
    let raw = match index {
        Value::I64(n) => *n,
        Value::U64(n) => i64::try_from(*n).unwrap_or(i64::MAX),
        other => {
            return Err(EvalError::TypeError {
                message: format!("{} index must be an integer, got {}", container, type_name(other)),
                span: None,
            })
        }
    };
    usize::try_from(raw)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| EvalError::IndexOutOfBounds {
            index: raw,
            len,
            container: container.to_string(),
            span: None,
        })
}

fn dict_key(index: &Value) -> Result<HashableValue, EvalError> {
    HashableValue::new(index.clone()).ok_or_else(|| EvalError::TypeError {
        message: format!("{} cannot be used as a dict key", type_name(index)),
        span: None,
    })
}

fn not_indexable(type_name: &str) -> EvalError {
    EvalError::TypeError {
        message: format!("{} is not indexable", type_name),
        span: None,
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
    fn test_array_and_tuple_indexing() {
        let rt = Runtime::new();
        assert_eq!(rt.eval_string("vec![10, 20, 30][2]"), Some(Value::I64(30)));
        assert_eq!(rt.eval_string("(1, \"a\")[1]"), Some(Value::string("a")));
        assert_eq!(rt.eval_string("\"héllo\"[1]"), Some(Value::Char('é')));
    }

    #[test]
    fn test_out_of_bounds() {
        let rt = Runtime::new();
        assert_eq!(fails_with(&rt, "vec![1, 2][2]"), ExceptionKind::BoundsError);
        assert_eq!(fails_with(&rt, "vec![1, 2][-1]"), ExceptionKind::BoundsError);
        assert_eq!(fails_with(&rt, "vec![1, 2][\"a\"]"), ExceptionKind::TypeError);
    }

    #[test]
    fn test_dict_get_and_insert() {
        let rt = Runtime::new();
        rt.eval_string("let mut d = dict!{\"a\" => 1};").unwrap();
        assert_eq!(rt.eval_string("d[\"a\"]"), Some(Value::I64(1)));
        assert_eq!(fails_with(&rt, "d[\"b\"]"), ExceptionKind::KeyError);
        rt.eval_string("d[\"b\"] = 2;").unwrap();
        assert_eq!(rt.eval_string("len(d)"), Some(Value::U64(2)));
    }

    #[test]
    fn test_push_and_pop() {
        let rt = Runtime::new();
        let src = "let mut v = vec![1]; v.push(2); push(v, 3); v.pop()";
        assert_eq!(rt.eval_string(src), Some(Value::I64(3)));
        assert_eq!(rt.eval_string("v.len()"), Some(Value::U64(2)));
    }

    #[test]
    fn test_set_into_tuple_is_immutable() {
        let rt = Runtime::new();
        rt.eval_string("let mut t = (1, 2);").unwrap();
        assert_eq!(fails_with(&rt, "t[0] = 9"), ExceptionKind::ImmutableError);
    }
}
