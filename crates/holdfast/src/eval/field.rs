//! Field access evaluation and the field primitives
//!
//! Structs have named fields; tuples have numbered ones (`t.0`). These
//! primitives back both `a.f` and the `getfield`/`setfield` builtins.

use syn::spanned::Spanned;

use crate::heap::HeapObject;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprField {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let base = self.base.eval(env, rt)?;
        get_field(rt, &base, &member_name(&self.member))
            .map_err(|e| e.with_span(Some(self.member.span())))
    }
}

/// The name of a field access member: `x` for `a.x`, `0` for `t.0`.
pub(crate) fn member_name(member: &syn::Member) -> String {
    match member {
        syn::Member::Named(ident) => ident.to_string(),
        syn::Member::Unnamed(index) => index.index.to_string(),
    }
}

/// Read `base.name`.
pub fn get_field(rt: &Runtime, base: &Value, name: &str) -> Result<Value, EvalError> {
    match base {
        Value::Object(id) => rt.with_object(*id, |obj| match obj {
            HeapObject::Struct(s) => s.get(name).cloned().ok_or_else(|| EvalError::UndefinedField {
                field: name.to_string(),
                type_name: s.type_name.clone(),
                span: None,
            }),
            HeapObject::Tuple(items) => tuple_slot(items.len(), name)
                .map(|i| items[i].clone())
                .ok_or_else(|| EvalError::UndefinedField {
                    field: name.to_string(),
                    type_name: "Tuple".to_string(),
                    span: None,
                }),
            other => Err(no_fields(other.type_name())),
        }),
        other => Err(no_fields(&rt.type_name_of(other))),
    }
}

/// Write `base.name = value`.
///
/// Fails for tuples and `#[frozen]` structs, which are immutable.
pub fn set_field(rt: &Runtime, base: &Value, name: &str, value: Value) -> Result<(), EvalError> {
    match base {
        Value::Object(id) => rt.with_object_mut(*id, |obj| match obj {
            HeapObject::Struct(s) if s.frozen => Err(EvalError::ImmutableValue {
                type_name: s.type_name.clone(),
                span: None,
            }),
            HeapObject::Struct(s) => match s.fields.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EvalError::UndefinedField {
                    field: name.to_string(),
                    type_name: s.type_name.clone(),
                    span: None,
                }),
            },
            HeapObject::Tuple(_) => Err(EvalError::ImmutableValue {
                type_name: "Tuple".to_string(),
                span: None,
            }),
            other => Err(no_fields(other.type_name())),
        }),
        other => Err(no_fields(&rt.type_name_of(other))),
    }
}

fn tuple_slot(len: usize, name: &str) -> Option<usize> {
    name.parse::<usize>().ok().filter(|i| *i < len)
}

fn no_fields(type_name: &str) -> EvalError {
    EvalError::TypeError {
        message: format!("type {} has no fields", type_name),
        span: None,
    }
}
