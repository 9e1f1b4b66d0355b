//! Struct literal evaluation
//!
//! A struct literal needs a declaration from a `struct` item evaluated
//! earlier. Fields are stored in declaration order whatever order the
//! literal lists them in; `#[frozen]` on the declaration makes the instance
//! immutable.

use indexmap::IndexMap;
use syn::spanned::Spanned;

use crate::heap::HeapObject;
use crate::value::StructValue;
use crate::{Environment, EvalError, Runtime, Value};

use super::field::member_name;
use super::path::simple_name;
use super::Evaluate;

impl Evaluate for syn::ExprStruct {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        eval_struct(self, env, rt)
    }
}

/// Evaluate a struct literal expression.
///
/// - `Point { x: 1, y: 2 }`
/// - `Point { x: 10, ..old }` (update syntax copies the remaining fields)
///
/// # Errors
///
/// `UndefinedVariable` for an undeclared struct, `UndefinedField` for a
/// field the declaration lacks, `TypeError` for a missing field or a bad
/// update base.
pub fn eval_struct(
    struct_expr: &syn::ExprStruct,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let type_name = simple_name(&struct_expr.path)?;
    let span = Some(struct_expr.path.span());
    let decl = rt
        .struct_decl(&type_name)
        .ok_or_else(|| EvalError::UndefinedVariable {
            name: type_name.clone(),
            span,
        })?;

    let mut given: IndexMap<String, Value> = IndexMap::new();
    for field in &struct_expr.fields {
        let name = member_name(&field.member);
        if !decl.fields.contains(&name) {
            return Err(EvalError::UndefinedField {
                field: name,
                type_name,
                span: Some(field.member.span()),
            });
        }
        let value = field.expr.eval(env, rt)?;
        given.insert(name, value);
    }

    if let Some(rest) = &struct_expr.rest {
        let base = rest.eval(env, rt)?;
        let base_fields = match &base {
            Value::Object(id) => rt.with_object(*id, |obj| match obj {
                HeapObject::Struct(s) if s.type_name == type_name => Ok(Some(s.fields.clone())),
                _ => Ok(None),
            })?,
            _ => None,
        };
        let Some(base_fields) = base_fields else {
            return Err(EvalError::TypeError {
                message: format!(
                    "struct update base must be a {}, got {}",
                    type_name,
                    rt.type_name_of(&base)
                ),
                span,
            });
        };
        for (name, value) in base_fields {
            given.entry(name).or_insert(value);
        }
    }

    let mut instance = StructValue::new(&type_name);
    for name in &decl.fields {
        let value = given.swap_remove(name).ok_or_else(|| EvalError::TypeError {
            message: format!("missing field `{}` in initializer of `{}`", name, type_name),
            span,
        })?;
        instance = instance.with_field(name.clone(), value);
    }
    if decl.frozen {
        instance = instance.frozen();
    }

    Ok(rt.alloc(HeapObject::Struct(instance)))
}
