//! Standard prelude with built-in functions
//!
//! Every prelude binding is a constant: foreign code can shadow a builtin
//! locally but never redefine it globally. The accessor builtins
//! (`getfield`, `setfield`, `getindex`, `setindex`) are what the mutation
//! path resolver replays.

use super::{Binding, BindingMode, Globals};
use crate::error::EvalError;
use crate::eval::{binary, field, index};
use crate::heap::HeapObject;
use crate::runtime::Runtime;
use crate::value::{BuiltinFn, Value};

impl Globals {
    /// Load the standard prelude into the global table.
    pub fn load_prelude(&mut self) {
        // Accessors
        self.define_builtin("getfield", 2, builtin_getfield);
        self.define_builtin("setfield", 3, builtin_setfield);
        self.define_builtin("getindex", 2, builtin_getindex);
        self.define_builtin("setindex", 3, builtin_setindex);

        // Containers
        self.define_builtin("len", 1, builtin_len);
        self.define_builtin("push", 2, builtin_push);
        self.define_builtin("fieldnames", 1, builtin_fieldnames);

        // Type inspection
        self.define_builtin("type_of", 1, builtin_type_of);
        self.define_builtin("isa", 2, builtin_isa);
        self.define_builtin("identical", 2, builtin_identical);

        // Strings and numbers
        self.define_builtin("string", -1, builtin_string);
        self.define_builtin("sqrt", 1, builtin_sqrt);

        // Printing
        self.define_builtin("print", -1, builtin_print);
        self.define_builtin("println", -1, builtin_println);

        // Errors and the collector
        self.define_builtin("error", -1, builtin_error);
        self.define_builtin("gc", 0, builtin_gc);
    }

    fn define_builtin(
        &mut self,
        name: &str,
        arity: i32,
        func: fn(&Runtime, &[Value]) -> Result<Value, EvalError>,
    ) {
        let builtin = Value::Builtin(BuiltinFn::new(name, arity, func));
        self.bindings.insert(
            name.to_string(),
            Binding::new(name, builtin, BindingMode::Constant),
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Function Implementations
// ═══════════════════════════════════════════════════════════════════════

fn field_name(builtin: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::I64(_) | Value::U64(_) => Ok(value.to_string()),
        other => Err(EvalError::BuiltinError {
            name: builtin.to_string(),
            message: format!("field name must be a string, got {:?}", other),
            span: None,
        }),
    }
}

fn builtin_getfield(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let name = field_name("getfield", &args[1])?;
    field::get_field(rt, &args[0], &name)
}

fn builtin_setfield(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let name = field_name("setfield", &args[1])?;
    field::set_field(rt, &args[0], &name, args[2].clone())?;
    Ok(args[2].clone())
}

fn builtin_getindex(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    index::get_index(rt, &args[0], &args[1])
}

fn builtin_setindex(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    index::set_index(rt, &args[0], args[1].clone(), args[2].clone())?;
    Ok(args[2].clone())
}

fn builtin_len(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let len = rt.len_of(&args[0])?;
    Ok(Value::U64(len as u64))
}

fn builtin_push(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    index::push(rt, &args[0], args[1].clone())?;
    Ok(args[0].clone())
}

fn builtin_fieldnames(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let names = match &args[0] {
        Value::Object(id) => rt.with_object(*id, |obj| match obj {
            HeapObject::Struct(s) => Ok(s.fields.keys().map(Value::string).collect()),
            other => Err(EvalError::TypeError {
                message: format!("fieldnames: {} has no fields", other.type_name()),
                span: None,
            }),
        })?,
        other => {
            return Err(EvalError::TypeError {
                message: format!("fieldnames: {} has no fields", rt.type_name_of(other)),
                span: None,
            })
        }
    };
    Ok(rt.alloc(HeapObject::Array(names)))
}

fn builtin_type_of(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::string(rt.type_name_of(&args[0])))
}

fn builtin_isa(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let Some(expected) = args[1].as_str() else {
        return Err(EvalError::BuiltinError {
            name: "isa".to_string(),
            message: "expected a type name string".to_string(),
            span: None,
        });
    };
    Ok(Value::Bool(rt.type_name_of(&args[0]) == expected))
}

fn builtin_identical(_rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args[0] == args[1]))
}

fn builtin_string(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let rendered: String = args.iter().map(|v| rt.render(v)).collect();
    Ok(Value::string(rendered))
}

fn builtin_sqrt(_rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    binary::sqrt(&args[0], None)
}

fn builtin_print(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let line = args.iter().map(|v| rt.render(v)).collect::<Vec<_>>().join(" ");
    print!("{}", line);
    Ok(Value::Unit)
}

fn builtin_println(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    builtin_print(rt, args)?;
    println!();
    Ok(Value::Unit)
}

fn builtin_error(rt: &Runtime, args: &[Value]) -> Result<Value, EvalError> {
    let message = if args.is_empty() {
        "explicit error".to_string()
    } else {
        args.iter().map(|v| rt.render(v)).collect::<Vec<_>>().join(" ")
    };
    Err(EvalError::Panic {
        message,
        span: None,
    })
}

fn builtin_gc(rt: &Runtime, _args: &[Value]) -> Result<Value, EvalError> {
    rt.request_gc();
    Ok(Value::Unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ExceptionKind;
    use pretty_assertions::assert_eq;

    fn eval(rt: &Runtime, src: &str) -> Value {
        rt.eval_string(src).unwrap()
    }

    #[test]
    fn test_accessor_builtins() {
        let rt = Runtime::new();
        eval(&rt, "struct P { x: i64 }\nlet mut p = P { x: 1 }; let mut v = vec![1, 2];");
        assert_eq!(eval(&rt, "getfield(p, \"x\")"), Value::I64(1));
        assert_eq!(eval(&rt, "setfield(p, \"x\", 5); p.x"), Value::I64(5));
        assert_eq!(eval(&rt, "getindex(v, 1)"), Value::I64(2));
        assert_eq!(eval(&rt, "setindex(v, 0, 7); v[0]"), Value::I64(7));
    }

    #[test]
    fn test_tuple_field_by_number() {
        let rt = Runtime::new();
        assert_eq!(eval(&rt, "getfield((1, 2), 1)"), Value::I64(2));
    }

    #[test]
    fn test_type_inspection() {
        let rt = Runtime::new();
        assert_eq!(eval(&rt, "type_of(vec![1])"), Value::string("Array"));
        assert_eq!(eval(&rt, "isa(1.5, \"f64\")"), Value::Bool(true));
        assert_eq!(eval(&rt, "let a = vec![1]; identical(a, a)"), Value::Bool(true));
        assert_eq!(eval(&rt, "identical(vec![1], vec![1])"), Value::Bool(false));
    }

    #[test]
    fn test_fieldnames_in_declaration_order() {
        let rt = Runtime::new();
        let names = eval(&rt, "struct Q { b: i64, a: i64 }\nstring(fieldnames(Q { a: 1, b: 2 }))");
        assert_eq!(names, Value::string("[\"b\", \"a\"]"));
    }

    #[test]
    fn test_error_raises_error_exception() {
        let rt = Runtime::new();
        assert!(rt.eval_string("error(\"bad \", 1)").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::ErrorException);
        assert_eq!(exception.message, "bad  1");
    }

    #[test]
    fn test_prelude_cannot_be_redefined() {
        let rt = Runtime::new();
        assert!(rt.eval_string("fn len(x: i64) { 0 }").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::ImmutableError)
        );
    }
}
