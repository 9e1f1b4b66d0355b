//! Function and method call evaluation
//!
//! Calls evaluate the callee and arguments left to right, then dispatch on
//! the callee value. Method calls try a small set of built-in methods on the
//! receiver first and otherwise fall back to calling a function of the same
//! name with the receiver as its first argument (`v.f(x)` is `f(v, x)`).

use proc_macro2::Span;
use syn::spanned::Spanned;

use crate::bridge::StackFrame;
use crate::environment::BindingMode;
use crate::heap::HeapObject;
use crate::{Environment, EvalError, FunctionValue, Runtime, Value};

use super::control::ControlFlow;
use super::path::lookup;
use super::{binary, eval_block_stmts, index, Evaluate};

impl Evaluate for syn::ExprCall {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let func = self.func.eval(env, rt)?;
        let args = self
            .args
            .iter()
            .map(|arg| arg.eval(env, rt))
            .collect::<Result<Vec<_>, _>>()?;
        call_value(rt, func, args, Some(self.span()))
    }
}

impl Evaluate for syn::ExprMethodCall {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let receiver = self.receiver.eval(env, rt)?;
        let method = self.method.to_string();
        let span = Some(self.method.span());

        let mut args = Vec::with_capacity(self.args.len() + 1);
        for arg in &self.args {
            args.push(arg.eval(env, rt)?);
        }

        if let Some(result) = builtin_method(rt, &method, &receiver, &args) {
            return result.map_err(|e| e.with_span(span));
        }

        let func = lookup(&method, env, rt).ok_or_else(|| EvalError::NoMethod {
            method: method.clone(),
            type_name: rt.type_name_of(&receiver),
            span,
        })?;
        args.insert(0, receiver);
        call_value(rt, func, args, span)
    }
}

/// Call `func` with already evaluated arguments.
///
/// # Errors
///
/// `NotCallable` for a non-function callee, `ArityMismatch` for a wrong
/// argument count, and whatever the callee raises.
pub fn call_value(
    rt: &Runtime,
    func: Value,
    args: Vec<Value>,
    span: Option<Span>,
) -> Result<Value, EvalError> {
    match func {
        Value::Function(f) => call_function(rt, &f, args, span),
        Value::Builtin(b) => {
            check_arity(&b.name, b.arity, args.len(), span)?;
            (b.func)(rt, &args).map_err(|e| e.with_span(span))
        }
        other => Err(EvalError::NotCallable {
            type_name: rt.type_name_of(&other),
            span,
        }),
    }
}

fn check_arity(name: &str, arity: i32, got: usize, span: Option<Span>) -> Result<(), EvalError> {
    match usize::try_from(arity) {
        Ok(expected) if expected != got => Err(EvalError::ArityMismatch {
            expected,
            got,
            name: name.to_string(),
            span,
        }),
        _ => Ok(()),
    }
}

/// Call a user-defined function in a fresh environment.
///
/// Globals stay visible through the runtime; the caller's locals do not.
fn call_function(
    rt: &Runtime,
    func: &FunctionValue,
    args: Vec<Value>,
    span: Option<Span>,
) -> Result<Value, EvalError> {
    let arity = i32::try_from(func.params.len()).unwrap_or(i32::MAX);
    check_arity(&func.name, arity, args.len(), span)?;

    let line = func.line.and_then(|l| l.checked_sub(1));
    let _frame = rt.enter_call(StackFrame::new(func.name.clone(), line))?;

    let mut env = Environment::for_call();
    for (param, arg) in func.params.iter().zip(args) {
        let mode = if param.mutable {
            BindingMode::Mutable
        } else {
            BindingMode::Immutable
        };
        env.define_with_mode(param.name.clone(), arg, mode);
    }

    match eval_block_stmts(&func.body.stmts, &mut env, rt) {
        Ok(value) => Ok(value),
        Err(EvalError::ControlFlow(ControlFlow::Return { value })) => Ok(value),
        Err(EvalError::ControlFlow(_)) => Err(EvalError::Panic {
            message: "break or continue outside of a loop".to_string(),
            span,
        }),
        Err(err) => {
            rt.note_unwinding();
            Err(err)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Methods
// ═══════════════════════════════════════════════════════════════════════

/// Try a built-in method on `receiver`.
///
/// Returns `None` when no built-in matches, so the caller can fall back to
/// a function lookup.
fn builtin_method(
    rt: &Runtime,
    method: &str,
    receiver: &Value,
    args: &[Value],
) -> Option<Result<Value, EvalError>> {
    let result = match (method, args) {
        ("len", []) => rt.len_of(receiver).map(|n| Value::U64(n as u64)),
        ("push", [item]) => index::push(rt, receiver, item.clone()).map(|()| Value::Unit),
        ("pop", []) => index::pop(rt, receiver),
        ("sqrt", []) if receiver.is_numeric() => binary::sqrt(receiver, None),
        ("abs", []) => abs(receiver)?,
        ("clone", []) => shallow_copy(rt, receiver),
        ("to_string", []) => Ok(Value::string(rt.render(receiver))),
        _ => return None,
    };
    Some(result)
}

fn abs(value: &Value) -> Option<Result<Value, EvalError>> {
    match value {
        Value::I64(n) => Some(
            n.checked_abs()
                .map(Value::I64)
                .ok_or(EvalError::IntegerOverflow { span: None }),
        ),
        Value::U64(n) => Some(Ok(Value::U64(*n))),
        Value::F64(f) => Some(Ok(Value::F64(f.abs()))),
        _ => None,
    }
}

/// A new object holding the same elements; elements themselves are shared.
fn shallow_copy(rt: &Runtime, value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Object(id) => {
            let copy: HeapObject = rt.with_object(*id, |obj| Ok(obj.clone()))?;
            Ok(rt.alloc(copy))
        }
        other => Ok(other.clone()),
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
    fn test_call_user_function() {
        let rt = Runtime::new();
        rt.eval_string("fn add(a: i64, b: i64) -> i64 { a + b }").unwrap();
        assert_eq!(rt.eval_string("add(40, 2)"), Some(Value::I64(42)));
    }

    #[test]
    fn test_recursion() {
        let rt = Runtime::new();
        rt.eval_string("fn fact(n: i64) -> i64 { if n <= 1 { 1 } else { n * fact(n - 1) } }")
            .unwrap();
        assert_eq!(rt.eval_string("fact(10)"), Some(Value::I64(3628800)));
    }

    #[test]
    fn test_parameters_are_immutable_unless_mut() {
        let rt = Runtime::new();
        rt.eval_string("fn bump(mut n: i64) -> i64 { n += 1; n }\nfn fixed(n: i64) { n = 2; }")
            .unwrap();
        assert_eq!(rt.eval_string("bump(1)"), Some(Value::I64(2)));
        assert_eq!(fails_with(&rt, "fixed(1)"), ExceptionKind::ImmutableError);
    }

    #[test]
    fn test_function_sees_globals_not_caller_locals() {
        let rt = Runtime::new();
        rt.eval_string("let base = 100;\nfn read() -> i64 { base }").unwrap();
        assert_eq!(rt.eval_string("read()"), Some(Value::I64(100)));

        rt.eval_string("fn peek() -> i64 { hidden }").unwrap();
        assert_eq!(
            fails_with(&rt, "{ let hidden = 1; peek() }"),
            ExceptionKind::UndefVarError
        );
    }

    #[test]
    fn test_arity_and_callable_errors() {
        let rt = Runtime::new();
        rt.eval_string("fn one(a: i64) { a }").unwrap();
        assert_eq!(fails_with(&rt, "one(1, 2)"), ExceptionKind::MethodError);
        assert_eq!(fails_with(&rt, "len()"), ExceptionKind::MethodError);
        assert_eq!(fails_with(&rt, "let n = 3; n(1)"), ExceptionKind::MethodError);
    }

    #[test]
    fn test_builtin_methods() {
        let rt = Runtime::new();
        assert_eq!(rt.eval_string("\"héllo\".len()"), Some(Value::U64(5)));
        assert_eq!(rt.eval_string("(-4).abs()"), Some(Value::I64(4)));
        assert_eq!(rt.eval_string("(16.0).sqrt()"), Some(Value::F64(4.0)));
        assert_eq!(rt.eval_string("(42).to_string()"), Some(Value::string("42")));
    }

    #[test]
    fn test_clone_is_a_new_object() {
        let rt = Runtime::new();
        let src = "let a = vec![1, 2]; let b = a.clone(); b.push(3); (a.len(), identical(a, b))";
        let value = rt.eval_string(src).unwrap();
        assert_eq!(rt.render(&value), "(2, false)");
    }

    #[test]
    fn test_method_falls_back_to_function() {
        let rt = Runtime::new();
        rt.eval_string("fn double(x: i64) -> i64 { x * 2 }").unwrap();
        assert_eq!(rt.eval_string("(21).double()"), Some(Value::I64(42)));
        assert_eq!(fails_with(&rt, "(21).nothing()"), ExceptionKind::MethodError);
    }
}
