//! Exception bridge tests

use holdfast::*;
use pretty_assertions::assert_eq;

fn foreign_error(result: holdfast::Result<Value>) -> ForeignException {
    match result {
        Err(HoldfastError::Foreign(exception)) => exception,
        other => panic!("expected a foreign exception, got {:?}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Translation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_syntax_error_is_raised() {
    let rt = Runtime::new();
    let exception = foreign_error(bridge::safe_eval(&rt, "let = ;"));
    assert_eq!(exception.kind, ExceptionKind::SyntaxError);
    assert!(!exception.message.is_empty());
    assert!(!rt.exception_occurred());
}

#[test]
fn test_runtime_errors_carry_messages() {
    let rt = Runtime::new();
    let cases = [
        ("1 / 0", ExceptionKind::DivideError),
        ("sqrt(-1.0)", ExceptionKind::DomainError),
        ("1 + \"a\"", ExceptionKind::MethodError),
        ("vec![1][3]", ExceptionKind::BoundsError),
        ("undefined_name", ExceptionKind::UndefVarError),
        ("error(\"custom\")", ExceptionKind::ErrorException),
        ("9223372036854775807 + 1", ExceptionKind::OverflowError),
    ];
    for (src, kind) in cases {
        let exception = foreign_error(bridge::safe_eval(&rt, src));
        assert_eq!(exception.kind, kind, "{}", src);
        assert!(!exception.message.is_empty(), "{}", src);
    }
}

#[test]
fn test_failed_call_leaves_no_pending_exception() {
    let rt = Runtime::new();
    assert!(bridge::safe_eval(&rt, "1 / 0").is_err());
    assert!(!rt.exception_occurred());
    assert_eq!(bridge::safe_eval(&rt, "1 + 1").unwrap(), Value::I64(2));
}

#[test]
fn test_unchecked_exception_is_not_misattributed() {
    let rt = Runtime::new();
    assert!(bridge::call(&rt, &Value::I64(1), &[]).is_none());
    assert!(rt.exception_occurred());
    // The stale NotCallable error is dropped, not reported here
    assert_eq!(bridge::safe_eval(&rt, "2").unwrap(), Value::I64(2));
}

#[test]
fn test_raw_api_leaves_exception_pending() {
    let rt = Runtime::new();
    assert!(rt.eval_string("missing").is_none());
    let exception = rt.take_exception().unwrap();
    assert_eq!(exception.kind, ExceptionKind::UndefVarError);
    assert!(rt.take_exception().is_none());
}

#[test]
fn test_error_display_names_kind() {
    let rt = Runtime::new();
    let err = bridge::safe_eval(&rt, "error(\"boom\")").unwrap_err();
    assert_eq!(err.to_string(), "ErrorException: boom");
    assert_eq!(err.exception_kind(), Some(ExceptionKind::ErrorException));
}

// ═══════════════════════════════════════════════════════════════════════
// Stack Traces
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_stacktrace_innermost_first() {
    let rt = Runtime::new();
    bridge::safe_eval(
        &rt,
        "fn leaf(x: i64) -> i64 { x / 0 }\nfn middle(x: i64) -> i64 { leaf(x) }",
    )
    .unwrap();
    let exception = foreign_error(bridge::safe_eval(&rt, "middle(1)"));
    let names: Vec<&str> = exception
        .stacktrace
        .iter()
        .map(|frame| frame.function.as_str())
        .collect();
    assert_eq!(names[..2], ["leaf", "middle"]);
    assert!(exception.render_stacktrace().starts_with(" [1] leaf"));
}

#[test]
fn test_stack_overflow_is_an_exception() {
    let rt = Runtime::with_context(EvalContext::with_max_call_depth(16));
    bridge::safe_eval(&rt, "fn down(n: i64) -> i64 { down(n + 1) }").unwrap();
    let exception = foreign_error(bridge::safe_eval(&rt, "down(0)"));
    assert_eq!(exception.kind, ExceptionKind::StackOverflowError);
}

#[test]
fn test_interrupt_stops_evaluation() {
    let rt = Runtime::new();
    rt.context().interrupt();
    let exception = foreign_error(bridge::safe_eval(&rt, "loop {}"));
    assert_eq!(exception.kind, ExceptionKind::InterruptException);
    rt.context().reset_interrupt();
    assert_eq!(bridge::safe_eval(&rt, "3").unwrap(), Value::I64(3));
}

// ═══════════════════════════════════════════════════════════════════════
// Host Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_host_function_called_from_foreign_code() {
    let rt = Runtime::new();
    rt.register_function("triple", 1, |rt, args| {
        let n = i64::from_foreign(rt, &args[0])?;
        Ok(Value::I64(n * 3))
    })
    .unwrap();
    assert_eq!(bridge::safe_eval(&rt, "triple(4) + 1").unwrap(), Value::I64(13));
}

#[test]
fn test_host_function_failure_is_host_error() {
    let rt = Runtime::new();
    rt.register_function("fetch", 0, |_, _| anyhow::bail!("no route to host"))
        .unwrap();
    let exception = foreign_error(bridge::safe_eval(&rt, "fetch()"));
    assert_eq!(exception.kind, ExceptionKind::HostError);
    assert!(exception.message.contains("no route to host"));
}

#[test]
fn test_reentrant_foreign_exception_keeps_its_kind() {
    let rt = Runtime::new();
    rt.register_function("tenth", 1, |rt, args| {
        let item = bridge::safe_call_named(rt, "getindex", &[args[0].clone(), Value::I64(10)])?;
        Ok(item)
    })
    .unwrap();
    let exception = foreign_error(bridge::safe_eval(&rt, "tenth(vec![1, 2])"));
    assert_eq!(exception.kind, ExceptionKind::BoundsError);
}

#[test]
fn test_wrong_arity_is_method_error() {
    let rt = Runtime::new();
    let len = rt.get_global("len").unwrap();
    let exception = foreign_error(bridge::safe_call(&rt, &len, &[]));
    assert_eq!(exception.kind, ExceptionKind::MethodError);
}
