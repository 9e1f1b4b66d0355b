//! Environment and globals tests

use holdfast::*;
use pretty_assertions::assert_eq;

// ═══════════════════════════════════════════════════════════════════════
// Local Scopes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_environment_starts_at_global_scope() {
    let env = Environment::new();
    assert!(env.is_empty());
    assert!(env.is_global_scope());
    assert_eq!(env.depth(), 1);

    let call = Environment::for_call();
    assert!(!call.is_global_scope());
}

#[test]
fn test_shadowing_and_frames() {
    let mut env = Environment::for_call();
    env.define("x", Value::I64(1));
    {
        let mut guard = env.scope_guard();
        guard.define("x", Value::I64(2));
        assert_eq!(guard.get("x"), Some(&Value::I64(2)));
    }
    assert_eq!(env.get("x"), Some(&Value::I64(1)));
    assert_eq!(env.len(), 1);
}

#[test]
fn test_assign_respects_mode() {
    let mut env = Environment::for_call();
    env.define_with_mode("m", Value::I64(1), BindingMode::Mutable);
    env.define("i", Value::I64(1));

    env.assign("m", Value::I64(5)).unwrap();
    assert_eq!(env.get("m"), Some(&Value::I64(5)));
    assert!(matches!(
        env.assign("i", Value::I64(5)),
        Err(EnvironmentError::ImmutableBinding { .. })
    ));
    assert!(matches!(
        env.assign("nope", Value::I64(5)),
        Err(EnvironmentError::UndefinedVariable { .. })
    ));
}

#[test]
fn test_pop_frame_at_global_scope_is_noop() {
    let mut env = Environment::new();
    env.define("kept", Value::Bool(true));
    env.pop_frame();
    assert_eq!(env.depth(), 1);
    assert!(env.contains("kept"));
}

// ═══════════════════════════════════════════════════════════════════════
// Globals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_prelude_is_constant() {
    let globals = Globals::with_prelude();
    for name in ["getfield", "setindex", "len", "fieldnames", "gc"] {
        assert_eq!(globals.mode(name), Some(BindingMode::Constant), "{}", name);
    }
}

#[test]
fn test_globals_define_and_redefine() {
    let mut globals = Globals::new();
    globals
        .define(Binding::new("x", Value::I64(1), BindingMode::Immutable))
        .unwrap();
    // Redefinition replaces a non-constant binding
    globals
        .define(Binding::new("x", Value::I64(2), BindingMode::Mutable))
        .unwrap();
    assert_eq!(globals.get("x"), Some(&Value::I64(2)));

    globals
        .define(Binding::new("C", Value::I64(1), BindingMode::Constant))
        .unwrap();
    assert!(matches!(
        globals.define(Binding::new("C", Value::I64(2), BindingMode::Constant)),
        Err(EnvironmentError::ConstantRedefinition { .. })
    ));
}

#[test]
fn test_globals_assign() {
    let mut globals = Globals::new();
    globals
        .define(Binding::new("m", Value::I64(1), BindingMode::Mutable))
        .unwrap();
    globals.assign("m", Value::I64(3)).unwrap();
    assert_eq!(globals.get("m"), Some(&Value::I64(3)));
    assert_eq!(globals.names().collect::<Vec<_>>(), vec!["m"]);
}

#[test]
fn test_runtime_assign_global_creates_mutable() {
    let rt = Runtime::new();
    rt.assign_global("fresh", Value::I64(1)).unwrap();
    assert_eq!(rt.binding_mode("fresh"), Some(BindingMode::Mutable));
    assert!(rt.global_names().contains(&"fresh".to_string()));
}
