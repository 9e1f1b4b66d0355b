//! Mutation path tests: replay, re-resolution, and broken paths

use std::rc::Rc;

use holdfast::*;
use pretty_assertions::assert_eq;

fn runtime(src: &str) -> Rc<Runtime> {
    let rt = Rc::new(Runtime::new());
    bridge::safe_eval(&rt, src).unwrap();
    rt
}

fn read(rt: &Runtime, src: &str) -> Value {
    bridge::safe_eval(rt, src).unwrap()
}

const NESTED: &str = "struct R { a: Vec<i64> }\nlet mut r = R { a: vec![1, 2, 3] };";

// ═══════════════════════════════════════════════════════════════════════
// Structure
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_path_steps_root_first() {
    let rt = runtime(NESTED);
    let leaf = Proxy::global(&rt, "r")
        .unwrap()
        .field("a")
        .unwrap()
        .index(2)
        .unwrap();
    let path = leaf.path();
    assert_eq!(path.root(), &PathRoot::Named("r".to_string()));
    assert_eq!(
        path.steps(),
        &[
            Accessor::Field("a".to_string()),
            Accessor::Index(Value::I64(2))
        ]
    );
}

#[test]
fn test_path_of_root_has_no_steps() {
    let rt = runtime("let mut x = 1;");
    let path = Proxy::global(&rt, "x").unwrap().path();
    assert_eq!(path.root_name(), Some("x"));
    assert!(path.steps().is_empty());
    assert_eq!(path.to_string(), "x");
}

#[test]
fn test_temporary_root_renders_placeholder() {
    let rt = Rc::new(Runtime::new());
    let leaf = Proxy::eval(&rt, "vec![(1, 2)]")
        .unwrap()
        .index(0)
        .unwrap()
        .field("1")
        .unwrap();
    assert_eq!(leaf.path().to_string(), "<temporary>[0].1");
    assert_eq!(leaf.path().root_name(), None);
}

// ═══════════════════════════════════════════════════════════════════════
// Re-resolution
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reassigned_root_is_retargeted() {
    let rt = runtime(NESTED);
    let root = Proxy::global(&rt, "r").unwrap();
    let mut leaf = root.field("a").unwrap().index(2).unwrap();
    leaf.set_mutating(true).unwrap();

    read(&rt, "r = R { a: vec![7, 8, 9] };");
    leaf.assign(30).unwrap();

    // The write lands in the instance `r` names now
    assert_eq!(rt.render(&read(&rt, "r.a")), "[7, 8, 30]");
    // The old instance, still pinned through `root`, is untouched
    assert_eq!(root.field("a").unwrap().index(2).unwrap().unbox::<i64>().unwrap(), 3);
}

#[test]
fn test_replaced_intermediate_is_retargeted() {
    let rt = runtime(NESTED);
    let mut leaf = Proxy::global(&rt, "r")
        .unwrap()
        .field("a")
        .unwrap()
        .index(0)
        .unwrap();
    leaf.set_mutating(true).unwrap();

    read(&rt, "r.a = vec![4, 5];");
    leaf.assign(40).unwrap();
    assert_eq!(rt.render(&read(&rt, "r.a")), "[40, 5]");
}

#[test]
fn test_read_follows_current_binding() {
    let rt = runtime("let mut v = vec![1, 2];");
    let cell = Proxy::global(&rt, "v").unwrap().index(1).unwrap();
    read(&rt, "v = vec![3, 4];");
    assert_eq!(cell.path().read(&rt).unwrap(), Value::I64(4));
    assert_eq!(cell.value(), Value::I64(2));
}

// ═══════════════════════════════════════════════════════════════════════
// Broken Paths
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_shrunk_container_breaks_final_step() {
    let rt = runtime("let mut v = vec![1, 2, 3];");
    let mut last = Proxy::global(&rt, "v").unwrap().index(2).unwrap();
    last.set_mutating(true).unwrap();
    read(&rt, "v = vec![1];");

    match last.assign(9) {
        Err(HoldfastError::BrokenPath { path, cause, .. }) => {
            assert_eq!(path, "v[2]");
            assert_eq!(cause.map(|c| c.kind), Some(ExceptionKind::BoundsError));
        }
        other => panic!("expected BrokenPath, got {:?}", other),
    }
    assert_eq!(last.value(), Value::I64(3));
}

#[test]
fn test_retyped_intermediate_breaks_path() {
    let rt = runtime(NESTED);
    let mut leaf = Proxy::global(&rt, "r")
        .unwrap()
        .field("a")
        .unwrap()
        .index(1)
        .unwrap();
    leaf.set_mutating(true).unwrap();

    read(&rt, "struct S { b: i64 }\nr = S { b: 0 };");
    match leaf.assign(1) {
        Err(HoldfastError::BrokenPath { step, cause, .. }) => {
            assert_eq!(step, "r.a");
            assert_eq!(cause.map(|c| c.kind), Some(ExceptionKind::FieldError));
        }
        other => panic!("expected BrokenPath, got {:?}", other),
    }
}

#[test]
fn test_missing_key_breaks_path() {
    let rt = runtime("let mut d = dict!{\"inner\" => vec![1]};");
    let mut cell = Proxy::global(&rt, "d")
        .unwrap()
        .get("inner")
        .unwrap()
        .index(0)
        .unwrap();
    cell.set_mutating(true).unwrap();
    read(&rt, "d = dict!{\"other\" => 1};");

    let err = cell.assign(2).unwrap_err();
    assert!(matches!(err, HoldfastError::BrokenPath { .. }));
    assert_eq!(err.exception_kind(), Some(ExceptionKind::KeyError));
}

#[test]
fn test_frozen_after_the_fact_is_immutable() {
    let rt = runtime(
        "#[frozen]\nstruct Locked { a: Vec<i64> }\nstruct Open { a: Vec<i64> }\n\
         let mut holder = vec![Open { a: vec![1] }];",
    );
    let mut slot = Proxy::global(&rt, "holder")
        .unwrap()
        .index(0)
        .unwrap()
        .field("a")
        .unwrap();
    slot.set_mutating(true).unwrap();
    read(&rt, "holder[0] = Locked { a: vec![1] };");

    assert!(matches!(
        slot.assign(vec![2i64]),
        Err(HoldfastError::ImmutableTarget { .. })
    ));
}
