//! Display and Debug implementations for Value

use std::fmt::{self, Write};

use super::*;
use crate::heap::{Heap, HeapObject};

/// Nesting beyond this depth is elided, which also cuts cycles.
const MAX_RENDER_DEPTH: usize = 16;

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::I64(n) => write!(f, "{}", n), // Default integer type
            Value::U64(n) => write!(f, "{}u64", n),
            Value::F64(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Object(id) => write!(f, "<object {}>", id),
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display is more user-friendly, Debug is more detailed
        match self {
            Value::String(s) => write!(f, "{}", s.as_str()), // No quotes for Display
            Value::Char(c) => write!(f, "{}", c),            // No quotes for Display
            Value::U64(n) => write!(f, "{}", n),
            _ => fmt::Debug::fmt(self, f),
        }
    }
}

/// Render a value the way foreign code sees it, following heap objects.
///
/// Top-level strings and chars are rendered without quotes; nested ones are
/// quoted.
pub fn render(value: &Value, heap: &Heap) -> String {
    let mut out = String::new();
    match value {
        Value::String(_) | Value::Char(_) => {
            let _ = write!(out, "{}", value);
        }
        _ => render_into(&mut out, value, heap, 0),
    }
    out
}

fn render_into(out: &mut String, value: &Value, heap: &Heap, depth: usize) {
    let Value::Object(id) = value else {
        let _ = write!(out, "{:?}", value);
        return;
    };

    if depth >= MAX_RENDER_DEPTH {
        out.push_str("...");
        return;
    }

    let Some(object) = heap.get(*id) else {
        let _ = write!(out, "<freed {}>", id);
        return;
    };

    match object {
        HeapObject::Array(items) => {
            out.push('[');
            render_seq(out, items, heap, depth);
            out.push(']');
        }
        HeapObject::Tuple(items) => {
            out.push('(');
            render_seq(out, items, heap, depth);
            if items.len() == 1 {
                out.push(','); // Single-element tuple needs trailing comma
            }
            out.push(')');
        }
        HeapObject::Struct(s) => {
            out.push_str(&s.type_name);
            out.push_str(" { ");
            for (i, (name, v)) in s.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(": ");
                render_into(out, v, heap, depth + 1);
            }
            out.push_str(" }");
        }
        HeapObject::Dict(map) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{:?} => ", k.value());
                render_into(out, v, heap, depth + 1);
            }
            out.push('}');
        }
    }
}

fn render_seq(out: &mut String, items: &[Value], heap: &Heap, depth: usize) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_into(out, item, heap, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_primitives() {
        assert_eq!(format!("{:?}", Value::I64(-4)), "-4");
        assert_eq!(format!("{:?}", Value::U64(4)), "4u64");
        assert_eq!(format!("{:?}", Value::F64(2.0)), "2.0");
        assert_eq!(format!("{:?}", Value::string("a\"b")), "\"a\\\"b\"");
        assert_eq!(format!("{:?}", Value::Char('x')), "'x'");
    }

    #[test]
    fn test_render_nested() {
        let mut heap = Heap::new();
        let inner = heap.alloc(HeapObject::Tuple(vec![Value::I64(1)]));
        let outer = heap.alloc(HeapObject::Array(vec![
            Value::Object(inner),
            Value::string("s"),
        ]));
        assert_eq!(render(&Value::Object(outer), &heap), "[(1,), \"s\"]");
    }

    #[test]
    fn test_render_struct() {
        let mut heap = Heap::new();
        let id = heap.alloc(HeapObject::Struct(
            StructValue::new("Point")
                .with_field("x", Value::I64(1))
                .with_field("y", Value::I64(2)),
        ));
        assert_eq!(render(&Value::Object(id), &heap), "Point { x: 1, y: 2 }");
    }

    #[test]
    fn test_render_cycle_terminates() {
        let mut heap = Heap::new();
        let id = heap.alloc(HeapObject::Array(vec![]));
        if let Some(HeapObject::Array(items)) = heap.get_mut(id) {
            items.push(Value::Object(id));
        }
        assert!(render(&Value::Object(id), &heap).contains("..."));
    }

    #[test]
    fn test_render_top_level_string_unquoted() {
        let heap = Heap::new();
        assert_eq!(render(&Value::string("hi"), &heap), "hi");
    }
}
