//! Value representation for foreign runtime values

mod callable;
mod compound;
mod display;
mod hashable;
mod impls;
mod kind;

pub use callable::{BuiltinFn, BuiltinFnPtr, FunctionValue, Param};
pub use compound::{StructDecl, StructValue};
pub use display::render;
pub use hashable::HashableValue;
pub use kind::ValueKind;

use std::sync::Arc;

use crate::heap::ObjectId;

/// Runtime value representation for the embedded interpreter.
///
/// Values are organized into three tiers:
/// - Tier 1: Inline primitives (no allocation, never collected)
/// - Tier 2: Handles to garbage-collected heap objects
/// - Tier 3: Callable types (functions and builtins)
///
/// A `Value` is a plain copyable description; it does not keep a heap object
/// alive. Host code that needs a value to survive a collection must pin it
/// through the reference registry, which is what a `Proxy` does.
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Inline Primitives
    // ═══════════════════════════════════════════════════════════════════
    /// The unit type `()`
    Unit,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// Unicode scalar value
    Char(char),

    /// Signed integer (all signed literal suffixes land here)
    I64(i64),

    /// Unsigned integer (all unsigned literal suffixes land here)
    U64(u64),

    /// Floating point
    F64(f64),

    /// Immutable string, shared by reference count
    String(Arc<String>),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Heap Objects
    // ═══════════════════════════════════════════════════════════════════
    /// Array, tuple, struct or dict living in the collected heap
    Object(ObjectId),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 3: Callable Types
    // ═══════════════════════════════════════════════════════════════════
    /// User-defined function (from syn::ItemFn)
    Function(Arc<FunctionValue>),

    /// Built-in native function, including host callbacks
    Builtin(BuiltinFn),
}

impl Value {
    /// The heap object this value refers to, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }
}
