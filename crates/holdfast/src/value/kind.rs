//! Tagged classification of values

use super::Value;
use crate::heap::{Heap, HeapObject};

/// The category of a value, computed once per access and then dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `()`
    Unit,
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// Signed or unsigned integer
    Integer,
    /// Floating point
    Float,
    /// Immutable string
    String,
    /// Mutable array
    Array,
    /// Immutable tuple
    Tuple,
    /// Struct instance
    Struct {
        /// Declared `#[frozen]`
        frozen: bool,
    },
    /// Mutable dictionary
    Dict,
    /// Function or builtin
    Function,
    /// Handle to an object that has been collected
    Freed,
}

impl ValueKind {
    /// Classify `value`, consulting `heap` for object handles.
    pub fn of(value: &Value, heap: &Heap) -> Self {
        match value {
            Value::Unit => ValueKind::Unit,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::I64(_) | Value::U64(_) => ValueKind::Integer,
            Value::F64(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Function(_) | Value::Builtin(_) => ValueKind::Function,
            Value::Object(id) => match heap.get(*id) {
                Some(HeapObject::Array(_)) => ValueKind::Array,
                Some(HeapObject::Tuple(_)) => ValueKind::Tuple,
                Some(HeapObject::Struct(s)) => ValueKind::Struct { frozen: s.frozen },
                Some(HeapObject::Dict(_)) => ValueKind::Dict,
                None => ValueKind::Freed,
            },
        }
    }

    /// Whether `.field` access is meaningful
    pub fn supports_field(self) -> bool {
        matches!(self, ValueKind::Struct { .. } | ValueKind::Tuple)
    }

    /// Whether `[index]` access is meaningful
    pub fn supports_index(self) -> bool {
        matches!(
            self,
            ValueKind::Array | ValueKind::Tuple | ValueKind::Dict | ValueKind::String
        )
    }

    /// Whether elements or fields can be replaced in place
    pub fn is_mutable_container(self) -> bool {
        matches!(
            self,
            ValueKind::Array | ValueKind::Dict | ValueKind::Struct { frozen: false }
        )
    }

    /// Short human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Unit => "unit",
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Tuple => "tuple",
            ValueKind::Struct { frozen: false } => "struct",
            ValueKind::Struct { frozen: true } => "frozen struct",
            ValueKind::Dict => "dict",
            ValueKind::Function => "function",
            ValueKind::Freed => "freed object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StructValue;

    #[test]
    fn test_primitive_kinds() {
        let heap = Heap::new();
        assert_eq!(ValueKind::of(&Value::I64(1), &heap), ValueKind::Integer);
        assert_eq!(ValueKind::of(&Value::string("s"), &heap), ValueKind::String);
        assert!(!ValueKind::Integer.supports_index());
        assert!(ValueKind::String.supports_index());
    }

    #[test]
    fn test_object_kinds() {
        let mut heap = Heap::new();
        let arr = heap.alloc(HeapObject::Array(vec![]));
        let frozen = heap.alloc(HeapObject::Struct(StructValue::new("P").frozen()));

        let arr_kind = ValueKind::of(&Value::Object(arr), &heap);
        assert_eq!(arr_kind, ValueKind::Array);
        assert!(arr_kind.is_mutable_container());

        let frozen_kind = ValueKind::of(&Value::Object(frozen), &heap);
        assert!(frozen_kind.supports_field());
        assert!(!frozen_kind.is_mutable_container());
    }

    #[test]
    fn test_freed_handle() {
        let mut heap = Heap::new();
        let id = heap.alloc(HeapObject::Array(vec![]));
        heap.collect([]);
        assert_eq!(ValueKind::of(&Value::Object(id), &heap), ValueKind::Freed);
    }
}
