//! Hashable wrapper for Value to enable use as dict keys

use std::hash::{Hash, Hasher};

use super::Value;

/// A wrapper for Value that implements Hash and Eq.
///
/// Only primitive types and strings can be used as keys. Construct through
/// [`HashableValue::new`], which rejects everything else.
#[derive(Debug, Clone)]
pub struct HashableValue(Value);

impl HashableValue {
    /// Wrap a value, or return `None` if it cannot be a key.
    pub fn new(value: Value) -> Option<Self> {
        Self::is_hashable(&value).then_some(Self(value))
    }

    /// Check if a value can be hashed
    pub fn is_hashable(value: &Value) -> bool {
        matches!(
            value,
            Value::Unit
                | Value::Bool(_)
                | Value::Char(_)
                | Value::I64(_)
                | Value::U64(_)
                | Value::String(_)
        )
    }

    /// The wrapped value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the inner value
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl Hash for HashableValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the discriminant first
        std::mem::discriminant(&self.0).hash(state);

        match &self.0 {
            Value::Unit => {}
            Value::Bool(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::I64(n) => n.hash(state),
            Value::U64(n) => n.hash(state),
            Value::String(s) => s.hash(state),
            // Unreachable through `new`
            _ => {}
        }
    }
}

impl PartialEq for HashableValue {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for HashableValue {}
