//! Boxing and unboxing between host types and foreign values
//!
//! [`IntoForeign`] boxes a host value, allocating containers on the foreign
//! heap. Boxing never fails for well-formed input. [`FromForeign`] unboxes
//! and fails with [`HoldfastError::Conversion`] when the foreign value's
//! current type does not convert.
//!
//! A freshly boxed container is not pinned. Wrap it in a
//! [`Proxy`](crate::Proxy) or store it in a global before the next safe
//! point.
//!
//! # Examples
//!
//! ```
//! use holdfast::{FromForeign, IntoForeign, Runtime};
//!
//! let rt = Runtime::new();
//! let boxed = vec![1i64, 2, 3].into_foreign(&rt);
//! assert_eq!(rt.render(&boxed), "[1, 2, 3]");
//! assert_eq!(Vec::<i64>::from_foreign(&rt, &boxed).unwrap(), vec![1, 2, 3]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{HoldfastError, Result};
use crate::heap::HeapObject;
use crate::proxy::Proxy;
use crate::runtime::Runtime;
use crate::value::{HashableValue, Value};

/// Convert a host value into a foreign value.
pub trait IntoForeign {
    /// Box `self` into `rt`.
    fn into_foreign(self, rt: &Runtime) -> Value;
}

/// Convert a foreign value into a host value.
pub trait FromForeign: Sized {
    /// Unbox `value`.
    ///
    /// # Errors
    ///
    /// `Conversion` if the value's type does not convert to `Self`.
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self>;
}

fn mismatch(rt: &Runtime, expected: &str, value: &Value) -> HoldfastError {
    HoldfastError::Conversion {
        expected: expected.to_string(),
        found: rt.type_name_of(value),
    }
}

/// Copy out the elements of an array or tuple.
fn sequence(rt: &Runtime, expected: &str, value: &Value) -> Result<Vec<Value>> {
    let items = match value {
        Value::Object(id) => rt
            .with_object(*id, |obj| match obj {
                HeapObject::Array(items) | HeapObject::Tuple(items) => Ok(Some(items.clone())),
                _ => Ok(None),
            })
            .ok()
            .flatten(),
        _ => None,
    };
    items.ok_or_else(|| mismatch(rt, expected, value))
}

// ═══════════════════════════════════════════════════════════════════════
// Primitives
// ═══════════════════════════════════════════════════════════════════════

impl IntoForeign for Value {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        self
    }
}

impl FromForeign for Value {
    fn from_foreign(_rt: &Runtime, value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

/// Inline values cross runtimes freely. Handing an object to a runtime
/// that did not allocate it is a fatal precondition violation.
impl IntoForeign for &Proxy {
    fn into_foreign(self, rt: &Runtime) -> Value {
        let value = self.value();
        assert!(
            value.object_id().is_none() || std::ptr::eq(self.runtime().as_ref(), rt),
            "holdfast proxy object passed to a runtime it does not belong to"
        );
        value
    }
}

impl IntoForeign for () {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::Unit
    }
}

impl FromForeign for () {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        match value {
            Value::Unit => Ok(()),
            other => Err(mismatch(rt, "()", other)),
        }
    }
}

impl IntoForeign for bool {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::Bool(self)
    }
}

impl FromForeign for bool {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch(rt, "bool", value))
    }
}

impl IntoForeign for char {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::Char(self)
    }
}

impl FromForeign for char {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        match value {
            Value::Char(c) => Ok(*c),
            other => Err(mismatch(rt, "char", other)),
        }
    }
}

macro_rules! signed_conversions {
    ($($t:ty),*) => {$(
        impl IntoForeign for $t {
            fn into_foreign(self, _rt: &Runtime) -> Value {
                Value::I64(i64::from(self))
            }
        }

        impl FromForeign for $t {
            fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
                let converted = match value {
                    Value::I64(n) => <$t>::try_from(*n).ok(),
                    Value::U64(n) => <$t>::try_from(*n).ok(),
                    _ => None,
                };
                converted.ok_or_else(|| integer_mismatch(rt, stringify!($t), value))
            }
        }
    )*};
}

macro_rules! unsigned_conversions {
    ($($t:ty),*) => {$(
        impl IntoForeign for $t {
            fn into_foreign(self, _rt: &Runtime) -> Value {
                Value::U64(u64::from(self))
            }
        }

        impl FromForeign for $t {
            fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
                let converted = match value {
                    Value::I64(n) => <$t>::try_from(*n).ok(),
                    Value::U64(n) => <$t>::try_from(*n).ok(),
                    _ => None,
                };
                converted.ok_or_else(|| integer_mismatch(rt, stringify!($t), value))
            }
        }
    )*};
}

signed_conversions!(i8, i16, i32, i64);
unsigned_conversions!(u8, u16, u32, u64);

impl IntoForeign for isize {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        // isize is at most 64 bits on supported targets
        Value::I64(self as i64)
    }
}

impl FromForeign for isize {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        let converted = match value {
            Value::I64(n) => isize::try_from(*n).ok(),
            Value::U64(n) => isize::try_from(*n).ok(),
            _ => None,
        };
        converted.ok_or_else(|| integer_mismatch(rt, "isize", value))
    }
}

impl IntoForeign for usize {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::U64(self as u64)
    }
}

impl FromForeign for usize {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        let converted = match value {
            Value::I64(n) => usize::try_from(*n).ok(),
            Value::U64(n) => usize::try_from(*n).ok(),
            _ => None,
        };
        converted.ok_or_else(|| integer_mismatch(rt, "usize", value))
    }
}

fn integer_mismatch(rt: &Runtime, expected: &str, value: &Value) -> HoldfastError {
    match value {
        Value::I64(_) | Value::U64(_) => HoldfastError::Conversion {
            expected: expected.to_string(),
            found: format!("{} out of range", rt.render(value)),
        },
        other => mismatch(rt, expected, other),
    }
}

impl IntoForeign for f64 {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::F64(self)
    }
}

impl FromForeign for f64 {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch(rt, "f64", value))
    }
}

impl IntoForeign for f32 {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::F64(f64::from(self))
    }
}

impl FromForeign for f32 {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch(rt, "f32", value))
    }
}

impl IntoForeign for String {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::string(self)
    }
}

impl IntoForeign for &str {
    fn into_foreign(self, _rt: &Runtime) -> Value {
        Value::string(self)
    }
}

impl FromForeign for String {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(rt, "String", value))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Containers
// ═══════════════════════════════════════════════════════════════════════

impl<T: IntoForeign> IntoForeign for Option<T> {
    fn into_foreign(self, rt: &Runtime) -> Value {
        match self {
            Some(inner) => inner.into_foreign(rt),
            None => Value::Unit,
        }
    }
}

impl<T: FromForeign> FromForeign for Option<T> {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        match value {
            Value::Unit => Ok(None),
            other => T::from_foreign(rt, other).map(Some),
        }
    }
}

impl<T: IntoForeign> IntoForeign for Vec<T> {
    fn into_foreign(self, rt: &Runtime) -> Value {
        let items = self.into_iter().map(|item| item.into_foreign(rt)).collect();
        rt.alloc(HeapObject::Array(items))
    }
}

impl<T: FromForeign> FromForeign for Vec<T> {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        sequence(rt, "Vec", value)?
            .iter()
            .map(|item| T::from_foreign(rt, item))
            .collect()
    }
}

impl<A: IntoForeign, B: IntoForeign> IntoForeign for (A, B) {
    fn into_foreign(self, rt: &Runtime) -> Value {
        let items = vec![self.0.into_foreign(rt), self.1.into_foreign(rt)];
        rt.alloc(HeapObject::Tuple(items))
    }
}

impl<A: FromForeign, B: FromForeign> FromForeign for (A, B) {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        match sequence(rt, "2-tuple", value)?.as_slice() {
            [a, b] => Ok((A::from_foreign(rt, a)?, B::from_foreign(rt, b)?)),
            _ => Err(mismatch(rt, "2-tuple", value)),
        }
    }
}

impl<A: IntoForeign, B: IntoForeign, C: IntoForeign> IntoForeign for (A, B, C) {
    fn into_foreign(self, rt: &Runtime) -> Value {
        let items = vec![
            self.0.into_foreign(rt),
            self.1.into_foreign(rt),
            self.2.into_foreign(rt),
        ];
        rt.alloc(HeapObject::Tuple(items))
    }
}

impl<A: FromForeign, B: FromForeign, C: FromForeign> FromForeign for (A, B, C) {
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        match sequence(rt, "3-tuple", value)?.as_slice() {
            [a, b, c] => Ok((
                A::from_foreign(rt, a)?,
                B::from_foreign(rt, b)?,
                C::from_foreign(rt, c)?,
            )),
            _ => Err(mismatch(rt, "3-tuple", value)),
        }
    }
}

fn box_dict<K, V>(rt: &Runtime, entries: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: IntoForeign,
    V: IntoForeign,
{
    let mut map = IndexMap::new();
    for (k, v) in entries {
        let key = k.into_foreign(rt);
        match HashableValue::new(key) {
            Some(key) => {
                map.insert(key, v.into_foreign(rt));
            }
            None => warn!("dropping dict entry with a container key"),
        }
    }
    rt.alloc(HeapObject::Dict(map))
}

fn dict_entries(rt: &Runtime, expected: &str, value: &Value) -> Result<Vec<(Value, Value)>> {
    let entries = match value {
        Value::Object(id) => rt
            .with_object(*id, |obj| match obj {
                HeapObject::Dict(map) => Ok(Some(
                    map.iter()
                        .map(|(k, v)| (k.value().clone(), v.clone()))
                        .collect::<Vec<_>>(),
                )),
                _ => Ok(None),
            })
            .ok()
            .flatten(),
        _ => None,
    };
    entries.ok_or_else(|| mismatch(rt, expected, value))
}

impl<K: IntoForeign, V: IntoForeign, S> IntoForeign for HashMap<K, V, S> {
    fn into_foreign(self, rt: &Runtime) -> Value {
        box_dict(rt, self)
    }
}

impl<K, V, S> FromForeign for HashMap<K, V, S>
where
    K: FromForeign + Eq + Hash,
    V: FromForeign,
    S: std::hash::BuildHasher + Default,
{
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        dict_entries(rt, "HashMap", value)?
            .iter()
            .map(|(k, v)| Ok((K::from_foreign(rt, k)?, V::from_foreign(rt, v)?)))
            .collect()
    }
}

impl<K: IntoForeign, V: IntoForeign, S> IntoForeign for IndexMap<K, V, S> {
    fn into_foreign(self, rt: &Runtime) -> Value {
        box_dict(rt, self)
    }
}

impl<K, V, S> FromForeign for IndexMap<K, V, S>
where
    K: FromForeign + Eq + Hash,
    V: FromForeign,
    S: std::hash::BuildHasher + Default,
{
    fn from_foreign(rt: &Runtime, value: &Value) -> Result<Self> {
        dict_entries(rt, "IndexMap", value)?
            .iter()
            .map(|(k, v)| Ok((K::from_foreign(rt, k)?, V::from_foreign(rt, v)?)))
            .collect()
    }
}
