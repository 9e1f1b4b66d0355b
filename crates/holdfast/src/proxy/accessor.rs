//! How a proxy's value was reached

use std::fmt;

use crate::bridge;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

/// One step from a parent to a child, or the name of a root binding.
///
/// Accessors are symbolic: replaying them re-reads the foreign heap instead
/// of reusing a cached target.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// A global binding; only ever the accessor of a root proxy
    Binding(String),
    /// `.name` on a struct, or `.0` on a tuple
    Field(String),
    /// `[key]` on an array, tuple, string, or dict
    Index(Value),
}

impl Accessor {
    /// Read this step from `container`.
    ///
    /// A `Binding` ignores `container` and reads the global.
    ///
    /// # Errors
    ///
    /// The foreign exception raised by the getter.
    pub fn get(&self, rt: &Runtime, container: &Value) -> Result<Value> {
        match self {
            Accessor::Binding(name) => bridge::safe_eval(rt, name),
            Accessor::Field(name) => bridge::safe_call_named(
                rt,
                "getfield",
                &[container.clone(), Value::string(name.as_str())],
            ),
            Accessor::Index(key) => {
                bridge::safe_call_named(rt, "getindex", &[container.clone(), key.clone()])
            }
        }
    }

    /// Write `value` through this step into `container`.
    ///
    /// # Errors
    ///
    /// The foreign exception raised by the setter.
    pub fn set(&self, rt: &Runtime, container: &Value, value: Value) -> Result<()> {
        match self {
            Accessor::Binding(name) => bridge::guarded(rt, |rt| rt.assign_global(name, value)),
            Accessor::Field(name) => bridge::safe_call_named(
                rt,
                "setfield",
                &[container.clone(), Value::string(name.as_str()), value],
            )
            .map(|_| ()),
            Accessor::Index(key) => bridge::safe_call_named(
                rt,
                "setindex",
                &[container.clone(), key.clone(), value],
            )
            .map(|_| ()),
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Binding(name) => f.write_str(name),
            Accessor::Field(name) => write!(f, ".{}", name),
            Accessor::Index(Value::U64(n)) => write!(f, "[{}]", n),
            Accessor::Index(key) => write!(f, "[{:?}]", key),
        }
    }
}
