//! Lifetime-managed handles to foreign values
//!
//! A [`Proxy`] pins its value in the runtime's reference registry for as long
//! as it lives, so the value survives collection. A proxy obtained through
//! [`Proxy::field`] or [`Proxy::index`] is a *child*: it shares ownership of
//! its parent and remembers the [`Accessor`] that reached it, which is what
//! lets a mutating child write back into the root binding.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use holdfast::{bridge, Proxy, Runtime, Value};
//!
//! let rt = Rc::new(Runtime::new());
//! bridge::safe_eval(&rt, "let mut vec = vec![1, 2, 3, 4];").unwrap();
//!
//! let root = Proxy::global(&rt, "vec").unwrap();
//! let mut first = root.index(0).unwrap();
//! first.set_mutating(true).unwrap();
//! first.assign(9999).unwrap();
//!
//! assert_eq!(bridge::safe_eval(&rt, "vec[0]").unwrap(), Value::I64(9999));
//! ```

mod accessor;

pub use accessor::Accessor;

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::bridge::{self, ExceptionKind, ForeignException};
use crate::convert::{FromForeign, IntoForeign};
use crate::error::{HoldfastError, Result};
use crate::path::MutationPath;
use crate::registry::PinKey;
use crate::runtime::Runtime;
use crate::value::{Value, ValueKind};

/// A pinned handle to a foreign value.
///
/// Proxies are tied to the thread that owns the runtime; `Rc` keeps them
/// `!Send`.
pub struct Proxy {
    runtime: Rc<Runtime>,
    value: Value,
    pin: PinKey,
    owner: Option<Rc<Proxy>>,
    accessor: Option<Accessor>,
    mutating: bool,
}

impl Proxy {
    // ═══════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════

    fn build(
        runtime: Rc<Runtime>,
        value: Value,
        owner: Option<Rc<Proxy>>,
        accessor: Option<Accessor>,
    ) -> Self {
        let pin = runtime.create_reference(&value);
        Self {
            runtime,
            value,
            pin,
            owner,
            accessor,
            mutating: false,
        }
    }

    fn check_live(runtime: &Runtime, value: &Value) -> Result<()> {
        match value.object_id() {
            Some(id) if !runtime.is_live(value) => Err(HoldfastError::NotLive {
                object: id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_name(name: &str) -> Result<()> {
        syn::parse_str::<syn::Ident>(name).map(|_| ()).map_err(|_| {
            HoldfastError::Foreign(ForeignException::new(
                ExceptionKind::SyntaxError,
                format!("`{}` is not a valid binding name", name),
            ))
        })
    }

    /// An unnamed root over `value`.
    ///
    /// # Errors
    ///
    /// `NotLive` if `value` is an object that does not exist in `runtime`.
    pub fn new(runtime: &Rc<Runtime>, value: Value) -> Result<Self> {
        Self::check_live(runtime, &value)?;
        Ok(Self::build(Rc::clone(runtime), value, None, None))
    }

    /// A root bound to the global `name`.
    ///
    /// `value` is taken to be the global's current value; nothing is written.
    ///
    /// # Errors
    ///
    /// `NotLive` as for [`Proxy::new`], or a foreign `SyntaxError` if `name`
    /// is not an identifier.
    pub fn named(runtime: &Rc<Runtime>, value: Value, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_name(&name)?;
        Self::check_live(runtime, &value)?;
        Ok(Self::build(
            Rc::clone(runtime),
            value,
            None,
            Some(Accessor::Binding(name)),
        ))
    }

    /// A root bound to the existing global `name`.
    ///
    /// # Errors
    ///
    /// A foreign `UndefVarError` if the global is not defined.
    pub fn global(runtime: &Rc<Runtime>, name: &str) -> Result<Self> {
        let value = runtime.get_global(name).ok_or_else(|| {
            HoldfastError::Foreign(ForeignException::new(
                ExceptionKind::UndefVarError,
                format!("`{}` not defined", name),
            ))
        })?;
        Self::named(runtime, value, name)
    }

    /// Evaluate `source` and wrap the result as an unnamed root.
    ///
    /// # Errors
    ///
    /// The foreign exception raised by the evaluation.
    pub fn eval(runtime: &Rc<Runtime>, source: &str) -> Result<Self> {
        let value = bridge::safe_eval(runtime, source)?;
        Self::new(runtime, value)
    }

    fn child(&self, value: Value, accessor: Accessor) -> Proxy {
        let owner = Rc::new(self.clone());
        let mut child = Self::build(Rc::clone(&self.runtime), value, Some(owner), Some(accessor));
        if self.mutating && child.can_mutate() {
            child.mutating = true;
        }
        child
    }

    // ═══════════════════════════════════════════════════════════════════
    // Access
    // ═══════════════════════════════════════════════════════════════════

    /// The current value.
    pub fn value(&self) -> Value {
        self.runtime.assert_alive();
        self.value.clone()
    }

    /// The runtime this proxy belongs to.
    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    pub(crate) fn owner(&self) -> Option<&Proxy> {
        self.owner.as_deref()
    }

    pub(crate) fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }

    /// Child proxy for `self[key]`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the value is not indexable, otherwise the foreign
    /// exception raised by the lookup (e.g. a `BoundsError`).
    pub fn index(&self, key: impl IntoForeign) -> Result<Proxy> {
        let accessor = Accessor::Index(key.into_foreign(&self.runtime));
        if !self.kind().supports_index() {
            return Err(HoldfastError::TypeMismatch {
                accessor: accessor.to_string(),
                found: self.type_name(),
            });
        }
        let value = accessor.get(&self.runtime, &self.value)?;
        Ok(self.child(value, accessor))
    }

    /// Child proxy for `self.name`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the value has no fields, `UndefinedField` if it
    /// lacks this one.
    pub fn field(&self, name: &str) -> Result<Proxy> {
        let accessor = Accessor::Field(name.to_string());
        if !self.kind().supports_field() {
            return Err(HoldfastError::TypeMismatch {
                accessor: accessor.to_string(),
                found: self.type_name(),
            });
        }
        let value = accessor
            .get(&self.runtime, &self.value)
            .map_err(|e| match e {
                HoldfastError::Foreign(exception) if exception.kind == ExceptionKind::FieldError => {
                    HoldfastError::UndefinedField {
                        type_name: self.type_name(),
                        field: name.to_string(),
                    }
                }
                other => other,
            })?;
        Ok(self.child(value, accessor))
    }

    /// Dict lookup by string key, or field access on anything else.
    ///
    /// # Errors
    ///
    /// As for [`Proxy::index`] and [`Proxy::field`].
    pub fn get(&self, key: &str) -> Result<Proxy> {
        match self.kind() {
            ValueKind::Dict => self.index(key),
            _ => self.field(key),
        }
    }

    /// Unbox the current value.
    ///
    /// # Errors
    ///
    /// `Conversion` if the value does not convert to `T`.
    pub fn unbox<T: FromForeign>(&self) -> Result<T> {
        self.runtime.assert_alive();
        T::from_foreign(&self.runtime, &self.value)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════

    /// Assign a new value.
    ///
    /// A non-mutating proxy only rebinds itself. A mutating proxy first
    /// writes the value through its mutation path; if that fails the proxy
    /// is left unchanged.
    ///
    /// # Errors
    ///
    /// `ImmutableTarget`, `BrokenPath`, or a foreign exception from the write.
    pub fn assign(&mut self, value: impl IntoForeign) -> Result<()> {
        self.runtime.assert_alive();
        let value = value.into_foreign(&self.runtime);
        let pin = self.runtime.create_reference(&value);
        if self.mutating {
            if let Err(err) = self.path().write(&self.runtime, value.clone()) {
                self.runtime.free_reference(pin);
                return Err(err);
            }
        }
        self.rebind(value, pin);
        Ok(())
    }

    fn rebind(&mut self, value: Value, pin: PinKey) {
        let old = std::mem::replace(&mut self.pin, pin);
        self.value = value;
        self.runtime.free_reference(old);
    }

    /// Turn write-back on or off.
    ///
    /// # Errors
    ///
    /// `ImmutableTarget` if the path cannot be written; the flag is left
    /// unchanged.
    pub fn set_mutating(&mut self, mutating: bool) -> Result<()> {
        if mutating {
            self.path().check_mutable(&self.runtime)?;
        }
        debug!(path = %self.path(), mutating, "set mutating");
        self.mutating = mutating;
        Ok(())
    }

    /// Whether [`Proxy::set_mutating`] with `true` would succeed.
    pub fn can_mutate(&self) -> bool {
        self.path().check_mutable(&self.runtime).is_ok()
    }

    /// Whether assignment writes back to the foreign runtime.
    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    /// The root-to-leaf path this proxy writes through.
    pub fn path(&self) -> MutationPath {
        MutationPath::of(self)
    }

    /// Foreign source naming this value, e.g. `r.a[2]`; empty when the root
    /// is an unnamed temporary.
    pub fn get_name(&self) -> String {
        let path = self.path();
        match path.root_name() {
            Some(_) => path.to_string(),
            None => String::new(),
        }
    }

    /// Store the value in the global `name` and make this proxy a root bound
    /// to it.
    ///
    /// The global is created as a mutable binding if missing.
    ///
    /// # Errors
    ///
    /// A foreign `SyntaxError` if `name` is not an identifier, or
    /// `ImmutableTarget` if `name` is an existing immutable binding.
    pub fn assign_name(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        let value = self.value();
        bridge::guarded(&self.runtime, |rt| rt.assign_global(name, value))
            .map_err(|e| match e {
                HoldfastError::Foreign(exception)
                    if exception.kind == ExceptionKind::ImmutableError =>
                {
                    HoldfastError::ImmutableTarget {
                        target: name.to_string(),
                        reason: exception.message,
                    }
                }
                other => other,
            })?;
        trace!(name, "proxy bound to global");
        self.owner = None;
        self.accessor = Some(Accessor::Binding(name.to_string()));
        Ok(())
    }

    /// Re-read the value through the mutation path.
    ///
    /// # Errors
    ///
    /// `BrokenPath` if the path no longer resolves.
    pub fn refresh(&mut self) -> Result<()> {
        let value = self.path().read(&self.runtime)?;
        let pin = self.runtime.create_reference(&value);
        self.rebind(value, pin);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// Classification of the current value.
    pub fn kind(&self) -> ValueKind {
        self.runtime.assert_alive();
        self.runtime.classify(&self.value)
    }

    /// Foreign type name of the current value.
    pub fn type_name(&self) -> String {
        self.runtime.assert_alive();
        self.runtime.type_name_of(&self.value)
    }

    /// Whether the value is a struct instance.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind(), ValueKind::Struct { .. })
    }

    /// Field names of a struct, in declaration order.
    ///
    /// # Errors
    ///
    /// The foreign exception raised for a value without named fields.
    pub fn field_names(&self) -> Result<Vec<String>> {
        let names = bridge::safe_call_named(&self.runtime, "fieldnames", &[self.value()])?;
        Vec::<String>::from_foreign(&self.runtime, &names)
    }

    /// Number of elements, fields, or characters.
    ///
    /// # Errors
    ///
    /// The foreign exception raised for a value without a length.
    pub fn len(&self) -> Result<usize> {
        let n = bridge::safe_call_named(&self.runtime, "len", &[self.value()])?;
        usize::from_foreign(&self.runtime, &n)
    }

    /// Whether [`Proxy::len`] is zero.
    ///
    /// # Errors
    ///
    /// As for [`Proxy::len`].
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Whether both proxies observe the same foreign object (or equal
    /// inline values) in the same runtime.
    pub fn identical(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.runtime, &other.runtime) && self.value() == other.value()
    }

    /// Call a function-valued proxy.
    ///
    /// # Errors
    ///
    /// The foreign exception raised by the call.
    pub fn call(&self, args: &[Value]) -> Result<Proxy> {
        let result = bridge::safe_call(&self.runtime, &self.value(), args)?;
        Proxy::new(&self.runtime, result)
    }
}

impl Clone for Proxy {
    fn clone(&self) -> Self {
        let pin = self.runtime.create_reference(&self.value);
        Self {
            runtime: Rc::clone(&self.runtime),
            value: self.value.clone(),
            pin,
            owner: self.owner.clone(),
            accessor: self.accessor.clone(),
            mutating: self.mutating,
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        let pin = std::mem::take(&mut self.pin);
        self.runtime.free_reference(pin);
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.runtime.render(&self.value))
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("path", &self.path().to_string())
            .field("value", &self.value)
            .field("mutating", &self.mutating)
            .finish()
    }
}
