//! Variable bindings: lexical local scopes and the runtime's globals

mod frame;
mod prelude;

pub use frame::ScopeGuard;

use indexmap::IndexMap;
use proc_macro2::Span;

use crate::error::EnvironmentError;
use crate::value::Value;

/// A single variable or function binding.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The binding's name
    pub name: String,

    /// The bound value
    pub value: Value,

    /// How the binding may be changed
    pub mode: BindingMode,

    /// Where this binding was defined (for error messages)
    pub span: Option<Span>,
}

impl Binding {
    /// Create a binding without a source location.
    pub fn new(name: impl Into<String>, value: Value, mode: BindingMode) -> Self {
        Self {
            name: name.into(),
            value,
            mode,
            span: None,
        }
    }

    /// Whether the binding accepts assignment.
    pub fn is_mutable(&self) -> bool {
        self.mode == BindingMode::Mutable
    }
}

/// Binding mode for let statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Immutable binding: `let x = ...`
    Immutable,

    /// Mutable binding: `let mut x = ...`
    Mutable,

    /// Constant binding: `const X = ...`
    Constant,
}

// ═══════════════════════════════════════════════════════════════════════
// Local Scopes
// ═══════════════════════════════════════════════════════════════════════

/// Lexical scopes of one evaluation.
///
/// Uses a flat scope design with frame boundaries for efficient
/// scope entry/exit and cache-friendly lookups. The outermost frame stands
/// for global scope: `let` statements evaluated there define runtime globals
/// instead of locals, so it normally stays empty.
///
/// # Example
///
/// ```
/// use holdfast::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.push_frame();
/// env.define("x", Value::I64(1));
///
/// env.push_frame();
/// env.define("x", Value::I64(10)); // Shadows outer x
/// assert_eq!(env.get("x"), Some(&Value::I64(10)));
///
/// env.pop_frame();
/// assert_eq!(env.get("x"), Some(&Value::I64(1)));
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    /// All bindings in a flat array (most recent at end)
    bindings: Vec<Binding>,

    /// Frame boundaries (indices into bindings)
    /// Each entry marks where a scope begins
    frames: Vec<usize>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create an environment positioned at global scope.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            frames: vec![0],
        }
    }

    /// Create the environment for a function body: one local frame.
    pub fn for_call() -> Self {
        let mut env = Self::new();
        env.push_frame();
        env
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management (Scope Entry/Exit)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new scope (push a frame).
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Exit the current scope (pop a frame).
    ///
    /// Does nothing at global scope (won't pop the last frame).
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(boundary) = self.frames.pop() {
                self.bindings.truncate(boundary);
            }
        }
    }

    /// Get the current scope depth (number of frames).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if we're at global scope.
    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Definition
    // ═══════════════════════════════════════════════════════════════════

    /// Define a new immutable binding in the current scope (shadowing).
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.define_with_mode(name, value, BindingMode::Immutable);
    }

    /// Define a new binding with explicit mutability.
    pub fn define_with_mode(&mut self, name: impl Into<String>, value: Value, mode: BindingMode) {
        self.bindings.push(Binding::new(name, value, mode));
    }

    /// Define a new binding with source span for error reporting.
    pub fn define_with_span(
        &mut self,
        name: impl Into<String>,
        value: Value,
        mode: BindingMode,
        span: Span,
    ) {
        self.bindings.push(Binding {
            span: Some(span),
            ..Binding::new(name, value, mode)
        });
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Look up the most recent binding with the given name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_binding(name).map(|b| &b.value)
    }

    /// Look up a binding and return the full Binding struct.
    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.name == name)
    }

    /// Check if a binding exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b.name == name)
    }

    /// Assign a new value to an existing mutable binding.
    ///
    /// # Errors
    ///
    /// - `UndefinedVariable` if the binding doesn't exist
    /// - `ImmutableBinding` if the binding is not mutable
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        let binding = self
            .bindings
            .iter_mut()
            .rev()
            .find(|b| b.name == name)
            .ok_or_else(|| EnvironmentError::UndefinedVariable {
                name: name.to_string(),
            })?;

        if !binding.is_mutable() {
            return Err(EnvironmentError::ImmutableBinding {
                name: name.to_string(),
                span: binding.span,
            });
        }
        binding.value = value;
        Ok(())
    }

    /// Iterate over all bindings, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Get the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Globals
// ═══════════════════════════════════════════════════════════════════════

/// The runtime's global bindings, in definition order.
///
/// Globals are collector roots. Redefining a global replaces it, except that
/// a constant can never be redefined.
#[derive(Debug, Default)]
pub struct Globals {
    bindings: IndexMap<String, Binding>,
}

impl Globals {
    /// Create an empty global table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the global table preloaded with the builtin prelude.
    pub fn with_prelude() -> Self {
        let mut globals = Self::new();
        globals.load_prelude();
        globals
    }

    /// Define or replace a global.
    ///
    /// # Errors
    ///
    /// `ConstantRedefinition` if the existing binding is a constant.
    pub fn define(&mut self, binding: Binding) -> Result<(), EnvironmentError> {
        if let Some(existing) = self.bindings.get(&binding.name) {
            if existing.mode == BindingMode::Constant {
                return Err(EnvironmentError::ConstantRedefinition {
                    name: binding.name,
                });
            }
        }
        self.bindings.insert(binding.name.clone(), binding);
        Ok(())
    }

    /// Assign to an existing mutable global.
    ///
    /// # Errors
    ///
    /// - `UndefinedVariable` if the global doesn't exist
    /// - `ImmutableBinding` if the global is not mutable
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        let binding =
            self.bindings
                .get_mut(name)
                .ok_or_else(|| EnvironmentError::UndefinedVariable {
                    name: name.to_string(),
                })?;

        if !binding.is_mutable() {
            return Err(EnvironmentError::ImmutableBinding {
                name: name.to_string(),
                span: binding.span,
            });
        }
        binding.value = value;
        Ok(())
    }

    /// Look up a global's value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).map(|b| &b.value)
    }

    /// Look up a global's full binding.
    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Mode of a global, if defined.
    pub fn mode(&self, name: &str) -> Option<BindingMode> {
        self.bindings.get(name).map(|b| b.mode)
    }

    /// Check if a global exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// All global values (collector roots).
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.values().map(|b| &b.value)
    }

    /// Names of all globals, in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of globals.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no globals are defined.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_assign_requires_mut() {
        let mut env = Environment::for_call();
        env.define("x", Value::I64(1));
        env.define_with_mode("y", Value::I64(1), BindingMode::Mutable);

        assert!(matches!(
            env.assign("x", Value::I64(2)),
            Err(EnvironmentError::ImmutableBinding { .. })
        ));
        env.assign("y", Value::I64(2)).unwrap();
        assert_eq!(env.get("y"), Some(&Value::I64(2)));
    }

    #[test]
    fn test_local_assign_undefined() {
        let mut env = Environment::for_call();
        assert!(matches!(
            env.assign("nope", Value::Unit),
            Err(EnvironmentError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_global_scope_flag() {
        let mut env = Environment::new();
        assert!(env.is_global_scope());
        env.push_frame();
        assert!(!env.is_global_scope());
        env.pop_frame();
        env.pop_frame();
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_globals_redefine_replaces() {
        let mut globals = Globals::new();
        globals
            .define(Binding::new("x", Value::I64(1), BindingMode::Immutable))
            .unwrap();
        globals
            .define(Binding::new("x", Value::I64(2), BindingMode::Mutable))
            .unwrap();
        assert_eq!(globals.get("x"), Some(&Value::I64(2)));
        assert_eq!(globals.mode("x"), Some(BindingMode::Mutable));
        assert_eq!(globals.len(), 1);
    }

    #[test]
    fn test_globals_constant_cannot_be_redefined() {
        let mut globals = Globals::new();
        globals
            .define(Binding::new("K", Value::I64(1), BindingMode::Constant))
            .unwrap();
        assert!(matches!(
            globals.define(Binding::new("K", Value::I64(2), BindingMode::Mutable)),
            Err(EnvironmentError::ConstantRedefinition { .. })
        ));
        assert!(matches!(
            globals.assign("K", Value::I64(2)),
            Err(EnvironmentError::ImmutableBinding { .. })
        ));
    }

    #[test]
    fn test_prelude_is_constant() {
        let globals = Globals::with_prelude();
        assert_eq!(globals.mode("getindex"), Some(BindingMode::Constant));
        assert!(globals.get("setfield").is_some_and(Value::is_callable));
    }
}
