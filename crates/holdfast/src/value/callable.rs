//! Callable value types: functions and builtins

use std::sync::Arc;

use super::Value;
use crate::error::EvalError;
use crate::runtime::Runtime;

/// Type alias for builtin function pointers to reduce complexity.
///
/// Builtins receive the runtime so they can allocate, inspect the heap, and
/// call back into foreign code.
pub type BuiltinFnPtr = Arc<dyn Fn(&Runtime, &[Value]) -> Result<Value, EvalError>>;

/// A user-defined function parsed from syn::ItemFn.
///
/// Stores the AST directly for interpretation.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    /// Function name
    pub name: String,

    /// Parameters (types are erased at runtime)
    pub params: Vec<Param>,

    /// The function body (stored as syn AST)
    pub body: Arc<syn::Block>,

    /// Line the function was defined on, for stack traces
    pub line: Option<usize>,
}

impl FunctionValue {
    /// Create a new function value
    pub fn new(name: String, params: Vec<Param>, body: syn::Block) -> Self {
        let line = Some(body.brace_token.span.open().start().line).filter(|l| *l > 0);
        Self {
            name,
            params,
            // ALLOW: syn::Block is just AST data, but clippy can't verify
            // Send + Sync automatically
            #[allow(clippy::arc_with_non_send_sync)]
            body: Arc::new(body),
            line,
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: String,

    /// Declared `mut`
    pub mutable: bool,
}

/// A built-in native function.
///
/// These are Rust functions exposed to the interpreter, either from the
/// prelude or registered by the host.
#[derive(Clone)]
pub struct BuiltinFn {
    /// Function name (for display/debugging)
    pub name: String,

    /// Arity (-1 for variadic)
    pub arity: i32,

    /// The actual function pointer
    pub func: BuiltinFnPtr,
}

impl BuiltinFn {
    /// Create a builtin from a plain function or closure.
    pub fn new(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&Runtime, &[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}
