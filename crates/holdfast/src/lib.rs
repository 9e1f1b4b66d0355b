//! # Holdfast
//!
//! Pinned, lifetime-managed proxies into an embedded garbage-collected
//! runtime.
//!
//! Holdfast embeds a small dynamically typed interpreter (its surface syntax
//! is a subset of Rust, parsed with `syn`) and exposes its values to host
//! code as [`Proxy`] handles:
//!
//! - **Reference registry**: every proxy pins its value so the collector
//!   leaves it alone; dropping the last proxy makes it collectable again.
//! - **Exception bridge**: every call into the runtime goes through
//!   [`bridge`], which turns a pending foreign exception into a
//!   [`HoldfastError`] right away.
//! - **Proxies**: field and index access yields child proxies that share
//!   ownership of their parent and remember how they were reached.
//! - **Mutation paths**: a mutating proxy writes back by replaying its
//!   accessor chain from the named root ([`MutationPath`]), since the
//!   runtime has no interior pointers.
//!
//! ## Example
//!
//! ```
//! use holdfast::Value;
//!
//! holdfast::initialize().unwrap();
//! holdfast::safe_eval("struct R { a: Vec<i64> }\nlet mut r = R { a: vec![1, 2, 3] };").unwrap();
//!
//! let mut cell = holdfast::global("r").unwrap().field("a").unwrap().index(2).unwrap();
//! cell.set_mutating(true).unwrap();
//! cell.assign(30).unwrap();
//!
//! assert_eq!(holdfast::safe_eval("r.a[2]").unwrap().value(), Value::I64(30));
//! holdfast::shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod context;
pub mod convert;
pub mod environment;
pub mod error;
pub mod eval;
pub mod global;
pub mod heap;
pub mod path;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod value;

// Re-export main types
pub use bridge::{ExceptionKind, ForeignException, StackFrame};
pub use context::EvalContext;
pub use convert::{FromForeign, IntoForeign};
pub use environment::{Binding, BindingMode, Environment, Globals, ScopeGuard};
pub use error::{EnvironmentError, EvalError, HoldfastError, Result};
pub use eval::{eval_block, eval_expr, ControlFlow, Evaluate};
pub use global::{
    call, collect_garbage, global, initialize, initialize_with, is_initialized, runtime,
    safe_eval, shutdown,
};
pub use heap::{Heap, HeapObject, HeapStats, ObjectId};
pub use path::{MutationPath, PathRoot};
pub use proxy::{Accessor, Proxy};
pub use registry::{PinKey, ReferenceRegistry};
pub use runtime::{GcInhibitGuard, Runtime};
pub use value::{
    BuiltinFn, BuiltinFnPtr, FunctionValue, HashableValue, Param, StructDecl, StructValue, Value,
    ValueKind,
};

/// Holdfast version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
