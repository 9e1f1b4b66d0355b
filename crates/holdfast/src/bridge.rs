//! Exception bridge between the foreign runtime and the host
//!
//! Raw runtime calls never fail loudly: like a C embedding API they return
//! `None` and leave an exception pending on the runtime. Everything in this
//! module funnels those calls through [`guarded`], which checks the pending
//! slot immediately after the call, clears it, and turns it into a
//! [`HoldfastError`]. No foreign error survives to be observed by a later,
//! unrelated call.
//!
//! ```text
//!   no-exception ──(raw call fails)──▶ exception-pending ──(guarded)──▶ no-exception
//! ```

use std::fmt;

use tracing::{debug, warn};

use crate::error::{HoldfastError, Result};
use crate::runtime::Runtime;
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════════
// Captured Exceptions
// ═══════════════════════════════════════════════════════════════════════

/// Foreign-side exception types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Source text failed to parse
    SyntaxError,
    /// Undefined variable
    UndefVarError,
    /// Missing struct field
    FieldError,
    /// Index out of range
    BoundsError,
    /// Missing dictionary key
    KeyError,
    /// Value of the wrong type
    TypeError,
    /// No operation or method applies to the arguments
    MethodError,
    /// Invalid argument to a builtin
    ArgumentError,
    /// Argument outside a function's domain, e.g. `sqrt(-1.0)`
    DomainError,
    /// Integer division by zero
    DivideError,
    /// Checked integer arithmetic overflowed
    OverflowError,
    /// Write to an immutable binding or value
    ImmutableError,
    /// Call depth limit exceeded
    StackOverflowError,
    /// Evaluation interrupted through the context flag
    InterruptException,
    /// Generic error, including `error(..)` and `panic!(..)`
    ErrorException,
    /// A host callback failed
    HostError,
    /// Construct the runtime does not evaluate
    UnsupportedError,
}

impl ExceptionKind {
    /// The exception's foreign-side type name.
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::SyntaxError => "SyntaxError",
            ExceptionKind::UndefVarError => "UndefVarError",
            ExceptionKind::FieldError => "FieldError",
            ExceptionKind::BoundsError => "BoundsError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::MethodError => "MethodError",
            ExceptionKind::ArgumentError => "ArgumentError",
            ExceptionKind::DomainError => "DomainError",
            ExceptionKind::DivideError => "DivideError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::ImmutableError => "ImmutableError",
            ExceptionKind::StackOverflowError => "StackOverflowError",
            ExceptionKind::InterruptException => "InterruptException",
            ExceptionKind::ErrorException => "ErrorException",
            ExceptionKind::HostError => "HostError",
            ExceptionKind::UnsupportedError => "UnsupportedError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One frame of a foreign stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name, or `top-level scope`
    pub function: String,
    /// Source line, when known
    pub line: Option<usize>,
}

impl StackFrame {
    /// Create a frame.
    pub fn new(function: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            function: function.into(),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {}", self.function, line),
            None => f.write_str(&self.function),
        }
    }
}

/// A foreign exception captured from the pending slot.
///
/// The stack trace is ordered innermost frame first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignException {
    /// Exception type
    pub kind: ExceptionKind,
    /// Human-readable message (never empty)
    pub message: String,
    /// Captured stack trace
    pub stacktrace: Vec<StackFrame>,
}

impl ForeignException {
    /// Create an exception with an empty trace.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = kind.name().to_string();
        }
        Self {
            kind,
            message,
            stacktrace: Vec::new(),
        }
    }

    /// Attach a stack trace (builder pattern).
    pub fn with_stacktrace(mut self, stacktrace: Vec<StackFrame>) -> Self {
        self.stacktrace = stacktrace;
        self
    }

    /// Render the stack trace, one numbered frame per line.
    pub fn render_stacktrace(&self) -> String {
        self.stacktrace
            .iter()
            .enumerate()
            .map(|(i, frame)| format!(" [{}] {}", i + 1, frame))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ForeignException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ForeignException {}

// ═══════════════════════════════════════════════════════════════════════
// Safe Call Wrappers
// ═══════════════════════════════════════════════════════════════════════

/// Run a raw runtime operation and translate its pending exception.
///
/// A stale exception left behind by an earlier unchecked call is discarded
/// first, so that it cannot be mis-attributed to `op`.
pub fn guarded<T>(rt: &Runtime, op: impl FnOnce(&Runtime) -> Option<T>) -> Result<T> {
    if let Some(stale) = rt.take_exception() {
        warn!(exception = %stale, "discarding unchecked foreign exception");
    }

    let out = op(rt);

    if let Some(exception) = rt.take_exception() {
        debug!(kind = %exception.kind, message = %exception.message, "foreign exception captured");
        return Err(HoldfastError::Foreign(exception));
    }

    out.ok_or_else(|| {
        HoldfastError::Foreign(ForeignException::new(
            ExceptionKind::ErrorException,
            "foreign call failed without raising an exception",
        ))
    })
}

/// Call `function` with `args`, raising any foreign exception on the host.
pub fn safe_call(rt: &Runtime, function: &Value, args: &[Value]) -> Result<Value> {
    guarded(rt, |rt| rt.call(function, args))
}

/// Call `function` without checking for a pending exception.
///
/// Returns `None` on failure and leaves the exception pending; the caller is
/// responsible for checking [`Runtime::exception_occurred`].
pub fn call(rt: &Runtime, function: &Value, args: &[Value]) -> Option<Value> {
    rt.call(function, args)
}

/// Call the global function `name`.
pub fn safe_call_named(rt: &Runtime, name: &str, args: &[Value]) -> Result<Value> {
    let function = rt.get_global(name).ok_or_else(|| {
        HoldfastError::Foreign(ForeignException::new(
            ExceptionKind::UndefVarError,
            format!("`{}` not defined", name),
        ))
    })?;
    safe_call(rt, &function, args)
}

/// Evaluate `source`, raising any foreign exception on the host.
pub fn safe_eval(rt: &Runtime, source: &str) -> Result<Value> {
    guarded(rt, |rt| rt.eval_string(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_falls_back_to_kind() {
        let e = ForeignException::new(ExceptionKind::KeyError, "");
        assert_eq!(e.message, "KeyError");
    }

    #[test]
    fn test_render_stacktrace() {
        let e = ForeignException::new(ExceptionKind::ErrorException, "boom").with_stacktrace(vec![
            StackFrame::new("inner", Some(3)),
            StackFrame::new("top-level scope", None),
        ]);
        assert_eq!(
            e.render_stacktrace(),
            " [1] inner at line 3\n [2] top-level scope"
        );
        assert_eq!(e.to_string(), "ErrorException: boom");
    }

    #[test]
    fn test_safe_eval_clears_pending_state() {
        let rt = Runtime::new();
        let err = safe_eval(&rt, "1 +").unwrap_err();
        assert_eq!(err.exception_kind(), Some(ExceptionKind::SyntaxError));
        assert!(!rt.exception_occurred());

        assert_eq!(safe_eval(&rt, "1 + 1").unwrap(), Value::I64(2));
    }

    #[test]
    fn test_unchecked_call_leaves_exception_pending() {
        let rt = Runtime::new();
        let error_fn = rt.get_global("error").unwrap();
        assert!(call(&rt, &error_fn, &[Value::string("boom")]).is_none());
        assert!(rt.exception_occurred());

        // The next guarded call must not report the stale exception.
        assert_eq!(safe_eval(&rt, "2").unwrap(), Value::I64(2));
    }

    #[test]
    fn test_safe_call_named_undefined() {
        let rt = Runtime::new();
        let err = safe_call_named(&rt, "nope", &[]).unwrap_err();
        assert_eq!(err.exception_kind(), Some(ExceptionKind::UndefVarError));
    }
}
