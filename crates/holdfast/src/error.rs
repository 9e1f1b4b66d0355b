//! Error types for holdfast
//!
//! Two layers of errors exist. [`EvalError`] is raised inside the foreign
//! runtime while evaluating code; at the boundary of every raw runtime call it
//! is converted into a pending [`ForeignException`]. [`HoldfastError`] is what
//! host code sees from the safe API: foreign exceptions plus the failures of
//! the proxy layer itself.

use proc_macro2::Span;
use thiserror::Error;

use crate::bridge::{ExceptionKind, ForeignException};
use crate::eval::ControlFlow;
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════════
// Environment Errors
// ═══════════════════════════════════════════════════════════════════════

/// Errors raised by binding lookup and assignment.
#[derive(Error, Debug, Clone)]
pub enum EnvironmentError {
    /// No binding with this name exists
    #[error("`{name}` not defined")]
    UndefinedVariable {
        /// The missing name
        name: String,
    },

    /// Assignment to a binding that is not `mut`
    #[error("cannot assign twice to immutable variable `{name}`")]
    ImmutableBinding {
        /// The binding's name
        name: String,
        /// Where the binding was defined
        span: Option<Span>,
    },

    /// Redefinition of a constant
    #[error("invalid redefinition of constant `{name}`")]
    ConstantRedefinition {
        /// The constant's name
        name: String,
    },

    /// Call depth limit exceeded
    #[error("stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth at the time of the failed call
        depth: usize,
        /// Configured maximum
        max: usize,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// Evaluation Errors
// ═══════════════════════════════════════════════════════════════════════

/// Errors raised while evaluating foreign code.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Unknown variable
    #[error("`{name}` not defined")]
    UndefinedVariable {
        /// Variable name
        name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Unknown struct field
    #[error("type {type_name} has no field {field}")]
    UndefinedField {
        /// Field name
        field: String,
        /// Struct type
        type_name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Index past the end of a sequence
    #[error("attempt to access {len}-element {container} at index [{index}]")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Container length
        len: usize,
        /// Container description
        container: String,
        /// Source location
        span: Option<Span>,
    },

    /// Missing dictionary key
    #[error("key {key} not found")]
    KeyNotFound {
        /// Rendered key
        key: String,
        /// Source location
        span: Option<Span>,
    },

    /// General type error
    #[error("{message}")]
    TypeError {
        /// Description
        message: String,
        /// Source location
        span: Option<Span>,
    },

    /// Operator applied to incompatible operands
    #[error("no method matching {left_type} {op} {right_type}")]
    InvalidBinaryOperands {
        /// Operator
        op: String,
        /// Left operand type
        left_type: String,
        /// Right operand type
        right_type: String,
        /// Source location
        span: Option<Span>,
    },

    /// Unary operator applied to an incompatible operand
    #[error("no method matching {op}{operand_type}")]
    InvalidUnaryOperand {
        /// Operator
        op: String,
        /// Operand type
        operand_type: String,
        /// Source location
        span: Option<Span>,
    },

    /// Method call on a value that has no such method
    #[error("no method `{method}` for {type_name}")]
    NoMethod {
        /// Method name
        method: String,
        /// Receiver type
        type_name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Call of a non-function value
    #[error("objects of type {type_name} are not callable")]
    NotCallable {
        /// Callee type
        type_name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Wrong number of arguments
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Expected count
        expected: usize,
        /// Supplied count
        got: usize,
        /// Function name
        name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Checked integer arithmetic overflowed
    #[error("integer overflow")]
    IntegerOverflow {
        /// Source location
        span: Option<Span>,
    },

    /// Integer division or remainder by zero
    #[error("integer division error")]
    DivisionByZero {
        /// Source location
        span: Option<Span>,
    },

    /// Argument outside a function's domain
    #[error("{message}")]
    DomainError {
        /// Description
        message: String,
        /// Source location
        span: Option<Span>,
    },

    /// Assignment to an immutable binding
    #[error("cannot assign to immutable binding `{name}`")]
    ImmutableBinding {
        /// Binding name
        name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Write into an immutable value
    #[error("{type_name} is immutable and cannot be modified")]
    ImmutableValue {
        /// Type of the immutable value
        type_name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Redefinition of a constant
    #[error("invalid redefinition of constant `{name}`")]
    ConstantRedefinition {
        /// Constant name
        name: String,
        /// Source location
        span: Option<Span>,
    },

    /// Expression form the runtime does not evaluate
    #[error("unsupported expression: {kind}")]
    UnsupportedExpr {
        /// Expression description
        kind: String,
        /// Source location
        span: Option<Span>,
    },

    /// Literal form the runtime does not evaluate
    #[error("unsupported literal: {kind}")]
    UnsupportedLiteral {
        /// Literal description
        kind: String,
        /// Source location
        span: Option<Span>,
    },

    /// Left side of an assignment is not a place
    #[error("invalid assignment target: {kind}")]
    InvalidAssignTarget {
        /// Target description
        kind: String,
        /// Source location
        span: Option<Span>,
    },

    /// Call depth limit exceeded
    #[error("stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth at the time of the failed call
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Evaluation was interrupted
    #[error("interrupted")]
    Interrupted,

    /// A builtin rejected its arguments
    #[error("{name}: {message}")]
    BuiltinError {
        /// Builtin name
        name: String,
        /// Description
        message: String,
        /// Source location
        span: Option<Span>,
    },

    /// Explicit `error(..)` or `panic!(..)`
    #[error("{message}")]
    Panic {
        /// User message
        message: String,
        /// Source location
        span: Option<Span>,
    },

    /// A host callback failed
    #[error("host function `{name}` failed: {message}")]
    HostError {
        /// Callback name
        name: String,
        /// Rendered host error
        message: String,
    },

    /// Access through a handle whose object has been collected
    #[error("access to collected object {id}")]
    StaleObject {
        /// Rendered object id
        id: String,
    },

    /// Source failed to parse
    #[error("syntax: {message}")]
    Syntax {
        /// Parser message
        message: String,
        /// Line of the error, if known
        line: Option<usize>,
    },

    /// An already-captured exception travelling back through the evaluator,
    /// e.g. raised inside a host callback that reentered the runtime
    #[error("{0}")]
    Exception(Box<ForeignException>),

    /// Non-local control flow (break/continue/return)
    #[error("control flow escaped its construct")]
    ControlFlow(ControlFlow),
}

impl EvalError {
    /// Foreign exception type this error surfaces as.
    pub fn kind(&self) -> ExceptionKind {
        match self {
            EvalError::UndefinedVariable { .. } => ExceptionKind::UndefVarError,
            EvalError::UndefinedField { .. } => ExceptionKind::FieldError,
            EvalError::IndexOutOfBounds { .. } => ExceptionKind::BoundsError,
            EvalError::KeyNotFound { .. } => ExceptionKind::KeyError,
            EvalError::TypeError { .. } => ExceptionKind::TypeError,
            EvalError::InvalidBinaryOperands { .. }
            | EvalError::InvalidUnaryOperand { .. }
            | EvalError::NoMethod { .. }
            | EvalError::NotCallable { .. }
            | EvalError::ArityMismatch { .. } => ExceptionKind::MethodError,
            EvalError::IntegerOverflow { .. } => ExceptionKind::OverflowError,
            EvalError::DivisionByZero { .. } => ExceptionKind::DivideError,
            EvalError::DomainError { .. } => ExceptionKind::DomainError,
            EvalError::ImmutableBinding { .. }
            | EvalError::ImmutableValue { .. }
            | EvalError::ConstantRedefinition { .. } => ExceptionKind::ImmutableError,
            EvalError::UnsupportedExpr { .. }
            | EvalError::UnsupportedLiteral { .. }
            | EvalError::InvalidAssignTarget { .. } => ExceptionKind::UnsupportedError,
            EvalError::StackOverflow { .. } => ExceptionKind::StackOverflowError,
            EvalError::Interrupted => ExceptionKind::InterruptException,
            EvalError::BuiltinError { .. } => ExceptionKind::ArgumentError,
            EvalError::HostError { .. } => ExceptionKind::HostError,
            EvalError::Syntax { .. } => ExceptionKind::SyntaxError,
            EvalError::Exception(e) => e.kind,
            EvalError::Panic { .. } | EvalError::StaleObject { .. } | EvalError::ControlFlow(_) => {
                ExceptionKind::ErrorException
            }
        }
    }

    /// Source location of the error, if it carries one.
    pub fn span(&self) -> Option<Span> {
        match self {
            EvalError::UndefinedVariable { span, .. }
            | EvalError::UndefinedField { span, .. }
            | EvalError::IndexOutOfBounds { span, .. }
            | EvalError::KeyNotFound { span, .. }
            | EvalError::TypeError { span, .. }
            | EvalError::InvalidBinaryOperands { span, .. }
            | EvalError::InvalidUnaryOperand { span, .. }
            | EvalError::NoMethod { span, .. }
            | EvalError::NotCallable { span, .. }
            | EvalError::ArityMismatch { span, .. }
            | EvalError::IntegerOverflow { span }
            | EvalError::DivisionByZero { span }
            | EvalError::DomainError { span, .. }
            | EvalError::ImmutableBinding { span, .. }
            | EvalError::ImmutableValue { span, .. }
            | EvalError::ConstantRedefinition { span, .. }
            | EvalError::UnsupportedExpr { span, .. }
            | EvalError::UnsupportedLiteral { span, .. }
            | EvalError::InvalidAssignTarget { span, .. }
            | EvalError::BuiltinError { span, .. }
            | EvalError::Panic { span, .. } => *span,
            _ => None,
        }
    }

    /// Attach a span to an error that does not carry one yet.
    pub fn with_span(mut self, at: Option<Span>) -> Self {
        match &mut self {
            EvalError::UndefinedVariable { span, .. }
            | EvalError::UndefinedField { span, .. }
            | EvalError::IndexOutOfBounds { span, .. }
            | EvalError::KeyNotFound { span, .. }
            | EvalError::TypeError { span, .. }
            | EvalError::InvalidBinaryOperands { span, .. }
            | EvalError::ImmutableBinding { span, .. }
            | EvalError::ImmutableValue { span, .. }
            | EvalError::BuiltinError { span, .. }
            | EvalError::Panic { span, .. }
            | EvalError::DomainError { span, .. }
                if span.is_none() =>
            {
                *span = at;
            }
            _ => {}
        }
        self
    }
}

impl From<EnvironmentError> for EvalError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::UndefinedVariable { name } => {
                EvalError::UndefinedVariable { name, span: None }
            }
            EnvironmentError::ImmutableBinding { name, span } => {
                EvalError::ImmutableBinding { name, span }
            }
            EnvironmentError::ConstantRedefinition { name } => {
                EvalError::ConstantRedefinition { name, span: None }
            }
            EnvironmentError::StackOverflow { depth, max } => {
                EvalError::StackOverflow { depth, max }
            }
        }
    }
}

/// Foreign-side type name for a value that does not need the heap to name.
///
/// Heap objects are reported generically; `Runtime::type_name_of` resolves
/// them to `Array`, `Dict`, or the struct's name.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Unit => "()",
        Value::Bool(_) => "bool",
        Value::Char(_) => "char",
        Value::I64(_) => "i64",
        Value::U64(_) => "u64",
        Value::F64(_) => "f64",
        Value::String(_) => "String",
        Value::Object(_) => "object",
        Value::Function(_) => "fn",
        Value::Builtin(_) => "builtin_fn",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Host-Facing Errors
// ═══════════════════════════════════════════════════════════════════════

/// Main error type for holdfast operations.
#[derive(Error, Debug, Clone)]
pub enum HoldfastError {
    /// The foreign runtime raised an exception
    #[error(transparent)]
    Foreign(#[from] ForeignException),

    /// Field or index access on a value that does not support it
    #[error("cannot access {accessor} on a value of type {found}")]
    TypeMismatch {
        /// Rendered accessor, e.g. `.x` or `[3]`
        accessor: String,
        /// Type of the value accessed
        found: String,
    },

    /// Field access on a struct without that field
    #[error("type {type_name} has no field `{field}`")]
    UndefinedField {
        /// Struct type
        type_name: String,
        /// Requested field
        field: String,
    },

    /// Unboxing found a value of the wrong foreign type
    #[error("conversion error: expected {expected}, found {found}")]
    Conversion {
        /// Host type requested
        expected: String,
        /// Foreign value description
        found: String,
    },

    /// The proxy cannot write back to the foreign runtime
    #[error("cannot mutate {target}: {reason}")]
    ImmutableTarget {
        /// Rendered mutation path, or `<temporary>`
        target: String,
        /// Why the target is immutable
        reason: String,
    },

    /// The mutation path no longer resolves
    #[error("mutation path `{path}` is broken at `{step}`: {reason}")]
    BrokenPath {
        /// Full rendered path
        path: String,
        /// Prefix up to and including the failing step
        step: String,
        /// Why the step failed
        reason: String,
        /// Foreign exception raised by the failing step
        #[source]
        cause: Option<ForeignException>,
    },

    /// A root proxy was requested over an object its runtime does not hold
    #[error("object {object} is not live in this runtime")]
    NotLive {
        /// Rendered object id
        object: String,
    },

    /// `initialize` called on a thread that already has a runtime
    #[error("the runtime is already initialized on this thread")]
    AlreadyInitialized,
}

impl HoldfastError {
    /// The foreign exception kind behind this error, if any.
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        match self {
            HoldfastError::Foreign(e) => Some(e.kind),
            HoldfastError::BrokenPath { cause, .. } => cause.as_ref().map(|e| e.kind),
            _ => None,
        }
    }
}

/// Result type alias for holdfast operations
pub type Result<T> = std::result::Result<T, HoldfastError>;
