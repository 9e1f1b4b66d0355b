//! Binary operation evaluation
//!
//! Integer arithmetic is checked. Mixed operands are promoted: two `I64`s or
//! two `U64`s stay as they are, a signed/unsigned mix becomes `I64` (raising
//! on overflow), and anything involving an `F64` becomes `F64`.

use std::cmp::Ordering;

use proc_macro2::Span;
use syn::spanned::Spanned;

use crate::error::type_name;
use crate::heap::HeapObject;
use crate::{Environment, EvalError, Runtime, Value};

use super::{assign, Evaluate};

/// Nesting limit for structural equality, which also cuts cycles.
const MAX_EQ_DEPTH: usize = 64;

impl Evaluate for syn::ExprBinary {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        // Short-circuit evaluation for && and ||
        match &self.op {
            syn::BinOp::And(_) => return eval_logical(self, true, env, rt),
            syn::BinOp::Or(_) => return eval_logical(self, false, env, rt),
            _ => {}
        }

        if let Some(op) = compound_base(&self.op) {
            return eval_compound_assignment(self, op, env, rt);
        }

        // Evaluate both operands
        let left = self.left.eval(env, rt)?;
        let right = self.right.eval(env, rt)?;
        let span = Some(self.op.span());

        match &self.op {
            syn::BinOp::Eq(_) => Ok(Value::Bool(values_equal(rt, &left, &right)?)),
            syn::BinOp::Ne(_) => Ok(Value::Bool(!values_equal(rt, &left, &right)?)),
            syn::BinOp::Lt(_) => compare(&left, &right, "<", span).map(|o| Value::Bool(o.is_lt())),
            syn::BinOp::Le(_) => compare(&left, &right, "<=", span).map(|o| Value::Bool(o.is_le())),
            syn::BinOp::Gt(_) => compare(&left, &right, ">", span).map(|o| Value::Bool(o.is_gt())),
            syn::BinOp::Ge(_) => compare(&left, &right, ">=", span).map(|o| Value::Bool(o.is_ge())),
            op => match arith_op(op) {
                Some(op) => apply(op, left, right, span),
                None => Err(EvalError::UnsupportedExpr {
                    kind: "unknown binary operator".to_string(),
                    span,
                }),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════

/// Arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
            ArithOp::BitAnd => "&",
            ArithOp::BitOr => "|",
            ArithOp::BitXor => "^",
            ArithOp::Shl => "<<",
            ArithOp::Shr => ">>",
        }
    }
}

fn arith_op(op: &syn::BinOp) -> Option<ArithOp> {
    Some(match op {
        syn::BinOp::Add(_) => ArithOp::Add,
        syn::BinOp::Sub(_) => ArithOp::Sub,
        syn::BinOp::Mul(_) => ArithOp::Mul,
        syn::BinOp::Div(_) => ArithOp::Div,
        syn::BinOp::Rem(_) => ArithOp::Rem,
        syn::BinOp::BitAnd(_) => ArithOp::BitAnd,
        syn::BinOp::BitOr(_) => ArithOp::BitOr,
        syn::BinOp::BitXor(_) => ArithOp::BitXor,
        syn::BinOp::Shl(_) => ArithOp::Shl,
        syn::BinOp::Shr(_) => ArithOp::Shr,
        _ => return None,
    })
}

/// The operator underlying a compound assignment (`+=` is `+`).
fn compound_base(op: &syn::BinOp) -> Option<ArithOp> {
    Some(match op {
        syn::BinOp::AddAssign(_) => ArithOp::Add,
        syn::BinOp::SubAssign(_) => ArithOp::Sub,
        syn::BinOp::MulAssign(_) => ArithOp::Mul,
        syn::BinOp::DivAssign(_) => ArithOp::Div,
        syn::BinOp::RemAssign(_) => ArithOp::Rem,
        syn::BinOp::BitAndAssign(_) => ArithOp::BitAnd,
        syn::BinOp::BitOrAssign(_) => ArithOp::BitOr,
        syn::BinOp::BitXorAssign(_) => ArithOp::BitXor,
        syn::BinOp::ShlAssign(_) => ArithOp::Shl,
        syn::BinOp::ShrAssign(_) => ArithOp::Shr,
        _ => return None,
    })
}

/// Evaluate `place op= value` as `place = place op value`.
///
/// The place may be any assignable path (`x`, `a[i]`, `p.f`).
fn eval_compound_assignment(
    binary: &syn::ExprBinary,
    op: ArithOp,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let current = binary.left.eval(env, rt)?;
    let rhs = binary.right.eval(env, rt)?;
    let updated = apply(op, current, rhs, Some(binary.op.span()))?;
    assign::assign_place(&binary.left, updated, env, rt)?;
    Ok(Value::Unit)
}

fn eval_logical(
    binary: &syn::ExprBinary,
    is_and: bool,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    let op = if is_and { "&&" } else { "||" };
    let span = Some(binary.op.span());
    let operand_error = |left: &Value, right: &Value| EvalError::InvalidBinaryOperands {
        op: op.to_string(),
        left_type: type_name(left).to_string(),
        right_type: type_name(right).to_string(),
        span,
    };

    let left = binary.left.eval(env, rt)?;
    match left {
        // Short-circuit
        Value::Bool(b) if b != is_and => Ok(Value::Bool(b)),
        Value::Bool(_) => match binary.right.eval(env, rt)? {
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(operand_error(&left, &other)),
        },
        other => Err(operand_error(&other, &Value::Unit)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Numeric Promotion
// ═══════════════════════════════════════════════════════════════════════

enum Promoted {
    Signed(i64, i64),
    Unsigned(u64, u64),
    Float(f64, f64),
}

fn promote(left: &Value, right: &Value) -> Option<Result<Promoted, ()>> {
    Some(Ok(match (left, right) {
        (Value::I64(a), Value::I64(b)) => Promoted::Signed(*a, *b),
        (Value::U64(a), Value::U64(b)) => Promoted::Unsigned(*a, *b),
        (Value::I64(a), Value::U64(b)) => match i64::try_from(*b) {
            Ok(b) => Promoted::Signed(*a, b),
            Err(_) => return Some(Err(())),
        },
        (Value::U64(a), Value::I64(b)) => match i64::try_from(*a) {
            Ok(a) => Promoted::Signed(a, *b),
            Err(_) => return Some(Err(())),
        },
        (Value::F64(_), _) | (_, Value::F64(_)) => {
            Promoted::Float(left.as_f64()?, right.as_f64()?)
        }
        _ => return None,
    }))
}

/// Apply an arithmetic or bitwise operator to two values.
pub fn apply(op: ArithOp, left: Value, right: Value, span: Option<Span>) -> Result<Value, EvalError> {
    let mismatch = |left: &Value, right: &Value| EvalError::InvalidBinaryOperands {
        op: op.symbol().to_string(),
        left_type: type_name(left).to_string(),
        right_type: type_name(right).to_string(),
        span,
    };

    match (op, &left, &right) {
        // String concatenation
        (ArithOp::Add, Value::String(a), Value::String(b)) => {
            return Ok(Value::string(format!("{}{}", a, b)))
        }
        (ArithOp::Add, Value::String(a), Value::Char(c)) => {
            return Ok(Value::string(format!("{}{}", a, c)))
        }

        // Boolean logic without short-circuit
        (ArithOp::BitAnd, Value::Bool(a), Value::Bool(b)) => return Ok(Value::Bool(*a & *b)),
        (ArithOp::BitOr, Value::Bool(a), Value::Bool(b)) => return Ok(Value::Bool(*a | *b)),
        (ArithOp::BitXor, Value::Bool(a), Value::Bool(b)) => return Ok(Value::Bool(*a ^ *b)),
        _ => {}
    }

    let promoted = match promote(&left, &right) {
        Some(Ok(p)) => p,
        Some(Err(())) => return Err(EvalError::IntegerOverflow { span }),
        None => return Err(mismatch(&left, &right)),
    };

    match promoted {
        Promoted::Signed(a, b) => signed_op(op, a, b, span)?
            .map(Value::I64)
            .ok_or_else(|| mismatch(&left, &right)),
        Promoted::Unsigned(a, b) => unsigned_op(op, a, b, span)?
            .map(Value::U64)
            .ok_or_else(|| mismatch(&left, &right)),
        Promoted::Float(a, b) => float_op(op, a, b)
            .map(Value::F64)
            .ok_or_else(|| mismatch(&left, &right)),
    }
}

/// `Ok(None)` means the operator does not apply to this operand type.
fn signed_op(op: ArithOp, a: i64, b: i64, span: Option<Span>) -> Result<Option<i64>, EvalError> {
    let overflow = EvalError::IntegerOverflow { span };
    if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0 {
        return Err(EvalError::DivisionByZero { span });
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::Rem => a.checked_rem(b),
        ArithOp::BitAnd => Some(a & b),
        ArithOp::BitOr => Some(a | b),
        ArithOp::BitXor => Some(a ^ b),
        ArithOp::Shl => u32::try_from(b).ok().and_then(|s| a.checked_shl(s)),
        ArithOp::Shr => u32::try_from(b).ok().and_then(|s| a.checked_shr(s)),
    };
    result.map(Some).ok_or(overflow)
}

fn unsigned_op(op: ArithOp, a: u64, b: u64, span: Option<Span>) -> Result<Option<u64>, EvalError> {
    let overflow = EvalError::IntegerOverflow { span };
    if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0 {
        return Err(EvalError::DivisionByZero { span });
    }
    let shift = || u32::try_from(b).ok();
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::Rem => a.checked_rem(b),
        ArithOp::BitAnd => Some(a & b),
        ArithOp::BitOr => Some(a | b),
        ArithOp::BitXor => Some(a ^ b),
        ArithOp::Shl => shift().and_then(|s| a.checked_shl(s)),
        ArithOp::Shr => shift().and_then(|s| a.checked_shr(s)),
    };
    result.map(Some).ok_or(overflow)
}

fn float_op(op: ArithOp, a: f64, b: f64) -> Option<f64> {
    match op {
        ArithOp::Add => Some(a + b),
        ArithOp::Sub => Some(a - b),
        ArithOp::Mul => Some(a * b),
        ArithOp::Div => Some(a / b),
        ArithOp::Rem => Some(a % b),
        _ => None,
    }
}

/// Square root, raising a domain error for negative arguments.
pub fn sqrt(value: &Value, span: Option<Span>) -> Result<Value, EvalError> {
    let Some(x) = value.as_f64() else {
        return Err(EvalError::NoMethod {
            method: "sqrt".to_string(),
            type_name: type_name(value).to_string(),
            span,
        });
    };
    if x < 0.0 {
        return Err(EvalError::DomainError {
            message: format!(
                "sqrt was called with a negative real argument ({})",
                x
            ),
            span,
        });
    }
    Ok(Value::F64(x.sqrt()))
}

// ═══════════════════════════════════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════════════════════════════════

fn compare(left: &Value, right: &Value, op: &str, span: Option<Span>) -> Result<Ordering, EvalError> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match promote(left, right) {
            Some(Ok(Promoted::Signed(a, b))) => Some(a.cmp(&b)),
            Some(Ok(Promoted::Unsigned(a, b))) => Some(a.cmp(&b)),
            Some(Ok(Promoted::Float(a, b))) => a.partial_cmp(&b),
            // A u64 beyond i64::MAX against a signed value
            Some(Err(())) => match (left, right) {
                (Value::U64(_), _) => Some(Ordering::Greater),
                _ => Some(Ordering::Less),
            },
            None => None,
        },
    };

    // NaN compares false against everything
    match ordering {
        Some(o) => Ok(o),
        None if left.is_numeric() && right.is_numeric() => Ok(nan_ordering(op)),
        None => Err(EvalError::InvalidBinaryOperands {
            op: op.to_string(),
            left_type: type_name(left).to_string(),
            right_type: type_name(right).to_string(),
            span,
        }),
    }
}

/// An ordering for which `op` evaluates to false.
fn nan_ordering(op: &str) -> Ordering {
    match op {
        "<" | "<=" => Ordering::Greater,
        _ => Ordering::Less,
    }
}

/// Structural equality: primitives by value (numbers across types), heap
/// objects by identity first and then by contents.
pub fn values_equal(rt: &Runtime, left: &Value, right: &Value) -> Result<bool, EvalError> {
    equal_at(rt, left, right, 0)
}

fn equal_at(rt: &Runtime, left: &Value, right: &Value, depth: usize) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            if a == b {
                return Ok(true);
            }
            if depth >= MAX_EQ_DEPTH {
                return Ok(false);
            }
            let a = rt.with_object(*a, |obj| Ok(obj.clone()))?;
            let b = rt.with_object(*b, |obj| Ok(obj.clone()))?;
            match (&a, &b) {
                (HeapObject::Array(x), HeapObject::Array(y))
                | (HeapObject::Tuple(x), HeapObject::Tuple(y)) => {
                    seq_equal(rt, x.iter(), y.iter(), x.len() == y.len(), depth)
                }
                (HeapObject::Struct(x), HeapObject::Struct(y)) => {
                    let same_shape = x.type_name == y.type_name
                        && x.fields.keys().eq(y.fields.keys());
                    seq_equal(rt, x.fields.values(), y.fields.values(), same_shape, depth)
                }
                (HeapObject::Dict(x), HeapObject::Dict(y)) => {
                    if x.len() != y.len() {
                        return Ok(false);
                    }
                    for (k, v) in x {
                        match y.get(k) {
                            Some(w) if equal_at(rt, v, w, depth + 1)? => {}
                            _ => return Ok(false),
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
        _ if left.is_numeric() && right.is_numeric() => Ok(match promote(left, right) {
            Some(Ok(Promoted::Signed(a, b))) => a == b,
            Some(Ok(Promoted::Unsigned(a, b))) => a == b,
            Some(Ok(Promoted::Float(a, b))) => a == b,
            _ => false,
        }),
        _ => Ok(left == right),
    }
}

fn seq_equal<'a>(
    rt: &Runtime,
    left: impl Iterator<Item = &'a Value>,
    right: impl Iterator<Item = &'a Value>,
    same_shape: bool,
    depth: usize,
) -> Result<bool, EvalError> {
    if !same_shape {
        return Ok(false);
    }
    for (l, r) in left.zip(right) {
        if !equal_at(rt, l, r, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}
