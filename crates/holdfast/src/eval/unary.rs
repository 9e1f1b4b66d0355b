//! Unary operation and cast evaluation

use proc_macro2::Span;
use syn::spanned::Spanned;

use crate::error::type_name;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprUnary {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let operand = self.expr.eval(env, rt)?;
        let span = Some(self.op.span());

        match &self.op {
            syn::UnOp::Neg(_) => eval_neg(operand, span),
            syn::UnOp::Not(_) => eval_not(operand, span),
            // Values are not references; `*x` is `x`
            syn::UnOp::Deref(_) => Ok(operand),
            _ => Err(EvalError::UnsupportedExpr {
                kind: "unknown unary operator".to_string(),
                span,
            }),
        }
    }
}

/// Evaluate unary negation (`-x`).
pub(crate) fn eval_neg(operand: Value, span: Option<Span>) -> Result<Value, EvalError> {
    match operand {
        Value::I64(n) => n
            .checked_neg()
            .map(Value::I64)
            .ok_or(EvalError::IntegerOverflow { span }),
        Value::F64(n) => Ok(Value::F64(-n)),
        other => Err(EvalError::InvalidUnaryOperand {
            op: "-".to_string(),
            operand_type: type_name(&other).to_string(),
            span,
        }),
    }
}

/// Evaluate logical/bitwise not (`!x`).
pub(crate) fn eval_not(operand: Value, span: Option<Span>) -> Result<Value, EvalError> {
    match operand {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        Value::I64(n) => Ok(Value::I64(!n)),
        Value::U64(n) => Ok(Value::U64(!n)),
        other => Err(EvalError::InvalidUnaryOperand {
            op: "!".to_string(),
            operand_type: type_name(&other).to_string(),
            span,
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Casts
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprCast {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let value = self.expr.eval(env, rt)?;
        let span = Some(self.as_token.span);
        let target = match self.ty.as_ref() {
            syn::Type::Path(ty) if ty.qself.is_none() => ty
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        cast(value, &target, span)
    }
}

/// Numeric `as` conversion with Rust's wrapping/saturating semantics.
fn cast(value: Value, target: &str, span: Option<Span>) -> Result<Value, EvalError> {
    macro_rules! int_cast {
        ($t:ty, $variant:ident, $wide:ty) => {
            match value {
                Value::I64(n) => Ok(Value::$variant(n as $t as $wide)),
                Value::U64(n) => Ok(Value::$variant(n as $t as $wide)),
                Value::F64(n) => Ok(Value::$variant(n as $t as $wide)),
                Value::Bool(b) => Ok(Value::$variant(b as $t as $wide)),
                Value::Char(c) => Ok(Value::$variant(c as u32 as $t as $wide)),
                other => Err(invalid_cast(&other, target, span)),
            }
        };
    }

    match target {
        "i8" => int_cast!(i8, I64, i64),
        "i16" => int_cast!(i16, I64, i64),
        "i32" => int_cast!(i32, I64, i64),
        "i64" | "isize" => int_cast!(i64, I64, i64),
        "u8" => int_cast!(u8, U64, u64),
        "u16" => int_cast!(u16, U64, u64),
        "u32" => int_cast!(u32, U64, u64),
        "u64" | "usize" => int_cast!(u64, U64, u64),
        "f32" => match value.as_f64() {
            Some(x) => Ok(Value::F64(x as f32 as f64)),
            None => Err(invalid_cast(&value, target, span)),
        },
        "f64" => match value.as_f64() {
            Some(x) => Ok(Value::F64(x)),
            None => Err(invalid_cast(&value, target, span)),
        },
        "char" => match value {
            Value::U64(n) if n <= u64::from(u8::MAX) => Ok(Value::Char(char::from(n as u8))),
            Value::Char(c) => Ok(Value::Char(c)),
            other => Err(invalid_cast(&other, target, span)),
        },
        _ => Err(EvalError::UnsupportedExpr {
            kind: format!("cast to `{}`", target),
            span,
        }),
    }
}

fn invalid_cast(value: &Value, target: &str, span: Option<Span>) -> EvalError {
    EvalError::TypeError {
        message: format!("non-primitive cast: `{}` as `{}`", type_name(value), target),
        span,
    }
}
