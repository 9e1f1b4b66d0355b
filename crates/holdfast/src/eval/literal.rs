//! Literal evaluation

use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprLit {
    fn eval(&self, _env: &mut Environment, _rt: &Runtime) -> Result<Value, EvalError> {
        eval_lit(&self.lit)
    }
}

/// Evaluate a literal to a Value.
pub fn eval_lit(lit: &syn::Lit) -> Result<Value, EvalError> {
    match lit {
        syn::Lit::Str(s) => Ok(Value::string(s.value())),
        syn::Lit::Char(c) => Ok(Value::Char(c.value())),
        syn::Lit::Byte(b) => Ok(Value::U64(u64::from(b.value()))),
        syn::Lit::Int(i) => eval_int_literal(i),
        syn::Lit::Float(f) => eval_float_literal(f),
        syn::Lit::Bool(b) => Ok(Value::Bool(b.value())),
        syn::Lit::ByteStr(_) => Err(EvalError::UnsupportedLiteral {
            kind: "byte string literal".to_string(),
            span: Some(lit.span()),
        }),
        syn::Lit::CStr(_) => Err(EvalError::UnsupportedLiteral {
            kind: "C string literal".to_string(),
            span: Some(lit.span()),
        }),
        _ => Err(EvalError::UnsupportedLiteral {
            kind: "unknown literal".to_string(),
            span: Some(lit.span()),
        }),
    }
}

/// Evaluate an integer literal, respecting suffixes.
///
/// Every signed suffix produces `I64` and every unsigned suffix `U64`, but
/// the literal must still fit the suffixed type.
fn eval_int_literal(lit: &syn::LitInt) -> Result<Value, EvalError> {
    let span = Some(lit.span());

    macro_rules! parse_as {
        ($t:ty, $variant:ident, $wide:ty) => {
            lit.base10_parse::<$t>()
                .map(|n| Value::$variant(n as $wide))
                .map_err(|_| EvalError::IntegerOverflow { span })
        };
    }

    match lit.suffix() {
        "i8" => parse_as!(i8, I64, i64),
        "i16" => parse_as!(i16, I64, i64),
        "i32" => parse_as!(i32, I64, i64),
        // No suffix - default to i64 (like Rust's type inference default for integers)
        "i64" | "isize" | "" => parse_as!(i64, I64, i64),
        "u8" => parse_as!(u8, U64, u64),
        "u16" => parse_as!(u16, U64, u64),
        "u32" => parse_as!(u32, U64, u64),
        "u64" | "usize" => parse_as!(u64, U64, u64),
        "f32" | "f64" => lit
            .base10_parse::<f64>()
            .map(Value::F64)
            .map_err(|e| EvalError::TypeError {
                message: format!("invalid float literal: {}", e),
                span,
            }),
        other => Err(EvalError::UnsupportedLiteral {
            kind: format!("integer with suffix `{}`", other),
            span,
        }),
    }
}

/// Evaluate a float literal, respecting suffixes.
fn eval_float_literal(lit: &syn::LitFloat) -> Result<Value, EvalError> {
    let span = Some(lit.span());

    match lit.suffix() {
        "f32" | "f64" | "" => {
            lit.base10_parse::<f64>()
                .map(Value::F64)
                .map_err(|e| EvalError::TypeError {
                    message: format!("invalid float literal: {}", e),
                    span,
                })
        }
        other => Err(EvalError::UnsupportedLiteral {
            kind: format!("float with suffix `{}`", other),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(src: &str) -> Result<Value, EvalError> {
        let expr: syn::ExprLit = syn::parse_str(src).unwrap();
        eval_lit(&expr.lit)
    }

    #[test]
    fn test_suffixes_collapse_to_wide_types() {
        assert_eq!(lit("7i8").unwrap(), Value::I64(7));
        assert_eq!(lit("7u16").unwrap(), Value::U64(7));
        assert_eq!(lit("7").unwrap(), Value::I64(7));
        assert_eq!(lit("2.5").unwrap(), Value::F64(2.5));
        assert_eq!(lit("3f64").unwrap(), Value::F64(3.0));
    }

    #[test]
    fn test_suffix_range_is_checked() {
        assert!(matches!(
            lit("300u8"),
            Err(EvalError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            lit("128i8"),
            Err(EvalError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(lit("\"hi\"").unwrap(), Value::string("hi"));
        assert_eq!(lit("'x'").unwrap(), Value::Char('x'));
        assert_eq!(lit("b'a'").unwrap(), Value::U64(97));
        assert!(matches!(
            lit("b\"raw\""),
            Err(EvalError::UnsupportedLiteral { .. })
        ));
    }
}
