//! Macro invocation evaluation
//!
//! Foreign code has no macro system of its own; a fixed set of macros is
//! built in:
//!
//! - `vec![a, b]`, `vec![x; n]` build arrays
//! - `dict!{k => v, ..}` builds a dict
//! - `format!`, `print!`, `println!`, `panic!` format their arguments
//! - `assert!`, `assert_eq!` raise on failure

use proc_macro2::Span;
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Token};

use crate::heap::HeapObject;
use crate::runtime::source_line;
use crate::value::HashableValue;
use crate::{Environment, EvalError, Runtime, Value};

use super::array::{alloc_array, repeat_elements};
use super::binary::values_equal;
use super::path::{lookup, path_to_string};
use super::Evaluate;

impl Evaluate for syn::ExprMacro {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        eval_macro(&self.mac, env, rt)
    }
}

/// Evaluate a macro invocation in expression or statement position.
///
/// # Errors
///
/// `UnsupportedExpr` for unknown macros, `Syntax` for a malformed body, and
/// `Panic` from `panic!` and failed assertions.
pub fn eval_macro(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    let name = path_to_string(&mac.path);
    let span = Some(mac.path.span());
    match name.as_str() {
        "vec" => eval_vec(mac, env, rt),
        "dict" => eval_dict(mac, env, rt),
        "format" => {
            let text = format_body(mac, env, rt)?;
            Ok(Value::string(text))
        }
        "print" => {
            print!("{}", format_body(mac, env, rt)?);
            Ok(Value::Unit)
        }
        "println" => {
            let text = if mac.tokens.is_empty() {
                String::new()
            } else {
                format_body(mac, env, rt)?
            };
            println!("{}", text);
            Ok(Value::Unit)
        }
        "panic" => {
            let message = if mac.tokens.is_empty() {
                "explicit panic".to_string()
            } else {
                format_body(mac, env, rt)?
            };
            Err(EvalError::Panic { message, span })
        }
        "assert" => eval_assert(mac, env, rt),
        "assert_eq" => eval_assert_eq(mac, env, rt),
        other => Err(EvalError::UnsupportedExpr {
            kind: format!("macro `{}!`", other),
            span,
        }),
    }
}

fn parse_args(mac: &syn::Macro) -> Result<Vec<Expr>, EvalError> {
    mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .map(|args| args.into_iter().collect())
        .map_err(syntax_error)
}

fn syntax_error(err: syn::Error) -> EvalError {
    EvalError::Syntax {
        message: err.to_string(),
        line: source_line(err.span()),
    }
}

fn eval_all(exprs: &[Expr], env: &mut Environment, rt: &Runtime) -> Result<Vec<Value>, EvalError> {
    exprs.iter().map(|expr| expr.eval(env, rt)).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Collections
// ═══════════════════════════════════════════════════════════════════════

enum VecBody {
    List(Vec<Expr>),
    Repeat(Expr, Expr),
}

fn parse_vec_body(input: ParseStream) -> syn::Result<VecBody> {
    if input.is_empty() {
        return Ok(VecBody::List(Vec::new()));
    }
    let first: Expr = input.parse()?;
    if input.peek(Token![;]) {
        input.parse::<Token![;]>()?;
        let count: Expr = input.parse()?;
        return Ok(VecBody::Repeat(first, count));
    }
    let mut items = vec![first];
    while !input.is_empty() {
        input.parse::<Token![,]>()?;
        if input.is_empty() {
            break;
        }
        items.push(input.parse()?);
    }
    Ok(VecBody::List(items))
}

fn eval_vec(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    match mac.parse_body_with(parse_vec_body).map_err(syntax_error)? {
        VecBody::List(items) => {
            let values = eval_all(&items, env, rt)?;
            Ok(alloc_array(rt, values))
        }
        VecBody::Repeat(item, count) => {
            let value = item.eval(env, rt)?;
            let count_val = count.eval(env, rt)?;
            let n = count_val.as_usize().ok_or_else(|| EvalError::TypeError {
                message: format!(
                    "vec! repeat count must be a non-negative integer, got {}",
                    rt.type_name_of(&count_val)
                ),
                span: Some(count.span()),
            })?;
            Ok(alloc_array(rt, repeat_elements(value, n, Some(count.span()))?))
        }
    }
}

struct DictEntry {
    key: Expr,
    value: Expr,
}

impl syn::parse::Parse for DictEntry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let key = input.parse()?;
        input.parse::<Token![=>]>()?;
        let value = input.parse()?;
        Ok(Self { key, value })
    }
}

fn eval_dict(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    let entries = mac
        .parse_body_with(Punctuated::<DictEntry, Token![,]>::parse_terminated)
        .map_err(syntax_error)?;

    let mut map = indexmap::IndexMap::with_capacity(entries.len());
    for entry in &entries {
        let key = entry.key.eval(env, rt)?;
        let value = entry.value.eval(env, rt)?;
        let key_type = rt.type_name_of(&key);
        let key = HashableValue::new(key).ok_or_else(|| EvalError::TypeError {
            message: format!("{} cannot be used as a dict key", key_type),
            span: Some(entry.key.span()),
        })?;
        map.insert(key, value);
    }
    Ok(rt.alloc(HeapObject::Dict(map)))
}

// ═══════════════════════════════════════════════════════════════════════
// Formatting
// ═══════════════════════════════════════════════════════════════════════

/// Parse `"template", args..` and render it.
fn format_body(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<String, EvalError> {
    let exprs = parse_args(mac)?;
    let Some((template, rest)) = exprs.split_first() else {
        return Err(EvalError::Syntax {
            message: "requires at least a format string argument".to_string(),
            line: source_line(mac.path.span()),
        });
    };
    let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(template),
        ..
    }) = template
    else {
        return Err(EvalError::Syntax {
            message: "format argument must be a string literal".to_string(),
            line: source_line(template.span()),
        });
    };
    let args = eval_all(rest, env, rt)?;
    format_template(&template.value(), &args, env, rt, Some(template.span()))
}

/// Substitute `{}`, `{:?}`, `{0}`, and `{name}` placeholders.
///
/// `{{` and `}}` are literal braces.
pub(crate) fn format_template(
    template: &str,
    args: &[Value],
    env: &Environment,
    rt: &Runtime,
    span: Option<Span>,
) -> Result<String, EvalError> {
    let mut out = String::with_capacity(template.len());
    let mut next_arg = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => spec.push(ch),
                        None => {
                            return Err(format_error("unterminated `{` in format string", span))
                        }
                    }
                }
                let (name, debug) = match spec.split_once(':') {
                    Some((name, "?")) => (name, true),
                    Some((_, other)) => {
                        return Err(format_error(&format!("unsupported format spec `{}`", other), span))
                    }
                    None => (spec.as_str(), false),
                };
                let value = if name.is_empty() {
                    next_arg += 1;
                    args.get(next_arg - 1).cloned()
                } else if let Ok(i) = name.parse::<usize>() {
                    args.get(i).cloned()
                } else {
                    lookup(name, env, rt)
                };
                let value = value.ok_or_else(|| {
                    format_error(&format!("no argument for placeholder `{{{}}}`", spec), span)
                })?;
                if debug {
                    out.push_str(&debug_render(rt, &value));
                } else {
                    out.push_str(&rt.render(&value));
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn debug_render(rt: &Runtime, value: &Value) -> String {
    match value {
        Value::String(s) => format!("{:?}", s.as_str()),
        Value::Char(c) => format!("{:?}", c),
        other => rt.render(other),
    }
}

fn format_error(message: &str, span: Option<Span>) -> EvalError {
    EvalError::TypeError {
        message: message.to_string(),
        span,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Assertions
// ═══════════════════════════════════════════════════════════════════════

fn eval_assert(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    let exprs = parse_args(mac)?;
    let Some((cond, message)) = exprs.split_first() else {
        return Err(EvalError::Syntax {
            message: "assert! requires a boolean argument".to_string(),
            line: source_line(mac.path.span()),
        });
    };
    let holds = cond.eval(env, rt)?;
    match holds {
        Value::Bool(true) => Ok(Value::Unit),
        Value::Bool(false) => {
            let message = if message.is_empty() {
                format!("assertion failed: {}", quote::quote!(#cond))
            } else {
                let args = eval_all(&message[1..], env, rt)?;
                let template = message_template(&message[0])?;
                format_template(&template, &args, env, rt, Some(message[0].span()))?
            };
            Err(EvalError::Panic {
                message,
                span: Some(cond.span()),
            })
        }
        other => Err(EvalError::TypeError {
            message: format!("assert! condition must be a bool, got {}", rt.type_name_of(&other)),
            span: Some(cond.span()),
        }),
    }
}

fn eval_assert_eq(mac: &syn::Macro, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
    let exprs = parse_args(mac)?;
    let [left, right, ..] = exprs.as_slice() else {
        return Err(EvalError::Syntax {
            message: "assert_eq! requires two arguments".to_string(),
            line: source_line(mac.path.span()),
        });
    };
    let left_val = left.eval(env, rt)?;
    let right_val = right.eval(env, rt)?;
    if values_equal(rt, &left_val, &right_val)? {
        return Ok(Value::Unit);
    }
    Err(EvalError::Panic {
        message: format!(
            "assertion `left == right` failed\n  left: {}\n right: {}",
            debug_render(rt, &left_val),
            debug_render(rt, &right_val)
        ),
        span: Some(left.span()),
    })
}

fn message_template(expr: &Expr) -> Result<String, EvalError> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) => Ok(s.value()),
        other => Err(EvalError::Syntax {
            message: "assertion message must be a string literal".to_string(),
            line: source_line(other.span()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vec_forms() {
        let rt = Runtime::new();
        assert_eq!(rt.render(&rt.eval_string("vec![1, 2, 3,]").unwrap()), "[1, 2, 3]");
        assert_eq!(rt.render(&rt.eval_string("vec![]").unwrap()), "[]");
        assert_eq!(rt.render(&rt.eval_string("vec![7; 2]").unwrap()), "[7, 7]");
    }

    #[test]
    fn test_dict() {
        let rt = Runtime::new();
        let value = rt.eval_string("dict!{\"a\" => 1, 'b' => vec![2]}").unwrap();
        assert_eq!(rt.render(&value), "{\"a\" => 1, 'b' => [2]}");
        assert!(rt.eval_string("dict!{vec![1] => 1}").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::TypeError)
        );
    }

    #[test]
    fn test_format() {
        let rt = Runtime::new();
        let value = rt
            .eval_string("let who = \"world\"; format!(\"{} {who} {:?} {{{}}} {0}\", 1, \"q\", vec![\"x\"])")
            .unwrap();
        assert_eq!(value, Value::string("1 world \"q\" {[\"x\"]} 1"));
    }

    #[test]
    fn test_format_missing_argument() {
        let rt = Runtime::new();
        assert!(rt.eval_string("format!(\"{} {}\", 1)").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::TypeError)
        );
    }

    #[test]
    fn test_panic_message() {
        let rt = Runtime::new();
        assert!(rt.eval_string("let n = 3;\npanic!(\"bad value {}\", n)").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::ErrorException);
        assert_eq!(exception.message, "bad value 3");
        assert_eq!(exception.stacktrace[0].line, Some(2));
    }

    #[test]
    fn test_assertions() {
        let rt = Runtime::new();
        assert_eq!(rt.eval_string("assert!(1 < 2); assert_eq!(vec![1], vec![1]); 0"), Some(Value::I64(0)));

        assert!(rt.eval_string("assert!(1 > 2)").is_none());
        let message = rt.take_exception().unwrap().message;
        assert!(message.starts_with("assertion failed"), "{}", message);

        assert!(rt.eval_string("assert_eq!(1, 2)").is_none());
        let message = rt.take_exception().unwrap().message;
        assert!(message.contains("left: 1"), "{}", message);
    }

    #[test]
    fn test_unknown_macro() {
        let rt = Runtime::new();
        assert!(rt.eval_string("todo!()").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::UnsupportedError)
        );
    }
}
