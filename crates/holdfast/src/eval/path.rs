//! Path evaluation (variable lookup)

use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprPath {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let name = simple_name(&self.path)?;
        lookup(&name, env, rt).ok_or_else(|| EvalError::UndefinedVariable {
            span: Some(self.path.segments[0].ident.span()),
            name,
        })
    }
}

/// Resolve a name: innermost local scope first, then globals.
pub(crate) fn lookup(name: &str, env: &Environment, rt: &Runtime) -> Option<Value> {
    env.get(name).cloned().or_else(|| rt.lookup_global(name))
}

/// The single identifier of a path, rejecting qualified and generic paths.
pub(crate) fn simple_name(path: &syn::Path) -> Result<String, EvalError> {
    let segment = match path.segments.first() {
        Some(segment) if path.segments.len() == 1 && path.leading_colon.is_none() => segment,
        _ => {
            return Err(EvalError::UnsupportedExpr {
                kind: format!("qualified path `{}`", path_to_string(path)),
                span: path.segments.first().map(|s| s.ident.span()),
            })
        }
    };

    if !matches!(segment.arguments, syn::PathArguments::None) {
        return Err(EvalError::UnsupportedExpr {
            kind: format!("path with type arguments `{}`", segment.ident),
            span: Some(segment.ident.span()),
        });
    }

    Ok(segment.ident.to_string())
}

/// Convert a syn::Path to a string for error messages.
pub fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindingMode;

    #[test]
    fn test_local_shadows_global() {
        let rt = Runtime::new();
        rt.define_global("x", Value::I64(1), BindingMode::Immutable)
            .unwrap();

        let expr: syn::ExprPath = syn::parse_quote!(x);
        let mut env = Environment::for_call();
        assert_eq!(expr.eval(&mut env, &rt).unwrap(), Value::I64(1));

        env.define("x", Value::I64(2));
        assert_eq!(expr.eval(&mut env, &rt).unwrap(), Value::I64(2));
    }

    #[test]
    fn test_undefined_variable() {
        let rt = Runtime::new();
        let expr: syn::ExprPath = syn::parse_quote!(undefined_var);
        match expr.eval(&mut Environment::new(), &rt) {
            Err(EvalError::UndefinedVariable { name, .. }) => assert_eq!(name, "undefined_var"),
            other => panic!("expected UndefinedVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_qualified_path_unsupported() {
        let rt = Runtime::new();
        let expr: syn::ExprPath = syn::parse_quote!(std::f64::consts::PI);
        assert!(matches!(
            expr.eval(&mut Environment::new(), &rt),
            Err(EvalError::UnsupportedExpr { .. })
        ));
    }

    #[test]
    fn test_path_to_string() {
        let path: syn::Path = syn::parse_quote!(a::b::c);
        assert_eq!(path_to_string(&path), "a::b::c");
    }
}
