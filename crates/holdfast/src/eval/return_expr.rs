//! Return expression evaluation

use crate::eval::control::ControlFlow;
use crate::{Environment, EvalError, Runtime, Value};

use super::Evaluate;

impl Evaluate for syn::ExprReturn {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        let value = match &self.expr {
            Some(expr) => expr.eval(env, rt)?,
            None => Value::Unit,
        };
        Err(EvalError::ControlFlow(ControlFlow::Return { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_carries_value() {
        let rt = Runtime::new();
        let expr: syn::Expr = syn::parse_str("return 42").unwrap();
        let result = expr.eval(&mut Environment::for_call(), &rt);
        assert!(matches!(
            result,
            Err(EvalError::ControlFlow(ControlFlow::Return { value: Value::I64(42) }))
        ));
    }

    #[test]
    fn test_early_return_from_function() {
        let rt = Runtime::new();
        let value = rt
            .eval_string("fn f(x: i64) { if x > 0 { return 1; } 2 }\nf(5) + f(-5)")
            .unwrap();
        assert_eq!(value, Value::I64(3));
    }

    #[test]
    fn test_top_level_return_ends_evaluation() {
        let rt = Runtime::new();
        assert_eq!(rt.eval_string("return 7; 8"), Some(Value::I64(7)));
    }
}
