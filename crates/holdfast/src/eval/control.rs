//! Control flow mechanism for break/continue/return
//!
//! `break`, `continue` and `return` do not produce values. They return
//! `Err(EvalError::ControlFlow(..))`, which propagates until the enclosing
//! loop or function body catches it.

use crate::{EvalError, Value};

/// Control flow signal for non-local jumps.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// Break out of a loop, optionally with a value and a label.
    Break {
        /// Value to return from the loop
        value: Value,
        /// Optional loop label (`break 'outer`)
        label: Option<String>,
    },

    /// Continue to the next iteration of a loop.
    Continue {
        /// Optional loop label
        label: Option<String>,
    },

    /// Return from a function with a value.
    Return {
        /// Value to return from the function
        value: Value,
    },
}

impl ControlFlow {
    /// Create an unlabeled break with a value.
    pub fn break_with(value: Value) -> Self {
        ControlFlow::Break { value, label: None }
    }

    /// Create a return.
    pub fn return_value(value: Value) -> Self {
        ControlFlow::Return { value }
    }

    /// Whether this break/continue targets a loop with `loop_label`.
    ///
    /// An unlabeled jump targets the innermost loop; a labeled one only the
    /// loop with that label. A return never targets a loop.
    pub fn matches_label(&self, loop_label: Option<&str>) -> bool {
        match self {
            ControlFlow::Break { label, .. } | ControlFlow::Continue { label } => {
                match (label, loop_label) {
                    (None, _) => true,
                    (Some(l), Some(ll)) => l == ll,
                    (Some(_), None) => false,
                }
            }
            ControlFlow::Return { .. } => false,
        }
    }
}

impl PartialEq for ControlFlow {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ControlFlow::Break { value: v1, label: l1 },
                ControlFlow::Break { value: v2, label: l2 },
            ) => v1 == v2 && l1 == l2,
            (ControlFlow::Continue { label: l1 }, ControlFlow::Continue { label: l2 }) => l1 == l2,
            (ControlFlow::Return { value: v1 }, ControlFlow::Return { value: v2 }) => v1 == v2,
            _ => false,
        }
    }
}

/// What a loop does after one evaluation of its body.
pub(crate) enum LoopStep {
    /// Run the next iteration
    Next,
    /// Leave the loop with this value
    Exit(Value),
}

/// Interpret the result of a loop body for a loop labeled `label`.
///
/// Jumps aimed at an outer loop, returns, and real errors propagate.
pub(crate) fn loop_step(
    result: Result<Value, EvalError>,
    label: Option<&str>,
) -> Result<LoopStep, EvalError> {
    match result {
        Ok(_) => Ok(LoopStep::Next),
        Err(EvalError::ControlFlow(cf)) if cf.matches_label(label) => match cf {
            ControlFlow::Break { value, .. } => Ok(LoopStep::Exit(value)),
            _ => Ok(LoopStep::Next),
        },
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_break(label: &str) -> ControlFlow {
        ControlFlow::Break {
            value: Value::Unit,
            label: Some(label.to_string()),
        }
    }

    #[test]
    fn test_unlabeled_matches_any_loop() {
        let cf = ControlFlow::break_with(Value::Unit);
        assert!(cf.matches_label(None));
        assert!(cf.matches_label(Some("outer")));
        assert!(ControlFlow::Continue { label: None }.matches_label(Some("x")));
    }

    #[test]
    fn test_labeled_matches_only_its_loop() {
        let cf = labeled_break("outer");
        assert!(!cf.matches_label(None));
        assert!(cf.matches_label(Some("outer")));
        assert!(!cf.matches_label(Some("inner")));
    }

    #[test]
    fn test_return_never_matches_loop() {
        let cf = ControlFlow::return_value(Value::I64(1));
        assert!(!cf.matches_label(None));
        assert_ne!(cf, ControlFlow::break_with(Value::I64(1)));
    }

    #[test]
    fn test_loop_step() {
        let exit = loop_step(
            Err(EvalError::ControlFlow(ControlFlow::break_with(Value::I64(3)))),
            None,
        );
        assert!(matches!(exit, Ok(LoopStep::Exit(Value::I64(3)))));

        let outer = loop_step(Err(EvalError::ControlFlow(labeled_break("outer"))), None);
        assert!(matches!(outer, Err(EvalError::ControlFlow(_))));

        assert!(matches!(loop_step(Ok(Value::Unit), None), Ok(LoopStep::Next)));
    }
}
