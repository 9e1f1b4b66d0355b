//! Expression evaluation

pub mod array;
pub mod assign;
pub mod binary;
pub mod call;
pub mod control;
pub mod field;
pub mod function;
pub mod if_expr;
pub mod index;
pub mod item;
pub mod literal;
pub mod local;
pub mod loops;
pub mod macros;
pub mod path;
pub mod return_expr;
pub mod stmt;
pub mod struct_lit;
pub mod tuple;
pub mod unary;

use crate::{Environment, EvalError, Runtime, Value};

/// Trait for evaluating AST nodes to values.
///
/// This is the core abstraction for the tree-walking interpreter.
/// Each `syn` expression type implements this trait. Local scopes live in
/// `env`; globals, the heap and everything else live in `rt`.
pub trait Evaluate {
    /// Evaluate this AST node.
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::Expr {
    fn eval(&self, env: &mut Environment, rt: &Runtime) -> Result<Value, EvalError> {
        // Check for interruption before each expression
        if rt.context().is_interrupted() {
            return Err(EvalError::Interrupted);
        }

        match self {
            // Basic expressions
            syn::Expr::Lit(expr) => expr.eval(env, rt),
            syn::Expr::Path(expr) => expr.eval(env, rt),
            syn::Expr::Unary(expr) => expr.eval(env, rt),
            syn::Expr::Binary(expr) => expr.eval(env, rt),
            syn::Expr::Cast(expr) => expr.eval(env, rt),

            // Control flow
            syn::Expr::If(expr) => expr.eval(env, rt),
            syn::Expr::Loop(expr) => expr.eval(env, rt),
            syn::Expr::While(expr) => expr.eval(env, rt),
            syn::Expr::ForLoop(expr) => expr.eval(env, rt),
            syn::Expr::Break(expr) => expr.eval(env, rt),
            syn::Expr::Continue(expr) => expr.eval(env, rt),
            syn::Expr::Return(expr) => expr.eval(env, rt),

            // Functions
            syn::Expr::Call(expr) => expr.eval(env, rt),
            syn::Expr::MethodCall(expr) => expr.eval(env, rt),
            syn::Expr::Macro(expr) => expr.eval(env, rt),

            // Places and containers
            syn::Expr::Assign(expr) => assign::eval_assign(expr, env, rt),
            syn::Expr::Index(expr) => expr.eval(env, rt),
            syn::Expr::Field(expr) => expr.eval(env, rt),
            syn::Expr::Array(expr) => expr.eval(env, rt),
            syn::Expr::Repeat(expr) => expr.eval(env, rt),
            syn::Expr::Tuple(expr) => expr.eval(env, rt),
            syn::Expr::Struct(expr) => expr.eval(env, rt),

            // Blocks
            syn::Expr::Block(expr) => stmt::eval_block(&expr.block, env, rt),

            // Containers are shared by reference already; `&x` and `&mut x`
            // evaluate to `x`.
            syn::Expr::Reference(expr) => expr.expr.eval(env, rt),

            // Parenthesized expressions - just unwrap
            syn::Expr::Paren(expr) => expr.expr.eval(env, rt),

            // Group expressions (for precedence) - just unwrap
            syn::Expr::Group(expr) => expr.expr.eval(env, rt),

            // Everything else
            _ => Err(EvalError::UnsupportedExpr {
                kind: expr_kind_name(self).to_string(),
                span: Some(expr_span(self)),
            }),
        }
    }
}

/// Get a human-readable name for an expression kind.
fn expr_kind_name(expr: &syn::Expr) -> &'static str {
    match expr {
        syn::Expr::Async(_) => "async block",
        syn::Expr::Await(_) => "await",
        syn::Expr::Closure(_) => "closure",
        syn::Expr::Const(_) => "const block",
        syn::Expr::Infer(_) => "infer",
        syn::Expr::Let(_) => "let guard",
        syn::Expr::Match(_) => "match",
        syn::Expr::Range(_) => "range outside of a for loop",
        syn::Expr::Try(_) => "try",
        syn::Expr::TryBlock(_) => "try block",
        syn::Expr::Unsafe(_) => "unsafe block",
        syn::Expr::Verbatim(_) => "verbatim",
        syn::Expr::Yield(_) => "yield",
        _ => "unknown",
    }
}

/// Get the span of an expression.
pub(crate) fn expr_span(expr: &syn::Expr) -> proc_macro2::Span {
    use quote::ToTokens;
    expr.to_token_stream()
        .into_iter()
        .next()
        .map(|t| t.span())
        .unwrap_or_else(proc_macro2::Span::call_site)
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience Functions
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate an expression (convenience wrapper).
pub fn eval_expr(
    expr: &syn::Expr,
    env: &mut Environment,
    rt: &Runtime,
) -> Result<Value, EvalError> {
    expr.eval(env, rt)
}

// Re-export for use by other modules
pub use call::call_value;
pub use control::ControlFlow;
pub use stmt::{eval_block, eval_block_stmts, eval_stmt};
