//! Runtime configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Environment variable overriding [`EvalContext::max_call_depth`].
pub const ENV_MAX_CALL_DEPTH: &str = "HOLDFAST_MAX_CALL_DEPTH";

/// Environment variable overriding [`EvalContext::gc_threshold`].
pub const ENV_GC_THRESHOLD: &str = "HOLDFAST_GC_THRESHOLD";

/// Environment variable enabling [`EvalContext::trace`].
pub const ENV_TRACE: &str = "HOLDFAST_TRACE";

/// Configuration and state for the embedded runtime.
///
/// A context is handed to the runtime once, at initialization, and controls
/// behavior like recursion limits, interruption and collection frequency.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Maximum call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Interrupt flag - set to true to abort evaluation
    pub interrupt: Arc<AtomicBool>,

    /// Whether to trace evaluation (for debugging)
    pub trace: bool,

    /// Number of heap allocations after which a collection is scheduled
    /// for the next safe point. Zero disables automatic collection.
    pub gc_threshold: usize,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            interrupt: Arc::new(AtomicBool::new(false)),
            trace: false,
            gc_threshold: 10_000,
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    /// Create a context with a custom automatic collection threshold.
    pub fn with_gc_threshold(threshold: usize) -> Self {
        Self {
            gc_threshold: threshold,
            ..Default::default()
        }
    }

    /// Create a context from the defaults, overridden by `HOLDFAST_*`
    /// environment variables. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EvalContext::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut ctx = Self::default();

        if let Some(depth) = lookup(ENV_MAX_CALL_DEPTH).and_then(|v| v.trim().parse().ok()) {
            ctx.max_call_depth = depth;
        }
        if let Some(threshold) = lookup(ENV_GC_THRESHOLD).and_then(|v| v.trim().parse().ok()) {
            ctx.gc_threshold = threshold;
        }
        if let Some(trace) = lookup(ENV_TRACE) {
            ctx.trace = matches!(trace.trim(), "1" | "true" | "yes" | "on");
        }

        ctx
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = EvalContext::default();
        assert_eq!(ctx.max_call_depth, 1000);
        assert_eq!(ctx.gc_threshold, 10_000);
        assert!(!ctx.trace);
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let ctx = EvalContext::from_lookup(|key| match key {
            ENV_MAX_CALL_DEPTH => Some("64".to_string()),
            ENV_GC_THRESHOLD => Some(" 5 ".to_string()),
            ENV_TRACE => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(ctx.max_call_depth, 64);
        assert_eq!(ctx.gc_threshold, 5);
        assert!(ctx.trace);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let ctx = EvalContext::from_lookup(|key| match key {
            ENV_MAX_CALL_DEPTH => Some("deep".to_string()),
            _ => None,
        });
        assert_eq!(ctx.max_call_depth, 1000);
    }

    #[test]
    fn test_interrupt_roundtrip() {
        let ctx = EvalContext::new();
        ctx.interrupt();
        assert!(ctx.is_interrupted());
        ctx.reset_interrupt();
        assert!(!ctx.is_interrupted());
    }
}
