//! The per-thread runtime singleton
//!
//! The thread that calls [`initialize`] owns the runtime; proxies created
//! through this module are tied to it. [`shutdown`] tears the runtime down.
//! Proxies that outlive it keep its memory alive, but using them panics.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::bridge;
use crate::context::EvalContext;
use crate::error::{HoldfastError, Result};
use crate::proxy::Proxy;
use crate::runtime::Runtime;

thread_local! {
    static RUNTIME: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
}

/// Start the runtime for this thread, configured from the environment.
///
/// # Errors
///
/// `AlreadyInitialized` if this thread already has a runtime.
pub fn initialize() -> Result<Rc<Runtime>> {
    initialize_with(EvalContext::from_env())
}

/// Start the runtime for this thread with an explicit configuration.
///
/// # Errors
///
/// `AlreadyInitialized` if this thread already has a runtime.
pub fn initialize_with(ctx: EvalContext) -> Result<Rc<Runtime>> {
    RUNTIME.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(HoldfastError::AlreadyInitialized);
        }
        debug!(?ctx, "runtime initialized");
        let rt = Rc::new(Runtime::with_context(ctx));
        *slot = Some(Rc::clone(&rt));
        Ok(rt)
    })
}

/// Shut the runtime down. Does nothing if it is not running.
pub fn shutdown() {
    match RUNTIME.with(|slot| slot.borrow_mut().take()) {
        Some(rt) => rt.shutdown(),
        None => warn!("shutdown without a running runtime"),
    }
}

/// Whether this thread has a running runtime.
pub fn is_initialized() -> bool {
    RUNTIME.with(|slot| slot.borrow().is_some())
}

/// This thread's runtime.
///
/// # Panics
///
/// If [`initialize`] has not been called on this thread.
pub fn runtime() -> Rc<Runtime> {
    RUNTIME
        .with(|slot| slot.borrow().clone())
        .unwrap_or_else(|| panic!("uninitialized runtime: call holdfast::initialize() first"))
}

/// Evaluate `source` in this thread's runtime.
///
/// # Errors
///
/// The foreign exception raised by the evaluation.
pub fn safe_eval(source: &str) -> Result<Proxy> {
    Proxy::eval(&runtime(), source)
}

/// A proxy bound to the global `name`.
///
/// # Errors
///
/// A foreign `UndefVarError` if the global is not defined.
pub fn global(name: &str) -> Result<Proxy> {
    Proxy::global(&runtime(), name)
}

/// Collect garbage now, or at the next safe point.
///
/// Returns the number of objects freed.
pub fn collect_garbage() -> usize {
    runtime().collect_garbage()
}

/// Call the global function `name` and wrap the result.
///
/// # Errors
///
/// The foreign exception raised by the call.
pub fn call(name: &str, args: &[crate::Value]) -> Result<Proxy> {
    let rt = runtime();
    let result = bridge::safe_call_named(&rt, name, args)?;
    Proxy::new(&rt, result)
}
