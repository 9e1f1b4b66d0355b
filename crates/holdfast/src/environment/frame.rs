//! Block scopes that close themselves

use super::Environment;

/// A local scope that is popped when the guard goes out of scope.
///
/// Blocks and loop bodies open one per entry, so bindings made inside them
/// are discarded even when evaluation leaves early with an error or a
/// `break`.
///
/// ```
/// use holdfast::{Environment, Value};
///
/// let mut env = Environment::for_call();
/// env.define("total", Value::I64(0));
/// {
///     let mut body = env.scope_guard();
///     body.define("item", Value::I64(4));
///     assert!(body.contains("total"));
/// }
/// assert!(!env.contains("item"));
/// ```
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
}

impl Environment {
    /// Open a local scope that closes when the returned guard drops.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { env: self }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl std::ops::Deref for ScopeGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl std::ops::DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}
