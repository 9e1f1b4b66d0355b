//! One instance of the embedded runtime
//!
//! [`Runtime`] owns the heap, the globals, the struct table, and the
//! reference registry. Its raw API works like a C embedding API: calls return
//! `Option` and record failures in a pending-exception slot that the caller
//! checks with [`Runtime::exception_occurred`] or, more usually, through the
//! wrappers in [`crate::bridge`].
//!
//! All state sits behind `RefCell`/`Cell` so the runtime can be reentered from
//! host callbacks, which receive `&Runtime` while foreign code is running.
//! Borrows are never held across evaluation.
//!
//! # Safe points
//!
//! Collection only runs when no foreign code is executing: at the end of the
//! outermost raw call, at an explicit [`Runtime::collect_garbage`] from the
//! host, or when a [`GcInhibitGuard`] is released. Requests made while
//! foreign code runs are deferred until then. At a safe point the roots are
//! the globals, everything pinned in the registry, and the arguments and
//! result of the call that just finished.

use std::cell::{Cell, RefCell};
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::bridge::{ForeignException, StackFrame};
use crate::context::EvalContext;
use crate::environment::{Binding, BindingMode, Environment, Globals};
use crate::error::{type_name, EvalError, HoldfastError};
use crate::eval::{self, ControlFlow};
use crate::heap::{Heap, HeapObject, HeapStats, ObjectId};
use crate::registry::{PinKey, ReferenceRegistry};
use crate::value::{self, BuiltinFn, StructDecl, Value, ValueKind};

/// Name of the outermost frame in stack traces.
const TOP_LEVEL_FRAME: &str = "top-level scope";

/// The embedded interpreter.
pub struct Runtime {
    ctx: EvalContext,
    heap: RefCell<Heap>,
    globals: RefCell<Globals>,
    structs: RefCell<IndexMap<String, StructDecl>>,
    registry: RefCell<ReferenceRegistry>,
    pending: RefCell<Option<ForeignException>>,
    call_stack: RefCell<Vec<StackFrame>>,
    unwinding: RefCell<Option<Vec<StackFrame>>>,
    depth: Cell<usize>,
    gc_requested: Cell<bool>,
    gc_inhibit: Cell<usize>,
    alive: Cell<bool>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("alive", &self.alive.get())
            .field("depth", &self.depth.get())
            .field("globals", &self.globals.borrow().len())
            .field("pinned", &self.registry.borrow().len())
            .field("heap", &self.heap.borrow().stats())
            .finish()
    }
}

impl Runtime {
    /// Create a runtime with default settings.
    pub fn new() -> Self {
        Self::with_context(EvalContext::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_context(ctx: EvalContext) -> Self {
        debug!(
            max_call_depth = ctx.max_call_depth,
            gc_threshold = ctx.gc_threshold,
            "runtime created"
        );
        Self {
            ctx,
            heap: RefCell::new(Heap::new()),
            globals: RefCell::new(Globals::with_prelude()),
            structs: RefCell::new(IndexMap::new()),
            registry: RefCell::new(ReferenceRegistry::new()),
            pending: RefCell::new(None),
            call_stack: RefCell::new(Vec::new()),
            unwinding: RefCell::new(None),
            depth: Cell::new(0),
            gc_requested: Cell::new(false),
            gc_inhibit: Cell::new(0),
            alive: Cell::new(true),
        }
    }

    /// The runtime's configuration.
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════

    /// Whether the runtime has not been shut down.
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Tear the runtime down, dropping every object and registration.
    ///
    /// Outstanding handles stay memory-safe; using them panics.
    pub fn shutdown(&self) {
        if !self.alive.replace(false) {
            return;
        }
        let pinned = self.registry.borrow().len();
        self.registry.borrow_mut().clear();
        *self.globals.borrow_mut() = Globals::new();
        self.structs.borrow_mut().clear();
        *self.heap.borrow_mut() = Heap::new();
        self.pending.borrow_mut().take();
        debug!(pinned, "runtime shut down");
    }

    pub(crate) fn assert_alive(&self) {
        assert!(
            self.alive.get(),
            "holdfast runtime used after shutdown (uninitialized runtime)"
        );
    }

    // ═══════════════════════════════════════════════════════════════════
    // Raw Embedding API
    // ═══════════════════════════════════════════════════════════════════

    /// Evaluate source text at global scope.
    ///
    /// Returns the value of the last expression, or `None` with an exception
    /// pending.
    pub fn eval_string(&self, source: &str) -> Option<Value> {
        if self.ctx.trace {
            debug!(source, "eval_string");
        } else {
            trace!(source, "eval_string");
        }
        self.foreign_op(&[], |rt| {
            let block = parse_source(source)?;
            let mut env = Environment::new();
            match eval::eval_block_stmts(&block.stmts, &mut env, rt) {
                Err(EvalError::ControlFlow(ControlFlow::Return { value })) => Ok(value),
                Err(EvalError::ControlFlow(_)) => Err(EvalError::Panic {
                    message: "break or continue outside of a loop".to_string(),
                    span: None,
                }),
                other => other,
            }
        })
    }

    /// Call a function value.
    pub fn call(&self, function: &Value, args: &[Value]) -> Option<Value> {
        self.foreign_op(args, |rt| {
            eval::call_value(rt, function.clone(), args.to_vec(), None)
        })
    }

    /// Assign to a global, creating it as a mutable binding if missing.
    ///
    /// Fails with `ImmutableError` if the existing binding is not mutable.
    pub fn assign_global(&self, name: &str, value: Value) -> Option<()> {
        self.foreign_op(std::slice::from_ref(&value), |rt| {
            let exists = rt.globals.borrow().contains(name);
            if exists {
                rt.assign_global_checked(name, value.clone())?;
            } else {
                rt.define_global_checked(name, value.clone(), BindingMode::Mutable, None)?;
            }
            Ok(value.clone())
        })
        .map(|_| ())
    }

    /// Define (or redefine) a global with the given mode.
    pub fn define_global(&self, name: &str, value: Value, mode: BindingMode) -> Option<()> {
        self.foreign_op(std::slice::from_ref(&value), |rt| {
            rt.define_global_checked(name, value.clone(), mode, None)?;
            Ok(Value::Unit)
        })
        .map(|_| ())
    }

    /// Current value of a global.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.assert_alive();
        self.lookup_global(name)
    }

    /// Mode of a global, or `None` if it is not defined.
    pub fn binding_mode(&self, name: &str) -> Option<BindingMode> {
        self.assert_alive();
        self.globals.borrow().mode(name)
    }

    /// Names of all globals, in definition order.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names().map(str::to_string).collect()
    }

    /// Register a host function callable from foreign code by `name`.
    ///
    /// The callback may reenter the runtime. An `Err` it returns is raised
    /// foreign-side as a `HostError`, unless it wraps a foreign exception, in
    /// which case that exception continues to propagate unchanged.
    pub fn register_function<F>(&self, name: &str, arity: i32, f: F) -> Option<()>
    where
        F: Fn(&Runtime, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        let host_name = name.to_string();
        let builtin = BuiltinFn::new(name, arity, move |rt, args| {
            let result = f(rt, args);
            match (result, rt.take_exception()) {
                (_, Some(exception)) => Err(EvalError::Exception(Box::new(exception))),
                (Ok(value), None) => Ok(value),
                (Err(err), None) => Err(host_error(&host_name, err)),
            }
        });
        debug!(name, arity, "host function registered");
        self.define_global(name, Value::Builtin(builtin), BindingMode::Constant)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pending Exception
    // ═══════════════════════════════════════════════════════════════════

    /// Whether an exception is pending.
    pub fn exception_occurred(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Take the pending exception, clearing the slot.
    pub fn take_exception(&self) -> Option<ForeignException> {
        self.pending.borrow_mut().take()
    }

    fn raise(&self, err: EvalError) {
        let stale_trace = self.unwinding.borrow_mut().take();
        let exception = match err {
            EvalError::Exception(exception) => *exception,
            other => {
                let line = other.span().and_then(source_line).or(match &other {
                    EvalError::Syntax { line, .. } => *line,
                    _ => None,
                });
                let mut frames = stale_trace.unwrap_or_else(|| {
                    self.call_stack.borrow().iter().rev().cloned().collect()
                });
                if frames.is_empty() {
                    frames.push(StackFrame::new(TOP_LEVEL_FRAME, line));
                } else if line.is_some() {
                    frames[0].line = line;
                }
                if frames.last().map(|f| f.function.as_str()) != Some(TOP_LEVEL_FRAME) {
                    frames.push(StackFrame::new(TOP_LEVEL_FRAME, None));
                }
                ForeignException::new(other.kind(), other.to_string()).with_stacktrace(frames)
            }
        };

        debug!(kind = %exception.kind, message = %exception.message, "foreign exception raised");
        if let Some(previous) = self.pending.borrow_mut().replace(exception) {
            warn!(exception = %previous, "pending foreign exception overwritten");
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reference Registry
    // ═══════════════════════════════════════════════════════════════════

    /// Pin `value` against collection.
    ///
    /// Values that live inline need no pin; their key is empty.
    pub fn create_reference(&self, value: &Value) -> PinKey {
        self.assert_alive();
        match value.object_id() {
            Some(id) => {
                let count = self.registry.borrow_mut().pin(id);
                trace!(%id, count, "pin");
                PinKey::pinned(id)
            }
            None => PinKey::inline(),
        }
    }

    /// Release a pin obtained from [`Runtime::create_reference`].
    ///
    /// Releasing after shutdown is a no-op. Releasing an id that is not
    /// registered is a programming error: fatal in debug builds, ignored in
    /// release builds.
    pub fn free_reference(&self, key: PinKey) {
        let Some(id) = key.id() else {
            return;
        };
        if !self.alive.get() {
            return;
        }
        match self.registry.borrow_mut().unpin(id) {
            Some(0) => trace!(%id, "unpin (eligible for collection)"),
            Some(count) => trace!(%id, count, "unpin"),
            None => {
                warn!(%id, "free_reference on an unregistered object");
                debug_assert!(false, "free_reference: {} is not registered", id);
            }
        }
    }

    /// Number of host references pinning `value` (zero for inline values).
    pub fn reference_count(&self, value: &Value) -> usize {
        value
            .object_id()
            .map(|id| self.registry.borrow().count(id))
            .unwrap_or(0)
    }

    /// Number of distinct pinned objects.
    pub fn pinned_objects(&self) -> usize {
        self.registry.borrow().len()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Garbage Collection
    // ═══════════════════════════════════════════════════════════════════

    /// Collect garbage now, or at the next safe point if foreign code is
    /// running or collection is inhibited.
    ///
    /// Returns the number of objects freed (zero when deferred).
    pub fn collect_garbage(&self) -> usize {
        self.assert_alive();
        if self.depth.get() > 0 || self.gc_inhibit.get() > 0 {
            trace!("collection deferred to next safe point");
            self.gc_requested.set(true);
            return 0;
        }
        self.run_collection(Vec::new())
    }

    /// Schedule a collection for the next safe point.
    pub fn request_gc(&self) {
        self.gc_requested.set(true);
    }

    /// Hold off collection until the guard is dropped.
    pub fn inhibit_gc(&self) -> GcInhibitGuard<'_> {
        self.gc_inhibit.set(self.gc_inhibit.get() + 1);
        GcInhibitGuard { rt: self }
    }

    /// Whether the object behind `value` is still allocated (always true for
    /// inline values).
    pub fn is_live(&self, value: &Value) -> bool {
        match value.object_id() {
            Some(id) => self.heap.borrow().is_live(id),
            None => true,
        }
    }

    /// Heap counters.
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.borrow().stats()
    }

    fn safe_point(&self, inputs: &[Value], result: Option<&Value>) {
        if !self.gc_requested.get() || self.gc_inhibit.get() > 0 || !self.alive.get() {
            return;
        }
        let in_flight = inputs
            .iter()
            .chain(result)
            .filter_map(Value::object_id)
            .collect();
        self.run_collection(in_flight);
    }

    fn run_collection(&self, in_flight: Vec<ObjectId>) -> usize {
        self.gc_requested.set(false);
        let mut roots: Vec<ObjectId> = self
            .globals
            .borrow()
            .values()
            .filter_map(Value::object_id)
            .collect();
        roots.extend(self.registry.borrow().pinned());
        roots.extend(in_flight);

        let freed = self.heap.borrow_mut().collect(roots);
        debug!(
            freed,
            live = self.heap.borrow().live_objects(),
            "garbage collection"
        );
        freed
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// Classify a value.
    pub fn classify(&self, value: &Value) -> ValueKind {
        ValueKind::of(value, &self.heap.borrow())
    }

    /// Foreign-side type name (`Array`, a struct's name, `i64`, ...).
    pub fn type_name_of(&self, value: &Value) -> String {
        match value.object_id() {
            Some(id) => self
                .heap
                .borrow()
                .get(id)
                .map(|obj| obj.type_name().to_string())
                .unwrap_or_else(|| "<freed>".to_string()),
            None => type_name(value).to_string(),
        }
    }

    /// Render a value the way foreign code prints it.
    pub fn render(&self, value: &Value) -> String {
        value::render(value, &self.heap.borrow())
    }

    /// Number of elements, fields, or characters.
    pub fn len_of(&self, value: &Value) -> Result<usize, EvalError> {
        match value {
            Value::String(s) => Ok(s.chars().count()),
            Value::Object(id) => self.with_object(*id, |obj| Ok(obj.len())),
            other => Err(EvalError::NoMethod {
                method: "len".to_string(),
                type_name: type_name(other).to_string(),
                span: None,
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Evaluator Internals
    // ═══════════════════════════════════════════════════════════════════

    fn foreign_op(
        &self,
        inputs: &[Value],
        op: impl FnOnce(&Self) -> Result<Value, EvalError>,
    ) -> Option<Value> {
        self.assert_alive();
        let outermost = self.depth.get() == 0;
        if outermost {
            self.unwinding.borrow_mut().take();
        }

        let result = {
            let _depth = DepthGuard::enter(&self.depth);
            op(self)
        };

        let out = match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.raise(err);
                None
            }
        };
        if outermost {
            self.safe_point(inputs, out.as_ref());
        }
        out
    }

    /// Allocate a heap object.
    pub(crate) fn alloc(&self, object: HeapObject) -> Value {
        let mut heap = self.heap.borrow_mut();
        let id = heap.alloc(object);
        if self.ctx.gc_threshold > 0 && heap.allocations_since_gc() >= self.ctx.gc_threshold {
            self.gc_requested.set(true);
        }
        Value::Object(id)
    }

    /// Run `f` against a live object.
    pub(crate) fn with_object<R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&HeapObject) -> Result<R, EvalError>,
    ) -> Result<R, EvalError> {
        let heap = self.heap.borrow();
        let object = heap
            .get(id)
            .ok_or_else(|| EvalError::StaleObject { id: id.to_string() })?;
        f(object)
    }

    /// Run `f` against a live object, mutably.
    pub(crate) fn with_object_mut<R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut HeapObject) -> Result<R, EvalError>,
    ) -> Result<R, EvalError> {
        let mut heap = self.heap.borrow_mut();
        let object = heap
            .get_mut(id)
            .ok_or_else(|| EvalError::StaleObject { id: id.to_string() })?;
        f(object)
    }

    pub(crate) fn lookup_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub(crate) fn define_global_checked(
        &self,
        name: &str,
        value: Value,
        mode: BindingMode,
        span: Option<proc_macro2::Span>,
    ) -> Result<(), EvalError> {
        trace!(name, ?mode, "define global");
        self.globals
            .borrow_mut()
            .define(Binding {
                span,
                ..Binding::new(name, value, mode)
            })
            .map_err(EvalError::from)
    }

    pub(crate) fn assign_global_checked(&self, name: &str, value: Value) -> Result<(), EvalError> {
        self.globals
            .borrow_mut()
            .assign(name, value)
            .map_err(EvalError::from)
    }

    pub(crate) fn define_struct(&self, decl: StructDecl) {
        trace!(name = %decl.name, frozen = decl.frozen, "define struct");
        self.structs.borrow_mut().insert(decl.name.clone(), decl);
    }

    pub(crate) fn struct_decl(&self, name: &str) -> Option<StructDecl> {
        self.structs.borrow().get(name).cloned()
    }

    /// Push a call frame, failing when the depth limit is reached.
    pub(crate) fn enter_call(&self, frame: StackFrame) -> Result<CallGuard<'_>, EvalError> {
        let depth = self.call_stack.borrow().len();
        if depth >= self.ctx.max_call_depth {
            return Err(EvalError::StackOverflow {
                depth,
                max: self.ctx.max_call_depth,
            });
        }
        self.call_stack.borrow_mut().push(frame);
        Ok(CallGuard { rt: self })
    }

    /// Record the call stack of an error that is unwinding, once.
    pub(crate) fn note_unwinding(&self) {
        let mut unwinding = self.unwinding.borrow_mut();
        if unwinding.is_none() {
            *unwinding = Some(self.call_stack.borrow().iter().rev().cloned().collect());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Guards
// ═══════════════════════════════════════════════════════════════════════

struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Pops a call frame when dropped.
pub(crate) struct CallGuard<'a> {
    rt: &'a Runtime,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.rt.call_stack.borrow_mut().pop();
    }
}

/// RAII guard returned by [`Runtime::inhibit_gc`].
///
/// Dropping the last guard at a safe point runs any collection requested in
/// the meantime.
pub struct GcInhibitGuard<'a> {
    rt: &'a Runtime,
}

impl Drop for GcInhibitGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.rt.gc_inhibit.get().saturating_sub(1);
        self.rt.gc_inhibit.set(remaining);
        if remaining == 0 && self.rt.depth.get() == 0 {
            self.rt.safe_point(&[], None);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

/// Parse source text as the statements of a block.
///
/// The source is wrapped in braces on their own lines, so reported lines are
/// shifted back by one.
fn parse_source(source: &str) -> Result<syn::Block, EvalError> {
    let wrapped = format!("{{\n{}\n}}", source);
    syn::parse_str::<syn::Block>(&wrapped).map_err(|e| EvalError::Syntax {
        message: e.to_string(),
        line: source_line(e.span()),
    })
}

/// Line in the caller's source for a span produced by [`parse_source`].
pub(crate) fn source_line(span: proc_macro2::Span) -> Option<usize> {
    span.start().line.checked_sub(1).filter(|line| *line > 0)
}

fn host_error(name: &str, err: anyhow::Error) -> EvalError {
    if let Some(HoldfastError::Foreign(exception)) = err.downcast_ref::<HoldfastError>() {
        return EvalError::Exception(Box::new(exception.clone()));
    }
    if let Some(exception) = err.downcast_ref::<ForeignException>() {
        return EvalError::Exception(Box::new(exception.clone()));
    }
    EvalError::HostError {
        name: name.to_string(),
        message: format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ExceptionKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_eval_string_returns_last_value() {
        let rt = Runtime::new();
        assert_eq!(rt.eval_string("let x = 20; x + 22"), Some(Value::I64(42)));
        assert!(!rt.exception_occurred());
    }

    #[test]
    fn test_top_level_let_defines_global() {
        let rt = Runtime::new();
        rt.eval_string("let mut counter = 1;").unwrap();
        assert_eq!(rt.get_global("counter"), Some(Value::I64(1)));
        assert_eq!(rt.binding_mode("counter"), Some(BindingMode::Mutable));
    }

    #[test]
    fn test_failure_sets_pending_exception() {
        let rt = Runtime::new();
        assert!(rt.eval_string("undefined_thing").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::UndefVarError);
        assert!(!exception.message.is_empty());
        assert!(!rt.exception_occurred());
    }

    #[test]
    fn test_syntax_error_line() {
        let rt = Runtime::new();
        assert!(rt.eval_string("let a = 1;\nlet b = ;").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::SyntaxError);
        assert_eq!(exception.stacktrace[0].line, Some(2));
    }

    #[test]
    fn test_stacktrace_names_functions() {
        let rt = Runtime::new();
        rt.eval_string("fn inner() { error(\"boom\") }\nfn outer() { inner() }")
            .unwrap();
        assert!(rt.eval_string("outer()").is_none());
        let exception = rt.take_exception().unwrap();
        let names: Vec<_> = exception
            .stacktrace
            .iter()
            .map(|f| f.function.as_str())
            .collect();
        assert_eq!(names, vec!["inner", "outer", TOP_LEVEL_FRAME]);
    }

    #[test]
    fn test_assign_global_creates_mutable() {
        let rt = Runtime::new();
        rt.assign_global("fresh", Value::I64(1)).unwrap();
        assert_eq!(rt.binding_mode("fresh"), Some(BindingMode::Mutable));

        rt.eval_string("let fixed = 1;").unwrap();
        assert!(rt.assign_global("fixed", Value::I64(2)).is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::ImmutableError)
        );
    }

    #[test]
    fn test_unpinned_object_is_collected() {
        let rt = Runtime::new();
        let kept = rt.eval_string("vec![1, 2]").unwrap();
        let dropped = rt.eval_string("vec![3, 4]").unwrap();
        let key = rt.create_reference(&kept);

        rt.collect_garbage();
        assert!(rt.is_live(&kept));
        assert!(!rt.is_live(&dropped));

        rt.free_reference(key);
        rt.collect_garbage();
        assert!(!rt.is_live(&kept));
    }

    #[test]
    fn test_gc_inside_foreign_code_is_deferred() {
        let rt = Runtime::new();
        let result = rt.eval_string("let t = vec![1]; gc(); vec![t, t]").unwrap();
        // The in-flight result survived the deferred collection...
        assert!(rt.is_live(&result));
        assert_eq!(rt.heap_stats().gc_runs, 1);
        // ...but nothing keeps it alive past the next one.
        rt.collect_garbage();
        assert!(!rt.is_live(&result));
    }

    #[test]
    fn test_inhibit_guard_defers_collection() {
        let rt = Runtime::new();
        let value = rt.eval_string("vec![1]").unwrap();
        {
            let _guard = rt.inhibit_gc();
            assert_eq!(rt.collect_garbage(), 0);
            assert!(rt.is_live(&value));
        }
        assert!(!rt.is_live(&value));
    }

    #[test]
    fn test_allocation_threshold_requests_collection() {
        let rt = Runtime::with_context(EvalContext::with_gc_threshold(2));
        rt.eval_string("vec![1]; vec![2]; vec![3]; 0").unwrap();
        assert_eq!(rt.heap_stats().gc_runs, 1);
        assert_eq!(rt.heap_stats().live_objects, 0);
    }

    #[test]
    fn test_host_callback_reenters() {
        let rt = Runtime::new();
        rt.register_function("twice", 1, |rt, args| {
            let inner = crate::bridge::safe_eval(rt, "21")?;
            let n = args[0].as_i64().unwrap_or(0);
            Ok(Value::I64(n + inner.as_i64().unwrap_or(0)))
        })
        .unwrap();
        assert_eq!(rt.eval_string("twice(21)"), Some(Value::I64(42)));
    }

    #[test]
    fn test_host_callback_error_becomes_host_error() {
        let rt = Runtime::new();
        rt.register_function("fail", 0, |_, _| Err(anyhow::anyhow!("disk on fire")))
            .unwrap();
        assert!(rt.eval_string("fail()").is_none());
        let exception = rt.take_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::HostError);
        assert!(exception.message.contains("disk on fire"));
    }

    #[test]
    fn test_nested_foreign_exception_propagates_unchanged() {
        let rt = Runtime::new();
        rt.register_function("nested", 0, |rt, _| {
            Ok(crate::bridge::safe_eval(rt, "sqrt(-1.0)")?)
        })
        .unwrap();
        assert!(rt.eval_string("nested()").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::DomainError)
        );
    }

    #[test]
    fn test_stack_overflow_is_an_exception() {
        let rt = Runtime::with_context(EvalContext::with_max_call_depth(32));
        rt.eval_string("fn down(n: i64) { down(n + 1) }").unwrap();
        assert!(rt.eval_string("down(0)").is_none());
        assert_eq!(
            rt.take_exception().map(|e| e.kind),
            Some(ExceptionKind::StackOverflowError)
        );
        // The call stack unwound completely.
        assert_eq!(rt.eval_string("1"), Some(Value::I64(1)));
    }

    #[test]
    #[should_panic(expected = "after shutdown")]
    fn test_use_after_shutdown_panics() {
        let rt = Runtime::new();
        rt.shutdown();
        rt.eval_string("1");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not registered")]
    fn test_free_unregistered_asserts_in_debug() {
        let rt = Runtime::new();
        let value = rt.eval_string("vec![1]").unwrap();
        let id = value.object_id().unwrap();
        rt.free_reference(PinKey::pinned(id));
    }
}
