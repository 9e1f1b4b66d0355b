//! Mutation paths: name-based write-back into the foreign heap
//!
//! The foreign runtime has no interior pointers, so a proxy for `r.a[2]`
//! cannot hold a reference to the slot it came from. Instead its path is
//! rebuilt from the owner chain on every write: the root is looked up by
//! name, every step but the last is replayed as a getter to find the
//! *current* container, and the last step is applied as a setter.
//!
//! A root that was rebound since the proxy was created is followed to its
//! new value; the write lands in whatever the name denotes now. A step that
//! no longer resolves is reported as [`HoldfastError::BrokenPath`].

use std::fmt;

use tracing::{debug, trace};

use crate::bridge::ExceptionKind;
use crate::environment::BindingMode;
use crate::error::{HoldfastError, Result};
use crate::proxy::{Accessor, Proxy};
use crate::runtime::Runtime;
use crate::value::Value;

/// Where a mutation path starts.
#[derive(Debug, Clone, PartialEq)]
pub enum PathRoot {
    /// A global binding, re-resolved on every replay
    Named(String),
    /// An unnamed value; readable but never writable
    Temporary(Value),
}

/// The root-to-leaf accessor sequence of a proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPath {
    root: PathRoot,
    steps: Vec<Accessor>,
}

impl MutationPath {
    /// Walk `proxy`'s owner chain up to its root.
    pub fn of(proxy: &Proxy) -> Self {
        let mut steps = Vec::new();
        let mut node = proxy;
        let root = loop {
            match (node.owner(), node.accessor()) {
                (Some(owner), Some(step)) => {
                    steps.push(step.clone());
                    node = owner;
                }
                (None, Some(Accessor::Binding(name))) => break PathRoot::Named(name.clone()),
                _ => break PathRoot::Temporary(node.value()),
            }
        };
        steps.reverse();
        Self { root, steps }
    }

    /// The root binding's name, if the root is named.
    pub fn root_name(&self) -> Option<&str> {
        match &self.root {
            PathRoot::Named(name) => Some(name),
            PathRoot::Temporary(_) => None,
        }
    }

    /// The root of the path.
    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// Accessors applied after the root, root first.
    pub fn steps(&self) -> &[Accessor] {
        &self.steps
    }

    /// Foreign source for the first `n` steps, e.g. `r.a[2]`.
    fn prefix(&self, n: usize) -> String {
        let mut out = match &self.root {
            PathRoot::Named(name) => name.clone(),
            PathRoot::Temporary(_) => "<temporary>".to_string(),
        };
        for step in &self.steps[..n.min(self.steps.len())] {
            out.push_str(&step.to_string());
        }
        out
    }

    fn root_binding(&self, rt: &Runtime) -> Result<&str> {
        let PathRoot::Named(name) = &self.root else {
            return Err(HoldfastError::ImmutableTarget {
                target: self.to_string(),
                reason: "the root is an unnamed temporary".to_string(),
            });
        };
        match rt.binding_mode(name) {
            Some(BindingMode::Mutable) => Ok(name),
            Some(mode) => Err(HoldfastError::ImmutableTarget {
                target: self.to_string(),
                reason: format!(
                    "`{}` is {} binding",
                    name,
                    if mode == BindingMode::Constant {
                        "a constant"
                    } else {
                        "an immutable"
                    }
                ),
            }),
            None => Err(HoldfastError::BrokenPath {
                path: self.to_string(),
                step: name.clone(),
                reason: format!("`{}` not defined", name),
                cause: None,
            }),
        }
    }

    fn root_value(&self, rt: &Runtime) -> Result<Value> {
        match &self.root {
            PathRoot::Named(name) => rt.get_global(name).ok_or_else(|| HoldfastError::BrokenPath {
                path: self.to_string(),
                step: name.clone(),
                reason: format!("`{}` not defined", name),
                cause: None,
            }),
            PathRoot::Temporary(value) => Ok(value.clone()),
        }
    }

    /// Error for getter step `i` failing.
    fn broken(&self, i: usize, err: HoldfastError) -> HoldfastError {
        match err {
            HoldfastError::Foreign(exception) => HoldfastError::BrokenPath {
                path: self.to_string(),
                step: self.prefix(i + 1),
                reason: exception.message.clone(),
                cause: Some(exception),
            },
            other => other,
        }
    }

    /// Error for the final setter failing.
    fn setter_error(&self, err: HoldfastError) -> HoldfastError {
        let HoldfastError::Foreign(exception) = err else {
            return err;
        };
        match exception.kind {
            ExceptionKind::ImmutableError => HoldfastError::ImmutableTarget {
                target: self.to_string(),
                reason: exception.message,
            },
            ExceptionKind::BoundsError
            | ExceptionKind::KeyError
            | ExceptionKind::FieldError
            | ExceptionKind::UndefVarError => HoldfastError::BrokenPath {
                path: self.to_string(),
                step: self.to_string(),
                reason: exception.message.clone(),
                cause: Some(exception),
            },
            _ => HoldfastError::Foreign(exception),
        }
    }

    /// Check that a write through this path could succeed.
    ///
    /// The root must be a named, mutable binding and every container the
    /// path passes through must be mutable.
    ///
    /// # Errors
    ///
    /// `ImmutableTarget` for an unnamed root or an immutable binding or
    /// container, `BrokenPath` if a step no longer resolves.
    pub fn check_mutable(&self, rt: &Runtime) -> Result<()> {
        self.root_binding(rt)?;
        let _inhibit = rt.inhibit_gc();
        let mut current = self.root_value(rt)?;
        for (i, step) in self.steps.iter().enumerate() {
            let kind = rt.classify(&current);
            if !kind.is_mutable_container() {
                return Err(HoldfastError::ImmutableTarget {
                    target: self.to_string(),
                    reason: format!("`{}` is an immutable {}", self.prefix(i), kind),
                });
            }
            if i + 1 < self.steps.len() {
                current = step.get(rt, &current).map_err(|e| self.broken(i, e))?;
            }
        }
        Ok(())
    }

    /// Re-read the value the path currently denotes.
    ///
    /// # Errors
    ///
    /// `BrokenPath` if the root or a step no longer resolves.
    pub fn read(&self, rt: &Runtime) -> Result<Value> {
        let _inhibit = rt.inhibit_gc();
        let mut current = self.root_value(rt)?;
        for (i, step) in self.steps.iter().enumerate() {
            current = step.get(rt, &current).map_err(|e| self.broken(i, e))?;
        }
        Ok(current)
    }

    /// Write `value` to the location the path currently denotes.
    ///
    /// Collection is inhibited for the whole replay, so the containers it
    /// walks through stay put even though none of them is pinned.
    ///
    /// # Errors
    ///
    /// `ImmutableTarget` if the root or target is not writable, `BrokenPath`
    /// if the path no longer resolves, and `Foreign` for any other foreign
    /// exception raised by the setter.
    pub fn write(&self, rt: &Runtime, value: Value) -> Result<()> {
        let _inhibit = rt.inhibit_gc();
        let root = self.root_binding(rt)?;
        debug!(path = %self, "mutation path write");

        let Some((last, init)) = self.steps.split_last() else {
            return Accessor::Binding(root.to_string())
                .set(rt, &Value::Unit, value)
                .map_err(|e| self.setter_error(e));
        };

        let mut container = self.root_value(rt)?;
        for (i, step) in init.iter().enumerate() {
            trace!(step = %step, "replay getter");
            container = step.get(rt, &container).map_err(|e| self.broken(i, e))?;
        }
        last.set(rt, &container, value)
            .map_err(|e| self.setter_error(e))
    }
}

impl fmt::Display for MutationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.steps.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn setup(src: &str) -> Rc<Runtime> {
        let rt = Rc::new(Runtime::new());
        crate::bridge::safe_eval(&rt, src).unwrap();
        rt
    }

    #[test]
    fn test_path_of_nested_proxy() {
        let rt = setup("struct R { a: Vec<i64> }\nlet mut r = R { a: vec![1, 2, 3] };");
        let root = Proxy::global(&rt, "r").unwrap();
        let leaf = root.field("a").unwrap().index(2i64).unwrap();
        let path = MutationPath::of(&leaf);
        assert_eq!(path.root_name(), Some("r"));
        assert_eq!(path.to_string(), "r.a[2]");
        assert_eq!(path.steps().len(), 2);
    }

    #[test]
    fn test_write_replays_getters() {
        let rt = setup("struct R { a: Vec<i64> }\nlet mut r = R { a: vec![1, 2, 3] };");
        let leaf = Proxy::global(&rt, "r").unwrap().field("a").unwrap().index(2i64).unwrap();
        MutationPath::of(&leaf).write(&rt, Value::I64(30)).unwrap();
        assert_eq!(crate::bridge::safe_eval(&rt, "r.a[2]").unwrap(), Value::I64(30));
    }

    #[test]
    fn test_temporary_root_is_not_writable() {
        let rt = Rc::new(Runtime::new());
        let temp = Proxy::eval(&rt, "vec![1]").unwrap().index(0i64).unwrap();
        let path = MutationPath::of(&temp);
        assert_eq!(path.root_name(), None);
        assert_eq!(path.to_string(), "<temporary>[0]");
        assert!(matches!(
            path.check_mutable(&rt),
            Err(HoldfastError::ImmutableTarget { .. })
        ));
        assert_eq!(path.read(&rt).unwrap(), Value::I64(1));
    }

    #[test]
    fn test_frozen_container_rejected() {
        let rt = setup("#[frozen]\nstruct P { x: i64 }\nlet mut p = P { x: 1 };");
        let x = Proxy::global(&rt, "p").unwrap().field("x").unwrap();
        let err = MutationPath::of(&x).check_mutable(&rt).unwrap_err();
        assert!(err.to_string().contains("frozen struct"), "{}", err);
    }

    #[test]
    fn test_shrunk_container_breaks_path() {
        let rt = setup("let mut v = vec![vec![1, 2], vec![3]];");
        let leaf = Proxy::global(&rt, "v").unwrap().index(1i64).unwrap().index(0i64).unwrap();
        crate::bridge::safe_eval(&rt, "v.pop();").unwrap();
        let err = MutationPath::of(&leaf).write(&rt, Value::I64(9)).unwrap_err();
        match err {
            HoldfastError::BrokenPath { step, cause, .. } => {
                assert_eq!(step, "v[1]");
                assert_eq!(cause.map(|c| c.kind), Some(ExceptionKind::BoundsError));
            }
            other => panic!("expected BrokenPath, got {:?}", other),
        }
    }
}
