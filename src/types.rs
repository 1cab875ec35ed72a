//! Type registry for trace dispatch
//!
//! Maps a type name to the trace callback that reports the references a
//! block of that type holds. The registry is bounded and name-keyed:
//! registering an existing name replaces its callback in place, and
//! registrations past [`MAX_TYPES`] are silently dropped (callers can
//! guard with [`TypeRegistry::len`]).

use crate::handle::Handle;
use crate::tracer::TraceScope;

/// Maximum number of distinct registered types.
pub const MAX_TYPES: usize = 32;

/// Per-type trace callback.
///
/// Invoked with the handle of an object reachable during a trace. The
/// callback reports the objects it references by calling
/// [`TraceScope::trace`] (recursive) or [`TraceScope::mark`] (one-shot)
/// on each of them; the tracer itself never walks past this one level.
pub type TraceFn = fn(Handle, &mut TraceScope<'_>);

/// A registered type: name plus trace callback.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// Type name, the registry key.
    pub name: &'static str,

    /// Callback tracing references out of objects of this type.
    pub trace: TraceFn,
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo").field("name", &self.name).finish()
    }
}

/// Bounded, name-keyed registry of trace callbacks.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `trace`, replacing the callback if the name
    /// already exists. A new name past [`MAX_TYPES`] is silently dropped.
    pub fn register(&mut self, name: &'static str, trace: TraceFn) {
        if let Some(existing) = self.types.iter_mut().find(|info| info.name == name) {
            existing.trace = trace;
            return;
        }
        if self.types.len() >= MAX_TYPES {
            return;
        }
        self.types.push(TypeInfo { name, trace });
    }

    /// Index of a registered name, usable with [`TypeRegistry::get`].
    ///
    /// Indices are stable: entries are never removed individually, and an
    /// upsert keeps its slot.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|info| info.name == name)
    }

    /// Entry at a previously resolved index.
    pub fn get(&self, index: usize) -> Option<&TypeInfo> {
        self.types.get(index)
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.types.clear();
    }
}
