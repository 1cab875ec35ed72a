//! Reachability tracing
//!
//! [`Tracer`] layers automatic reachability discovery over a [`Heap`]:
//! clients register a trace callback per type, bind objects to types, and
//! keep a root set; [`Tracer::collect_traced`] then marks everything
//! reachable from the roots before delegating to [`Heap::collect`].
//!
//! The tracer and the heap have independent lifecycles: the tracer owns
//! only metadata (names, callbacks, handle keys) and never frees block
//! storage itself.

use crate::handle::Handle;
use crate::heap::Heap;
use crate::roots::RootSet;
use crate::types::{TraceFn, TypeRegistry};
use log::trace;
use rustc_hash::FxHashMap;

/// Marking context handed to trace callbacks.
///
/// A callback reports the objects its subject references by calling
/// [`trace`](Self::trace) (marks and dispatches recursively, stopping at
/// already-marked blocks so cyclic graphs terminate) or
/// [`mark`](Self::mark) (marks without dispatching).
pub struct TraceScope<'a> {
    heap: &'a mut Heap,
    types: &'a TypeRegistry,
    bindings: &'a FxHashMap<Handle, usize>,
}

impl TraceScope<'_> {
    /// Mark a block reachable without invoking its trace callback.
    pub fn mark(&mut self, handle: Handle) {
        self.heap.mark(handle);
    }

    /// Mark a block reachable and dispatch its type's trace callback.
    ///
    /// No-op on stale handles and on blocks already marked this cycle.
    pub fn trace(&mut self, handle: Handle) {
        if !self.heap.contains(handle) || self.heap.is_marked(handle) {
            return;
        }
        self.dispatch(handle);
    }

    /// Decode a handle stored at `offset` inside a block's payload.
    pub fn read_handle(&self, handle: Handle, offset: usize) -> Option<Handle> {
        self.heap.read_handle(handle, offset)
    }

    fn dispatch(&mut self, handle: Handle) {
        self.heap.mark(handle);
        if let Some(&index) = self.bindings.get(&handle) {
            if let Some(info) = self.types.get(index) {
                (info.trace)(handle, self);
            }
        }
    }
}

/// Root-driven tracing layer over a [`Heap`].
///
/// Owns the type registry, the object→type bindings, and the root set.
/// Which heap it traces is chosen per call, so one tracer can serve
/// exactly the heap its handles came from — mixing handles from another
/// heap is not detected and marks arbitrary blocks there.
#[derive(Debug, Default)]
pub struct Tracer {
    types: TypeRegistry,
    bindings: FxHashMap<Handle, usize>,
    roots: RootSet,
}

impl Tracer {
    /// Create an empty tracer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type name with its trace callback (bounded upsert, see
    /// [`TypeRegistry::register`]).
    pub fn register_type(&mut self, name: &'static str, trace: TraceFn) {
        self.types.register(name, trace);
    }

    /// Bind an object to a registered type name.
    ///
    /// No-op if the name was never registered. Re-binding an object
    /// updates the existing entry.
    pub fn set_type(&mut self, handle: Handle, name: &str) {
        let Some(index) = self.types.index_of(name) else {
            return;
        };
        self.bindings.insert(handle, index);
    }

    /// Name of the type an object is bound to, if any.
    pub fn type_of(&self, handle: Handle) -> Option<&'static str> {
        let index = *self.bindings.get(&handle)?;
        self.types.get(index).map(|info| info.name)
    }

    /// Add a handle to the root set (idempotent, silently bounded).
    pub fn add_root(&mut self, handle: Handle) {
        self.roots.add(handle);
    }

    /// Remove a handle from the root set. No-op if absent.
    pub fn remove_root(&mut self, handle: Handle) {
        self.roots.remove(handle);
    }

    /// The current root set.
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Mark everything reachable from an explicit list of roots.
    ///
    /// Each root is marked and, if bound to a type, its trace callback is
    /// invoked; marking beyond that one level happens only where
    /// callbacks recurse through [`TraceScope::trace`].
    pub fn trace_all(&self, heap: &mut Heap, roots: &[Handle]) {
        let mut scope = TraceScope {
            heap,
            types: &self.types,
            bindings: &self.bindings,
        };
        for &root in roots {
            scope.dispatch(root);
        }
    }

    /// Trace from the registered root set, then collect.
    ///
    /// Returns the bytes freed. Bindings of blocks that did not survive
    /// are dropped afterwards, so the side table cannot grow without
    /// bound.
    pub fn collect_traced(&mut self, heap: &mut Heap) -> usize {
        trace!("tracing {} roots", self.roots.len());
        self.trace_all(heap, self.roots.as_slice());
        let freed = heap.collect();
        self.bindings.retain(|&handle, _| heap.contains(handle));
        freed
    }

    /// Reset the tracer to empty: types, bindings, and roots. The heap is
    /// untouched.
    pub fn clear(&mut self) {
        self.types.clear();
        self.bindings.clear();
        self.roots.clear();
    }
}
