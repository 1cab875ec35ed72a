//! Embeddable mark-sweep memory manager with pluggable reference tracing.
//!
//! This crate provides two composed pieces:
//!
//! - **[`Heap`]**: a block allocator with mark-sweep collection. Clients
//!   allocate blocks by size, receive generation-tagged [`Handle`]s, mark
//!   the blocks they still need, and call [`Heap::collect`] to reclaim the
//!   rest. Crossing the byte threshold triggers collection automatically.
//! - **[`Tracer`]**: automatic reachability discovery on top of the heap.
//!   Clients register a trace callback per type, bind objects to types,
//!   maintain a root set, and [`Tracer::collect_traced`] walks the object
//!   graph instead of requiring manual marks.
//!
//! # Architecture
//!
//! - **Handle**: slot index + generation; stale handles stop resolving
//!   instead of dangling
//! - **BlockRegistry**: slot arena owning all block storage
//! - **Heap**: allocate/reallocate/free/mark/collect, threshold policy,
//!   statistics
//! - **TypeRegistry / RootSet / Tracer**: name-keyed trace callbacks,
//!   bounded root set, root-driven graph walk
//!
//! Everything is single-threaded and synchronous: one logical thread of
//! control owns a heap and its tracer at a time.
//!
//! # Example
//!
//! ```no_run
//! use marksweep::{Heap, Tracer, Handle, TraceScope};
//!
//! fn trace_node(obj: Handle, scope: &mut TraceScope<'_>) {
//!     if let Some(next) = scope.read_handle(obj, 0) {
//!         scope.trace(next);
//!     }
//! }
//!
//! let mut heap = Heap::new();
//! let mut tracer = Tracer::new();
//! tracer.register_type("Node", trace_node);
//!
//! let head = heap.allocate(16).unwrap();
//! let tail = heap.allocate(16).unwrap();
//! heap.write_handle(head, 0, Some(tail));
//! tracer.set_type(head, "Node");
//! tracer.set_type(tail, "Node");
//!
//! tracer.add_root(head);
//! let freed = tracer.collect_traced(&mut heap);
//! assert_eq!(freed, 0); // tail reachable through head
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod block;
pub mod config;
pub mod handle;
pub mod heap;
pub mod roots;
pub mod tracer;
pub mod types;

pub use config::{ConfigError, HeapConfig, DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_THRESHOLD};
pub use handle::Handle;
pub use heap::{GcStats, Heap};
pub use roots::{RootSet, MAX_ROOTS};
pub use tracer::{TraceScope, Tracer};
pub use types::{TraceFn, TypeInfo, TypeRegistry, MAX_TYPES};
