//! Mark-sweep heap
//!
//! [`Heap`] combines the block registry with the collection policy: it
//! hands out handles, tracks bytes allocated, triggers a collection when
//! an allocation would cross the threshold, and sweeps on demand.
//!
//! Marking is the caller's job in the base API: call [`Heap::mark`] on
//! every block that must survive, then [`Heap::collect`]. The tracing
//! layer in [`crate::tracer`] automates that from a root set.

use crate::block::BlockRegistry;
use crate::config::{ConfigError, HeapConfig};
use crate::handle::Handle;
use log::{debug, trace};

/// Cumulative collector statistics.
///
/// `bytes_allocated` always equals the sum of the sizes of all live
/// blocks; the other two counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Bytes currently held by live blocks.
    pub bytes_allocated: usize,

    /// Number of collection cycles run so far.
    pub total_collections: usize,

    /// Bytes reclaimed across all collection cycles.
    pub total_freed: usize,
}

/// A mark-sweep managed heap.
///
/// Construct one per independent object population; nothing is shared
/// between heaps and there is no global state. The heap is the sole
/// owner of block storage: dropping it releases every live block.
pub struct Heap {
    blocks: BlockRegistry,
    config: HeapConfig,
    threshold: usize,
    total_collections: usize,
    total_freed: usize,
}

impl Heap {
    /// Create an empty heap with the default threshold policy.
    pub fn new() -> Self {
        let config = HeapConfig::default();
        Self {
            blocks: BlockRegistry::new(),
            threshold: config.initial_threshold,
            config,
            total_collections: 0,
            total_freed: 0,
        }
    }

    /// Create an empty heap with an explicit threshold policy.
    pub fn with_config(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            blocks: BlockRegistry::new(),
            threshold: config.initial_threshold,
            config,
            total_collections: 0,
            total_freed: 0,
        })
    }

    /// Allocate a block of `size` zeroed bytes.
    ///
    /// Returns `None` if `size` is zero or storage cannot be acquired.
    ///
    /// If the allocation would push `bytes_allocated` past the current
    /// threshold, a collection runs first, sweeping with whatever marks
    /// are set at that moment. Callers that mark manually should be
    /// prepared for this; callers using a [`Tracer`](crate::Tracer)
    /// should collect through [`collect_traced`](crate::Tracer::collect_traced).
    pub fn allocate(&mut self, size: usize) -> Option<Handle> {
        if size == 0 {
            return None;
        }
        // An unrepresentable total counts as crossing the threshold; the
        // request itself then fails in insert and returns None.
        let crosses = self
            .blocks
            .bytes_allocated()
            .checked_add(size)
            .map_or(true, |total| total > self.threshold);
        if crosses {
            trace!(
                "allocation of {} bytes crosses threshold {}, collecting",
                size,
                self.threshold
            );
            self.collect();
        }
        self.blocks.insert(size)
    }

    /// Resize a block, preserving its contents (grown bytes are zeroed).
    ///
    /// Mirrors the classic `realloc` contract: a `None` handle behaves as
    /// [`allocate`](Self::allocate), a zero `size` behaves as
    /// [`free`](Self::free) and returns `None`. A stale or unknown handle
    /// returns `None` without touching anything. On success the handle
    /// remains valid; no new identity is created.
    pub fn reallocate(&mut self, handle: Option<Handle>, size: usize) -> Option<Handle> {
        let Some(handle) = handle else {
            return self.allocate(size);
        };
        if size == 0 {
            self.free(handle);
            return None;
        }
        if self.blocks.resize(handle, size) {
            Some(handle)
        } else {
            None
        }
    }

    /// Release a block immediately. No-op on a stale or unknown handle.
    pub fn free(&mut self, handle: Handle) {
        self.blocks.remove(handle);
    }

    /// Mark a block as reachable for the current cycle. No-op on a stale
    /// or unknown handle.
    pub fn mark(&mut self, handle: Handle) {
        if let Some(block) = self.blocks.get_mut(handle) {
            block.mark();
        }
    }

    /// Whether the block is currently marked. False for stale handles.
    pub fn is_marked(&self, handle: Handle) -> bool {
        self.blocks.get(handle).is_some_and(|block| block.is_marked())
    }

    /// Whether the handle resolves to a live block.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.blocks.contains(handle)
    }

    /// Size in bytes of a live block.
    pub fn size_of(&self, handle: Handle) -> Option<usize> {
        self.blocks.get(handle).map(|block| block.size())
    }

    /// Read access to a block's payload.
    pub fn data(&self, handle: Handle) -> Option<&[u8]> {
        self.blocks.get(handle).map(|block| block.data())
    }

    /// Write access to a block's payload.
    pub fn data_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        self.blocks.get_mut(handle).map(|block| block.data_mut())
    }

    /// Decode a handle stored at `offset` inside a block's payload.
    ///
    /// Returns `None` if the block is gone, the range is out of bounds,
    /// or the bytes hold the "no handle" encoding.
    pub fn read_handle(&self, handle: Handle, offset: usize) -> Option<Handle> {
        let data = self.data(handle)?;
        let end = offset.checked_add(Handle::ENCODED_LEN)?;
        let bytes: [u8; Handle::ENCODED_LEN] = data.get(offset..end)?.try_into().ok()?;
        Handle::from_bytes(bytes)
    }

    /// Store a handle (or the "no handle" encoding for `None`) at
    /// `offset` inside a block's payload. Returns false if the block is
    /// gone or the range is out of bounds.
    pub fn write_handle(&mut self, handle: Handle, offset: usize, value: Option<Handle>) -> bool {
        let Some(data) = self.data_mut(handle) else {
            return false;
        };
        let Some(end) = offset.checked_add(Handle::ENCODED_LEN) else {
            return false;
        };
        let Some(field) = data.get_mut(offset..end) else {
            return false;
        };
        let bytes = match value {
            Some(v) => v.to_bytes(),
            None => [0u8; Handle::ENCODED_LEN],
        };
        field.copy_from_slice(&bytes);
        true
    }

    /// Run one collection cycle: free every unmarked block, clear the
    /// mark on every survivor, then recompute the threshold from the
    /// post-sweep live size. Returns the bytes freed this cycle.
    pub fn collect(&mut self) -> usize {
        let freed = self.blocks.sweep();
        self.total_collections += 1;
        self.total_freed += freed;

        let live = self.blocks.bytes_allocated();
        let grown = (live as f64 * self.config.growth_factor) as usize;
        self.threshold = grown.max(self.config.initial_threshold);

        debug!(
            "collection {}: freed {} bytes, {} live blocks ({} bytes), next threshold {}",
            self.total_collections,
            freed,
            self.blocks.len(),
            live,
            self.threshold
        );
        freed
    }

    /// Snapshot of the collector counters. No side effects.
    pub fn stats(&self) -> GcStats {
        GcStats {
            bytes_allocated: self.blocks.bytes_allocated(),
            total_collections: self.total_collections,
            total_freed: self.total_freed,
        }
    }

    /// Current collection threshold in bytes.
    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of live blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the heap holds no live blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.len() == 0
    }

    /// Iterate over the handles of all live blocks.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.blocks.handles()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_starts_empty() {
        let heap = Heap::new();
        assert_eq!(heap.stats(), GcStats::default());
        assert!(heap.is_empty());
    }

    #[test]
    fn test_allocate_accounts_bytes() {
        let mut heap = Heap::new();
        let a = heap.allocate(100).unwrap();
        let b = heap.allocate(50).unwrap();

        assert_ne!(a, b);
        assert_eq!(heap.stats().bytes_allocated, 150);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_allocate_zero_returns_none() {
        let mut heap = Heap::new();
        assert!(heap.allocate(0).is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn test_collect_frees_unmarked_keeps_marked() {
        let mut heap = Heap::new();
        let keep = heap.allocate(64).unwrap();
        let lose = heap.allocate(64).unwrap();

        heap.data_mut(keep).unwrap()[0] = 0xAB;
        heap.mark(keep);

        let freed = heap.collect();
        assert_eq!(freed, 64);
        assert!(heap.contains(keep));
        assert!(!heap.contains(lose));

        // Survivor's data and size are untouched, mark flag reset
        assert_eq!(heap.data(keep).unwrap()[0], 0xAB);
        assert_eq!(heap.size_of(keep), Some(64));
        assert!(!heap.is_marked(keep));
    }

    #[test]
    fn test_collect_stats_scenario() {
        // Five 64-byte blocks, mark only the first
        let mut heap = Heap::new();
        let handles: Vec<_> = (0..5).map(|_| heap.allocate(64).unwrap()).collect();

        let stats = heap.stats();
        assert_eq!(stats.bytes_allocated, 320);
        assert_eq!(stats.total_collections, 0);

        heap.mark(handles[0]);
        assert_eq!(heap.collect(), 256);

        let stats = heap.stats();
        assert_eq!(stats.bytes_allocated, 64);
        assert_eq!(stats.total_collections, 1);
        assert_eq!(stats.total_freed, 256);
    }

    #[test]
    fn test_threshold_never_drops_below_initial() {
        let config = HeapConfig {
            initial_threshold: 1024,
            growth_factor: 1.5,
        };
        let mut heap = Heap::with_config(config).unwrap();

        let _h = heap.allocate(16).unwrap();
        heap.collect();
        assert!(heap.threshold() >= 1024);

        // Nothing live at all: still floored
        heap.collect();
        assert_eq!(heap.threshold(), 1024);
    }

    #[test]
    fn test_threshold_grows_with_live_bytes() {
        let config = HeapConfig {
            initial_threshold: 100,
            growth_factor: 2.0,
        };
        let mut heap = Heap::with_config(config).unwrap();

        let h = heap.allocate(80).unwrap();
        heap.mark(h);
        heap.collect();
        assert_eq!(heap.threshold(), 160);
    }

    #[test]
    fn test_auto_collect_on_threshold_crossing() {
        let config = HeapConfig {
            initial_threshold: 100,
            growth_factor: 1.5,
        };
        let mut heap = Heap::with_config(config).unwrap();

        let _a = heap.allocate(60).unwrap();
        assert_eq!(heap.stats().total_collections, 0);

        // 60 + 60 > 100: collection runs first and reclaims the unmarked
        // first block
        let b = heap.allocate(60).unwrap();
        let stats = heap.stats();
        assert_eq!(stats.total_collections, 1);
        assert_eq!(stats.total_freed, 60);
        assert_eq!(stats.bytes_allocated, 60);
        assert!(heap.contains(b));
    }

    #[test]
    fn test_reallocate_none_behaves_as_allocate() {
        let mut heap = Heap::new();
        let h = heap.reallocate(None, 100).unwrap();
        assert_eq!(heap.size_of(h), Some(100));
        assert_eq!(heap.stats().bytes_allocated, 100);
    }

    #[test]
    fn test_reallocate_zero_behaves_as_free() {
        let mut heap = Heap::new();
        let h = heap.allocate(100).unwrap();
        assert!(heap.reallocate(Some(h), 0).is_none());
        assert!(!heap.contains(h));
        assert_eq!(heap.stats().bytes_allocated, 0);
    }

    #[test]
    fn test_reallocate_resizes_in_place() {
        let mut heap = Heap::new();
        let h = heap.allocate(4).unwrap();
        heap.data_mut(h).unwrap().copy_from_slice(&[9, 8, 7, 6]);

        let resized = heap.reallocate(Some(h), 16).unwrap();
        assert_eq!(resized, h);
        assert_eq!(heap.stats().bytes_allocated, 16);
        assert_eq!(&heap.data(h).unwrap()[..4], &[9, 8, 7, 6]);
        assert!(heap.data(h).unwrap()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reallocate_stale_handle_is_none() {
        let mut heap = Heap::new();
        let h = heap.allocate(8).unwrap();
        heap.free(h);
        assert!(heap.reallocate(Some(h), 16).is_none());
    }

    #[test]
    fn test_free_and_mark_ignore_stale_handles() {
        let mut heap = Heap::new();
        let h = heap.allocate(32).unwrap();
        heap.free(h);

        let before = heap.stats();
        heap.free(h);
        heap.mark(h);
        assert_eq!(heap.stats(), before);
        assert!(!heap.is_marked(h));
    }

    #[test]
    fn test_handle_field_roundtrip() {
        let mut heap = Heap::new();
        let parent = heap.allocate(16).unwrap();
        let child = heap.allocate(16).unwrap();

        assert!(heap.write_handle(parent, 0, Some(child)));
        assert_eq!(heap.read_handle(parent, 0), Some(child));

        assert!(heap.write_handle(parent, 0, None));
        assert_eq!(heap.read_handle(parent, 0), None);

        // Out of bounds
        assert!(!heap.write_handle(parent, 12, Some(child)));
        assert_eq!(heap.read_handle(parent, 12), None);
    }

    #[test]
    fn test_oversized_allocation_returns_none() {
        let mut heap = Heap::new();
        let h = heap.allocate(1).unwrap();
        heap.mark(h);

        // The byte total overflows: the request degrades to None instead
        // of panicking, and marked blocks survive the triggered cycle
        assert!(heap.allocate(usize::MAX).is_none());
        assert!(heap.contains(h));

        let stats = heap.stats();
        assert_eq!(stats.bytes_allocated, 1);
        assert_eq!(stats.total_collections, 1);
        assert_eq!(stats.total_freed, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HeapConfig {
            initial_threshold: 0,
            growth_factor: 1.5,
        };
        assert!(Heap::with_config(config).is_err());
    }
}
