//! Block registry
//!
//! Owns every live allocation and its metadata. Blocks live in a slot
//! arena: a handle is a slot index plus the slot's generation, giving O(1)
//! lookup and making freed handles unresolvable instead of dangling.
//!
//! # Memory layout
//!
//! ```text
//! slots: [ Slot { generation, Some(Block) } | Slot { generation, None } | ... ]
//!                              │
//!                              └─ Block { ptr ──► zeroed storage, size, marked }
//! ```

use crate::handle::Handle;
use std::alloc::{self, Layout};
use std::num::NonZeroU32;
use std::ptr::NonNull;

/// Alignment of every block's storage.
const BLOCK_ALIGN: usize = 8;

/// One live allocation: user-visible storage plus mark-sweep metadata.
pub(crate) struct Block {
    ptr: NonNull<u8>,
    size: usize,
    marked: bool,
}

impl Block {
    fn layout(size: usize) -> Option<Layout> {
        Layout::from_size_align(size, BLOCK_ALIGN).ok()
    }

    /// Acquire zeroed storage for a new block. `None` if the underlying
    /// allocator fails or the size is unrepresentable.
    fn allocate(size: usize) -> Option<Self> {
        let layout = Self::layout(size)?;
        // SAFETY: layout has non-zero size, checked by the caller.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw)?;
        Some(Self {
            ptr,
            size,
            marked: false,
        })
    }

    /// Resize the storage in place, preserving contents. Grown bytes are
    /// zeroed. Returns false (leaving the block untouched) on failure.
    fn resize(&mut self, new_size: usize) -> bool {
        if Self::layout(new_size).is_none() {
            return false;
        }
        let Some(old_layout) = Self::layout(self.size) else {
            return false;
        };
        // SAFETY: ptr was allocated with old_layout; new_size fits a valid
        // layout per the check above.
        let raw = unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_size) };
        let Some(ptr) = NonNull::new(raw) else {
            return false;
        };
        if new_size > self.size {
            // SAFETY: the tail [size, new_size) is owned, uninitialized memory.
            unsafe {
                std::ptr::write_bytes(ptr.as_ptr().add(self.size), 0, new_size - self.size);
            }
        }
        self.ptr = ptr;
        self.size = new_size;
        true
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.marked
    }

    #[inline]
    pub(crate) fn mark(&mut self) {
        self.marked = true;
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        // SAFETY: ptr covers `size` initialized (zeroed-on-alloc) bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.size) {
            // SAFETY: ptr was allocated with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

struct Slot {
    generation: NonZeroU32,
    block: Option<Block>,
}

fn next_generation(generation: NonZeroU32) -> NonZeroU32 {
    NonZeroU32::new(generation.get().wrapping_add(1)).unwrap_or(NonZeroU32::MIN)
}

/// Slot arena of live blocks with byte accounting.
///
/// The registry is the sole owner of block storage; dropping it releases
/// everything still live.
#[derive(Default)]
pub(crate) struct BlockRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    bytes_allocated: usize,
    live: usize,
}

impl BlockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create a block of `size` zeroed bytes. `None` on zero size, index
    /// exhaustion, or allocation failure.
    pub(crate) fn insert(&mut self, size: usize) -> Option<Handle> {
        if size == 0 {
            return None;
        }
        let block = Block::allocate(size)?;
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.block = Some(block);
                Handle::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot {
                    generation: NonZeroU32::MIN,
                    block: Some(block),
                });
                Handle::new(index, NonZeroU32::MIN)
            }
        };
        self.bytes_allocated += size;
        self.live += 1;
        Some(handle)
    }

    fn slot(&self, handle: Handle) -> Option<&Slot> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation.get() == handle.generation())
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<&Block> {
        self.slot(handle)?.block.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut Block> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation.get() == handle.generation())?
            .block
            .as_mut()
    }

    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Release a block. Returns the freed byte count, or `None` if the
    /// handle is stale or unknown.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<usize> {
        let index = handle.index() as usize;
        let slot = self
            .slots
            .get_mut(index)
            .filter(|slot| slot.generation.get() == handle.generation())?;
        let block = slot.block.take()?;
        let size = block.size();
        drop(block);
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index());
        self.bytes_allocated -= size;
        self.live -= 1;
        Some(size)
    }

    /// Resize a block's storage, adjusting the byte accounting. Returns
    /// false on a stale handle or failed reallocation.
    pub(crate) fn resize(&mut self, handle: Handle, new_size: usize) -> bool {
        if new_size == 0 {
            return false;
        }
        let Some(block) = self.get_mut(handle) else {
            return false;
        };
        let old_size = block.size();
        if !block.resize(new_size) {
            return false;
        }
        self.bytes_allocated = self.bytes_allocated - old_size + new_size;
        true
    }

    /// Release every unmarked block and clear the mark on survivors.
    /// Returns the bytes freed.
    pub(crate) fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let Some(block) = slot.block.as_mut() else {
                continue;
            };
            if block.marked {
                block.marked = false;
                continue;
            }
            let size = block.size();
            slot.block = None;
            slot.generation = next_generation(slot.generation);
            self.free.push(index as u32);
            freed += size;
            self.bytes_allocated -= size;
            self.live -= 1;
        }
        freed
    }

    /// Iterate over the handles of all live blocks.
    pub(crate) fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.block
                .as_ref()
                .map(|_| Handle::new(index as u32, slot.generation))
        })
    }

    #[inline]
    pub(crate) fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
