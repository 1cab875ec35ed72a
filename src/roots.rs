//! Root set
//!
//! Blocks registered here are treated as always reachable: a traced
//! collection starts its walk from them. The set holds non-owning
//! handles; keeping it consistent with block lifetime is the caller's
//! responsibility.

use crate::handle::Handle;

/// Maximum number of root entries.
pub const MAX_ROOTS: usize = 128;

/// Bounded set of always-reachable block handles.
///
/// Adds are idempotent, adds past [`MAX_ROOTS`] are silently dropped
/// (guard with [`RootSet::len`]), and removal preserves the relative
/// order of the remaining entries.
#[derive(Debug, Default)]
pub struct RootSet {
    roots: Vec<Handle>,
}

impl RootSet {
    /// Create an empty root set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root. No-op if already present or the set is full.
    pub fn add(&mut self, handle: Handle) {
        if self.roots.len() >= MAX_ROOTS || self.roots.contains(&handle) {
            return;
        }
        self.roots.push(handle);
    }

    /// Remove a root. No-op if absent.
    pub fn remove(&mut self, handle: Handle) {
        if let Some(position) = self.roots.iter().position(|&root| root == handle) {
            self.roots.remove(position);
        }
    }

    /// Whether the handle is registered as a root.
    pub fn contains(&self, handle: Handle) -> bool {
        self.roots.contains(&handle)
    }

    /// Iterate over the roots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.roots.iter().copied()
    }

    /// Roots as a slice, in insertion order.
    pub fn as_slice(&self) -> &[Handle] {
        &self.roots
    }

    /// Number of roots.
    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Remove every root.
    pub fn clear(&mut self) {
        self.roots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn handle(index: u32) -> Handle {
        Handle::new(index, NonZeroU32::MIN)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut roots = RootSet::new();
        roots.add(handle(1));
        roots.add(handle(1));

        assert_eq!(roots.len(), 1);
        assert!(roots.contains(handle(1)));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut roots = RootSet::new();
        roots.add(handle(1));
        roots.add(handle(2));
        roots.add(handle(3));

        roots.remove(handle(2));
        assert_eq!(roots.as_slice(), &[handle(1), handle(3)]);
    }

    #[test]
    fn test_iter_follows_insertion_order() {
        let mut roots = RootSet::new();
        roots.add(handle(3));
        roots.add(handle(1));
        roots.add(handle(2));

        let collected: Vec<Handle> = roots.iter().collect();
        assert_eq!(collected, vec![handle(3), handle(1), handle(2)]);
        assert_eq!(collected.as_slice(), roots.as_slice());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut roots = RootSet::new();
        roots.add(handle(1));
        roots.remove(handle(9));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn test_capacity_overflow_drops_silently() {
        let mut roots = RootSet::new();
        for index in 0..(MAX_ROOTS as u32 + 10) {
            roots.add(handle(index));
        }

        assert_eq!(roots.len(), MAX_ROOTS);
        assert!(!roots.contains(handle(MAX_ROOTS as u32)));
    }

    #[test]
    fn test_clear() {
        let mut roots = RootSet::new();
        roots.add(handle(1));
        roots.clear();
        assert!(roots.is_empty());
    }
}
