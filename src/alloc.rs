//! Pluggable accounting for the memory of array nodes.
//!
//! The trie asks its [`NodeAllocator`] before it allocates the slots of an array
//! node, and tells it when the node is freed again. An allocator may refuse a
//! request, in which case the operation that needed the node fails with
//! [`Error::AllocationFailed`][alloc-failed] and leaves the trie unchanged.
//!
//! [alloc-failed]: ../enum.Error.html#variant.AllocationFailed

use std::{
    alloc::Layout,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Approves and accounts for array node allocations.
pub trait NodeAllocator: Send + Sync {
    /// Called before the slots of an array node with `layout` are allocated.
    /// Return `false` to refuse the allocation.
    fn reserve(&self, layout: Layout) -> bool;

    /// Called after the slots of an array node with `layout` have been freed.
    /// Only called for layouts that were successfully reserved.
    fn release(&self, layout: Layout);
}

/// Approves every allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAllocator;

impl NodeAllocator for DefaultAllocator {
    #[inline]
    fn reserve(&self, _layout: Layout) -> bool {
        true
    }

    #[inline]
    fn release(&self, _layout: Layout) {}
}

/// Caps the total size of live array nodes at a byte budget.
///
/// The head array counts against the budget too, so a budget smaller than the
/// head array makes building the trie fail.
#[derive(Debug)]
pub struct BoundedAllocator {
    limit: usize,
    used: AtomicUsize,
}

impl BoundedAllocator {
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            limit: limit_bytes,
            used: AtomicUsize::new(0),
        }
    }

    /// The number of bytes currently reserved by live array nodes.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl NodeAllocator for BoundedAllocator {
    fn reserve(&self, layout: Layout) -> bool {
        let size = layout.size();
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let Some(new_used) = used.checked_add(size).filter(|n| *n <= self.limit) else {
                return false;
            };
            match self.used.compare_exchange_weak(
                used,
                new_used,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => used = current,
            }
        }
    }

    fn release(&self, layout: Layout) {
        self.used.fetch_sub(layout.size(), Ordering::AcqRel);
    }
}
