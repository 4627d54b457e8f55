use super::Disposer;
use crate::{alloc::NodeAllocator, common::error::Error};

use std::{
    alloc::Layout,
    mem,
    sync::{
        atomic::{self, Ordering},
        Arc,
    },
};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

/// Set on a slot holding a leaf while that leaf is being pushed down into a new
/// array node. Only the thread that set the tag may clear it.
pub(crate) const CONVERTING_TAG: usize = 0b1;

/// What a slot points to. An empty slot is a null pointer.
pub(crate) enum Node<T> {
    Leaf(T),
    Array(ArrayNode<T>),
}

pub(crate) type Slot<T> = Atomic<Node<T>>;

/// A fixed-size array of slots at some depth of the trie.
pub(crate) struct ArrayNode<T> {
    slots: Box<[Slot<T>]>,
    allocator: Arc<dyn NodeAllocator>,
}

impl<T> ArrayNode<T> {
    pub(crate) fn try_new(
        capacity: usize,
        allocator: &Arc<dyn NodeAllocator>,
    ) -> Result<Self, Error> {
        assert!(capacity.is_power_of_two());
        // The converting mark lives in the low bit of slot pointers.
        assert!(mem::align_of::<Node<T>>() > CONVERTING_TAG);

        let failed = || Error::AllocationFailed { capacity };
        let layout = Layout::array::<Slot<T>>(capacity).map_err(|_| failed())?;

        if !allocator.reserve(layout) {
            return Err(failed());
        }

        let mut slots = Vec::new();
        if slots.try_reserve_exact(capacity).is_err() {
            allocator.release(layout);
            return Err(failed());
        }
        slots.resize_with(capacity, Atomic::null);

        Ok(Self {
            slots: slots.into_boxed_slice(),
            allocator: Arc::clone(allocator),
        })
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Drop for ArrayNode<T> {
    fn drop(&mut self) {
        // Children are not freed here; whoever drops an array node owns them.
        if let Ok(layout) = Layout::array::<Slot<T>>(self.slots.len()) {
            self.allocator.release(layout);
        }
    }
}

/// The decoded state of a slot pointer.
pub(crate) enum SlotState<'g, T> {
    Empty,
    Leaf(&'g T),
    Array(&'g ArrayNode<T>),
    Converting,
}

impl<'g, T> SlotState<'g, T> {
    /// # Safety
    ///
    /// `ptr` must have been loaded from a slot under a guard that lives for
    /// `'g`.
    #[inline]
    pub(crate) unsafe fn of(ptr: Shared<'g, Node<T>>) -> Self {
        if is_converting(ptr) {
            return Self::Converting;
        }
        match ptr.as_ref() {
            None => Self::Empty,
            Some(Node::Leaf(item)) => Self::Leaf(item),
            Some(Node::Array(array)) => Self::Array(array),
        }
    }
}

#[inline]
pub(crate) fn is_converting<T>(ptr: Shared<'_, Node<T>>) -> bool {
    ptr.tag() & CONVERTING_TAG != 0
}

/// Returns the item of a leaf that was never published.
pub(crate) fn into_item<T>(leaf: Owned<Node<T>>) -> T {
    match *leaf.into_box() {
        Node::Leaf(item) => item,
        Node::Array(_) => unreachable!("an array node is never built as a leaf"),
    }
}

/// Releases a node that no other thread can reach any more. The item of a leaf
/// goes to the disposer, if any.
pub(crate) fn dispose_node<T>(node: Owned<Node<T>>, disposer: Option<&Disposer<T>>) {
    match *node.into_box() {
        Node::Leaf(item) => match disposer {
            Some(dispose) => dispose(item),
            None => mem::drop(item),
        },
        Node::Array(array) => mem::drop(array),
    }
}

/// Retires an unlinked leaf: it is disposed of once no thread pinned at the
/// time of the call can still be reading it.
///
/// # Safety
///
/// `ptr` must be a leaf that has just been unlinked from its slot by a
/// successful compare-and-swap of the calling thread, and must not be retired
/// twice.
pub(crate) unsafe fn defer_dispose_leaf<'g, T>(
    guard: &'g Guard,
    ptr: Shared<'g, Node<T>>,
    disposer: Option<&Disposer<T>>,
) {
    assert!(!ptr.is_null());
    assert!(!is_converting(ptr));

    let disposer = disposer.cloned();
    guard.defer_unchecked(move || {
        atomic::fence(Ordering::Acquire);
        dispose_node(ptr.into_owned(), disposer.as_ref());
    });
}
