use super::constants::DEFAULT_COUNTER_STRIPES;

use std::{
    cell::Cell,
    sync::atomic::{AtomicIsize, AtomicUsize, Ordering},
};

use crossbeam_utils::CachePadded;

/// Counts the live items of a trie.
///
/// `HashTrie::len` and `HashTrie::is_empty` report whatever this counter says,
/// so implementations must count accurately: every `increment` is eventually
/// matched by at most one `decrement`. The value only has to be exact once all
/// in-flight operations have returned.
///
/// An item is counted after the slot holding it is published, so a concurrent
/// erase may decrement first. Implementations must tolerate that and never
/// report less than zero.
pub trait ItemCounter: Send + Sync {
    fn increment(&self);

    fn decrement(&self);

    fn value(&self) -> usize;
}

/// A single cache-padded atomic counter.
#[derive(Default)]
pub struct AtomicItemCounter {
    count: CachePadded<AtomicIsize>,
}

impl ItemCounter for AtomicItemCounter {
    #[inline]
    fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn decrement(&self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    fn value(&self) -> usize {
        self.count.load(Ordering::Relaxed).max(0) as usize
    }
}

/// A counter striped over several cache-padded cells.
///
/// Each thread always updates the same cell, which removes contention on a
/// single cache line when many threads insert and erase at once. Reading the
/// value sums every cell and is therefore slower than with
/// [`AtomicItemCounter`].
pub struct StripedItemCounter {
    cells: Box<[CachePadded<AtomicIsize>]>,
}

impl StripedItemCounter {
    /// # Panics
    ///
    /// Panics if `stripes` is 0.
    pub fn new(stripes: usize) -> Self {
        assert!(stripes > 0);
        let cells = (0..stripes)
            .map(|_| CachePadded::new(AtomicIsize::new(0)))
            .collect();
        Self { cells }
    }

    fn cell(&self) -> &AtomicIsize {
        &self.cells[thread_stripe() % self.cells.len()]
    }
}

impl Default for StripedItemCounter {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTER_STRIPES)
    }
}

impl ItemCounter for StripedItemCounter {
    #[inline]
    fn increment(&self) {
        self.cell().fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn decrement(&self) {
        self.cell().fetch_sub(1, Ordering::Relaxed);
    }

    fn value(&self) -> usize {
        // A single cell goes negative when items are erased by a thread other
        // than the one that inserted them.
        let sum: isize = self
            .cells
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum();
        sum.max(0) as usize
    }
}

fn thread_stripe() -> usize {
    static NEXT_STRIPE: AtomicUsize = AtomicUsize::new(0);

    thread_local! {
        static STRIPE: Cell<Option<usize>> = Cell::new(None);
    }

    STRIPE.with(|stripe| match stripe.get() {
        Some(s) => s,
        None => {
            let s = NEXT_STRIPE.fetch_add(1, Ordering::Relaxed);
            stripe.set(Some(s));
            s
        }
    })
}
