use std::sync::atomic::Ordering;

pub(crate) mod backoff;
pub(crate) mod constants;
pub(crate) mod error;
pub(crate) mod item_counter;

#[cfg(test)]
pub(crate) mod test_utils;

/// The memory ordering model used for slot reads and slot writes.
///
/// Both models publish array nodes and leaves safely. `Relaxed` uses the weakest
/// orderings that still do so (acquire loads, release stores and acquire-release
/// compare-and-swaps); `SequentiallyConsistent` uses `SeqCst` everywhere, giving
/// a single total order over all slot mutations at some cost in throughput.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemoryModel {
    #[default]
    Relaxed,
    SequentiallyConsistent,
}

impl MemoryModel {
    #[inline]
    pub(crate) fn load(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Acquire,
            Self::SequentiallyConsistent => Ordering::SeqCst,
        }
    }

    #[inline]
    pub(crate) fn store(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Release,
            Self::SequentiallyConsistent => Ordering::SeqCst,
        }
    }

    /// Returns the `(success, failure)` orderings for a compare-and-swap.
    #[inline]
    pub(crate) fn cas(self) -> (Ordering, Ordering) {
        match self {
            Self::Relaxed => (Ordering::AcqRel, Ordering::Acquire),
            Self::SequentiallyConsistent => (Ordering::SeqCst, Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
pub(crate) fn available_parallelism() -> usize {
    use std::{num::NonZeroUsize, thread::available_parallelism};
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}
