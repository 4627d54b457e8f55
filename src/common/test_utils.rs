use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// An item with an explicit 32-bit hash, so tests can place items at chosen
/// slots and force expansions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) hash: [u8; 4],
    pub(crate) value: u32,
}

impl Entry {
    pub(crate) fn new(hash: u32, value: u32) -> Self {
        Self {
            hash: hash.to_be_bytes(),
            value,
        }
    }

    pub(crate) fn hash(&self) -> [u8; 4] {
        self.hash
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    created: AtomicU32,
    dropped: AtomicU32,
    disposed: AtomicU32,
}

impl Counters {
    pub(crate) fn created(&self) -> u32 {
        self.created.load(Ordering::Acquire)
    }

    pub(crate) fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn disposed(&self) -> u32 {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn incl_disposed(&self) {
        self.disposed.fetch_add(1, Ordering::AcqRel);
    }
}

/// An `Entry` that reports its construction and destruction to `Counters`.
#[derive(Debug)]
pub(crate) struct Tracked {
    pub(crate) entry: Entry,
    counters: Arc<Counters>,
}

impl Tracked {
    pub(crate) fn new(entry: Entry, counters: &Arc<Counters>) -> Self {
        counters.created.fetch_add(1, Ordering::AcqRel);
        Self {
            entry,
            counters: Arc::clone(counters),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::AcqRel);
    }
}

/// Drives the global epoch collector until deferred destructions have run.
pub(crate) fn run_deferred() {
    for _ in 0..65536 {
        let guard = crossbeam_epoch::pin();

        unsafe { guard.defer_destroy(crossbeam_epoch::Owned::new(0).into_shared(&guard)) };

        guard.flush();
    }
}
