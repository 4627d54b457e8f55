use super::{
    metrics::Metrics,
    node::{dispose_node, ArrayNode, Node},
    traverse::{InstallMode, Installed, TrieRef},
    Disposer, HashAccessor,
};
use crate::{
    alloc::NodeAllocator,
    builder::HashTrieBuilder,
    common::{
        backoff::Backoff,
        error::{Error, InsertError},
        item_counter::ItemCounter,
        MemoryModel,
    },
    hash::{HashComparator, HashValue},
    reclaim::{ReadRegion, Reclaim},
    stats::{LevelStatistics, StatsCounter, TrieStats},
};

use std::{fmt, ptr, sync::atomic::Ordering, sync::Arc};

use crossbeam_epoch::{Guard, Shared};
use smallvec::SmallVec;

/// The outcome of [`HashTrie::insert`].
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The item was added.
    Inserted,
    /// An item with an equal hash value was already present. Holds the item
    /// that was not inserted.
    Duplicate(T),
}

impl<T> InsertOutcome<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// The outcome of [`HashTrie::update`].
#[derive(Debug, PartialEq, Eq)]
pub enum UpdateOutcome<T> {
    /// No item had an equal hash value, so the item was added.
    Inserted,
    /// The item replaced the item with an equal hash value.
    Updated,
    /// No item had an equal hash value and insertion was not allowed. Holds the
    /// item that was not inserted.
    Rejected(T),
}

/// A lock-free concurrent set of items, keyed by a fixed-width hash value.
///
/// Items with equal hash values are duplicates; the set holds at most one of
/// them. The hash value of an item is extracted by the hash accessor given to
/// [`HashTrie::builder`].
///
/// All operations take `&self` and may run concurrently from any number of
/// threads. Each one is lock-free and linearizable with respect to the other
/// operations on the same hash value.
///
/// # Examples
///
/// ```rust
/// use hashtrie::{HashTrie, InsertOutcome};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct User {
///     id: u32,
///     name: String,
/// }
///
/// let users = HashTrie::builder(|u: &User| u.id.to_be_bytes())
///     .build()
///     .expect("valid configuration");
///
/// let alice = User { id: 1, name: "alice".into() };
/// assert_eq!(users.insert(alice.clone()), Ok(InsertOutcome::Inserted));
///
/// // Same id, so this is a duplicate.
/// let impostor = User { id: 1, name: "mallory".into() };
/// assert!(!users.insert(impostor).unwrap().is_inserted());
///
/// assert_eq!(users.find(&1u32.to_be_bytes()), Some(alice));
/// assert!(users.erase(&1u32.to_be_bytes()).is_some());
/// assert!(users.is_empty());
/// ```
pub struct HashTrie<T, H> {
    head: ArrayNode<T>,
    metrics: Metrics,
    accessor: HashAccessor<T, H>,
    comparator: Arc<dyn HashComparator<H>>,
    allocator: Arc<dyn NodeAllocator>,
    memory_model: MemoryModel,
    backoff: Arc<dyn Backoff>,
    stats: Arc<dyn StatsCounter>,
    item_counter: Arc<dyn ItemCounter>,
    disposer: Option<Disposer<T>>,
    reclaim: Arc<dyn Reclaim>,
}

impl<T, H> HashTrie<T, H>
where
    T: Send + Sync + 'static,
    H: HashValue,
{
    /// Returns a builder for a trie whose items have their hash value extracted
    /// by `accessor`.
    pub fn builder(accessor: impl Fn(&T) -> H + Send + Sync + 'static) -> HashTrieBuilder<T, H> {
        HashTrieBuilder::new(accessor)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_everything(
        metrics: Metrics,
        accessor: HashAccessor<T, H>,
        comparator: Arc<dyn HashComparator<H>>,
        allocator: Arc<dyn NodeAllocator>,
        memory_model: MemoryModel,
        backoff: Arc<dyn Backoff>,
        stats: Arc<dyn StatsCounter>,
        item_counter: Arc<dyn ItemCounter>,
        disposer: Option<Disposer<T>>,
        reclaim: Arc<dyn Reclaim>,
    ) -> Result<Self, Error> {
        let head = ArrayNode::try_new(metrics.head_node_size(), &allocator)?;

        Ok(Self {
            head,
            metrics,
            accessor,
            comparator,
            allocator,
            memory_model,
            backoff,
            stats,
            item_counter,
            disposer,
            reclaim,
        })
    }

    /// Adds `item` unless an item with an equal hash value is present.
    ///
    /// # Errors
    ///
    /// The trie is left as it was and the returned [`InsertError`] holds the
    /// item. Its [`error`](InsertError::error) is:
    ///
    /// - [`Error::AllocationFailed`] if an array node needed to make room for
    ///   the item could not be allocated.
    /// - [`Error::HashBitsExhausted`] if the comparator tells apart two hash
    ///   values with identical bits.
    pub fn insert(&self, item: T) -> Result<InsertOutcome<T>, InsertError<T>> {
        let region = self.reclaim.enter_read_region();
        match self.trie_ref().install(&region, item, InstallMode::Insert)? {
            Installed::Inserted => Ok(InsertOutcome::Inserted),
            Installed::Duplicate(item) => Ok(InsertOutcome::Duplicate(item)),
            Installed::Updated | Installed::Rejected(_) => unreachable!(),
        }
    }

    /// Replaces the item with an equal hash value by `item`. If there is none,
    /// adds `item` if `allow_insert` is `true` and rejects it otherwise.
    ///
    /// The replaced item is released once no reader can see it any more.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](#method.insert).
    pub fn update(
        &self,
        item: T,
        allow_insert: bool,
    ) -> Result<UpdateOutcome<T>, InsertError<T>> {
        let region = self.reclaim.enter_read_region();
        let mode = InstallMode::Update { allow_insert };
        match self.trie_ref().install(&region, item, mode)? {
            Installed::Inserted => Ok(UpdateOutcome::Inserted),
            Installed::Updated => Ok(UpdateOutcome::Updated),
            Installed::Rejected(item) => Ok(UpdateOutcome::Rejected(item)),
            Installed::Duplicate(_) => unreachable!(),
        }
    }

    /// Returns a clone of the item with hash value `hash`.
    pub fn find(&self, hash: &H) -> Option<T>
    where
        T: Clone,
    {
        self.find_and(hash, T::clone)
    }

    /// Calls `with_item` on the item with hash value `hash` and returns its
    /// result.
    pub fn find_and<F, R>(&self, hash: &H, with_item: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        let region = self.reclaim.enter_read_region();
        self.trie_ref().find(&region, hash).map(with_item)
    }

    /// Returns a reference to the item with hash value `hash`, valid for as long
    /// as `region` stays open.
    ///
    /// # Panics
    ///
    /// Panics if `region` was not opened by [`read_region`](#method.read_region)
    /// of this trie or of another trie sharing its reclamation scheme.
    pub fn find_with_guard<'g>(&'g self, hash: &H, region: &'g ReadRegion) -> Option<&'g T> {
        self.check_region(region);
        self.trie_ref().find(region, hash)
    }

    /// Returns `true` if an item with hash value `hash` is present.
    pub fn contains(&self, hash: &H) -> bool {
        self.find_and(hash, |_| ()).is_some()
    }

    /// Removes the item with hash value `hash` and returns a clone of it.
    pub fn erase(&self, hash: &H) -> Option<T>
    where
        T: Clone,
    {
        self.erase_and(hash, T::clone)
    }

    /// Removes the item with hash value `hash`, calls `with_item` on it and
    /// returns the result.
    ///
    /// The removed item is released once no reader can see it any more.
    pub fn erase_and<F, R>(&self, hash: &H, with_item: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        let region = self.reclaim.enter_read_region();
        self.trie_ref().erase(&region, hash, |_| true).map(with_item)
    }

    /// Removes `item` itself, compared by address, from the trie. Returns
    /// `false` if the slot of its hash value holds another item or none.
    ///
    /// `item` is usually a reference returned by
    /// [`find_with_guard`](#method.find_with_guard).
    pub fn erase_item(&self, item: &T) -> bool {
        let hash = (self.accessor)(item);
        let region = self.reclaim.enter_read_region();
        self.trie_ref()
            .erase(&region, &hash, |candidate| ptr::eq(candidate, item))
            .is_some()
    }

    /// Removes every item.
    ///
    /// Items added concurrently may survive the call.
    pub fn clear(&self) {
        let region = self.reclaim.enter_read_region();
        let unlinked = self.trie_ref().clear(&region);
        log::trace!("cleared {unlinked} items");
    }

    /// Returns the number of items.
    ///
    /// The count is exact once all concurrent operations have returned.
    pub fn len(&self) -> usize {
        self.item_counter.value()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the shape of the trie, one entry per level, the head array first.
    pub fn level_statistics(&self) -> Vec<LevelStatistics> {
        let region = self.reclaim.enter_read_region();
        self.trie_ref().level_statistics(&region)
    }

    /// Returns a snapshot of the operation statistics. All counters are zero
    /// unless statistics were enabled on the builder.
    pub fn statistics(&self) -> TrieStats {
        self.stats.snapshot()
    }

    /// Opens a read region of this trie's reclamation scheme, for use with
    /// [`find_with_guard`](#method.find_with_guard). The region is closed when
    /// it is dropped.
    pub fn read_region(&self) -> ReadRegion {
        self.reclaim.enter_read_region()
    }

    /// Waits for a grace period, so that items erased or replaced before the
    /// call get released.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Deadlock`] when called inside a read region of an
    /// [`RcuReclaim`][rcu] with [`DeadlockPolicy::Error`][policy].
    ///
    /// [rcu]: ./reclaim/struct.RcuReclaim.html
    /// [policy]: ./reclaim/enum.DeadlockPolicy.html#variant.Error
    pub fn synchronize(&self) -> Result<(), Error> {
        self.reclaim.synchronize()
    }

    fn check_region(&self, region: &ReadRegion) {
        assert!(
            self.reclaim.owns(region),
            "the read region does not belong to the reclamation scheme of this trie"
        );
    }

    fn trie_ref(&self) -> TrieRef<'_, T, H> {
        TrieRef {
            head: &self.head,
            metrics: self.metrics,
            accessor: &self.accessor,
            comparator: &*self.comparator,
            allocator: &self.allocator,
            memory_model: self.memory_model,
            backoff: &*self.backoff,
            stats: &*self.stats,
            item_counter: &*self.item_counter,
            disposer: self.disposer.as_ref(),
        }
    }
}

impl<T, H: HashValue> HashTrie<T, H> {
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// The number of slots of the head array.
    pub fn head_node_size(&self) -> usize {
        self.head.capacity()
    }

    /// The number of slots of every deeper array node.
    pub fn array_node_size(&self) -> usize {
        self.metrics.array_node_size()
    }

    /// The width of the hash value in bytes.
    pub fn hash_size(&self) -> usize {
        H::SIZE
    }

    pub fn memory_model(&self) -> MemoryModel {
        self.memory_model
    }
}

impl<T, H> fmt::Debug for HashTrie<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTrie")
            .field("len", &self.item_counter.value())
            .field("metrics", &self.metrics)
            .field("memory_model", &self.memory_model)
            .finish_non_exhaustive()
    }
}

impl<T, H> Drop for HashTrie<T, H> {
    fn drop(&mut self) {
        // No other thread can reach the trie any more. Items that were already
        // retired are not reachable from it and are released by the reclamation
        // scheme.
        let guard = unsafe { crossbeam_epoch::unprotected() };
        let mut stack = SmallVec::new();
        push_children(&self.head, guard, &mut stack);

        while let Some(ptr) = stack.pop() {
            let node = unsafe { ptr.into_owned() };
            if let Node::Array(array) = &*node {
                push_children(array, guard, &mut stack);
            }
            dispose_node(node, self.disposer.as_ref());
        }
    }
}

fn push_children<'g, T>(
    array: &ArrayNode<T>,
    guard: &'g Guard,
    stack: &mut SmallVec<[Shared<'g, Node<T>>; 16]>,
) {
    for slot in array.slots() {
        let ptr = slot.load(Ordering::Relaxed, guard);
        if !ptr.is_null() {
            stack.push(ptr.with_tag(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HashTrie, InsertOutcome, UpdateOutcome};
    use crate::{
        alloc::BoundedAllocator,
        common::{
            available_parallelism,
            error::Error,
            test_utils::{run_deferred, Counters, Entry, Tracked},
        },
        reclaim::{DeadlockPolicy, EpochReclaim, RcuReclaim},
    };

    use std::{
        mem,
        sync::{Arc, Barrier},
        thread,
    };

    fn entry_trie() -> HashTrie<Entry, [u8; 4]> {
        HashTrie::builder(Entry::hash)
            .stats_enabled(true)
            .build()
            .expect("valid configuration")
    }

    fn key(hash: u32) -> [u8; 4] {
        hash.to_be_bytes()
    }

    #[test]
    fn basic_single_thread() {
        let _ = env_logger::builder().is_test(true).try_init();
        let trie = entry_trie();
        assert!(trie.is_empty());

        for i in 0..64u32 {
            let outcome = trie.insert(Entry::new(i * 0x0101_0101, i));
            assert_eq!(outcome, Ok(InsertOutcome::Inserted));
        }
        assert_eq!(trie.len(), 64);

        for i in 0..64u32 {
            assert_eq!(trie.find(&key(i * 0x0101_0101)).map(|e| e.value), Some(i));
            assert!(trie.contains(&key(i * 0x0101_0101)));
        }
        assert!(!trie.contains(&key(0xffff_ffff)));

        for i in (0..64u32).step_by(2) {
            let erased = trie.erase(&key(i * 0x0101_0101));
            assert_eq!(erased.map(|e| e.value), Some(i));
        }
        assert_eq!(trie.len(), 32);
        assert!(trie.find(&key(0)).is_none());
        assert!(trie.erase(&key(0)).is_none());
        assert_eq!(trie.find(&key(0x0101_0101)).map(|e| e.value), Some(1));

        let stats = trie.statistics();
        assert_eq!(stats.insert_success_count(), 64);
        assert_eq!(stats.erase_success_count(), 32);
        assert_eq!(stats.erase_failed_count(), 1);
    }

    #[test]
    fn duplicate_insert_hands_back_item() {
        let trie = entry_trie();
        assert!(trie.insert(Entry::new(42, 1)).unwrap().is_inserted());

        let outcome = trie.insert(Entry::new(42, 2));
        assert_eq!(outcome, Ok(InsertOutcome::Duplicate(Entry::new(42, 2))));
        assert_eq!(trie.find(&key(42)).map(|e| e.value), Some(1));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.statistics().insert_failed_count(), 1);
    }

    #[test]
    fn update_modes() {
        let trie = entry_trie();

        let rejected = trie.update(Entry::new(7, 1), false);
        assert_eq!(rejected, Ok(UpdateOutcome::Rejected(Entry::new(7, 1))));
        assert!(trie.is_empty());

        assert_eq!(trie.update(Entry::new(7, 1), true), Ok(UpdateOutcome::Inserted));
        assert_eq!(trie.update(Entry::new(7, 2), false), Ok(UpdateOutcome::Updated));
        assert_eq!(trie.update(Entry::new(7, 3), true), Ok(UpdateOutcome::Updated));
        assert_eq!(trie.find(&key(7)).map(|e| e.value), Some(3));
        assert_eq!(trie.len(), 1);

        let stats = trie.statistics();
        assert_eq!(stats.update_new_count(), 1);
        assert_eq!(stats.update_existing_count(), 2);
        assert_eq!(stats.update_failed_count(), 1);
    }

    #[test]
    fn collision_expands_one_level() {
        let trie = entry_trie();

        // Different head cuts: no expansion.
        trie.insert(Entry::new(0x1000_0000, 0)).unwrap();
        trie.insert(Entry::new(0x2000_0000, 0)).unwrap();
        assert_eq!(trie.level_statistics().len(), 1);

        // Same head cut (0x12) and same first array cut (0x3), different second
        // array cut.
        trie.insert(Entry::new(0x1234_0000, 1)).unwrap();
        trie.insert(Entry::new(0x1235_0000, 2)).unwrap();

        let levels = trie.level_statistics();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].array_node_count, 1);
        assert_eq!(levels[0].node_capacity, 256);
        assert_eq!(levels[0].data_cell_count, 2);
        assert_eq!(levels[0].array_cell_count, 1);
        assert_eq!(levels[0].empty_cell_count, 253);
        assert_eq!(levels[1].array_node_count, 1);
        assert_eq!(levels[1].node_capacity, 16);
        assert_eq!(levels[1].array_cell_count, 1);
        assert_eq!(levels[1].empty_cell_count, 15);
        assert_eq!(levels[2].data_cell_count, 2);
        assert_eq!(levels[2].cell_count(), 16);

        assert_eq!(trie.find(&key(0x1234_0000)).map(|e| e.value), Some(1));
        assert_eq!(trie.find(&key(0x1235_0000)).map(|e| e.value), Some(2));

        let stats = trie.statistics();
        assert_eq!(stats.expand_node_success_count(), 2);
        assert_eq!(stats.array_node_count(), 2);
        assert_eq!(stats.height(), 3);
    }

    #[test]
    fn expands_down_to_the_last_level() {
        let trie = entry_trie();
        trie.insert(Entry::new(0x1234_5678, 1)).unwrap();
        trie.insert(Entry::new(0x1234_5679, 2)).unwrap();

        let levels = trie.level_statistics();
        assert_eq!(levels.len(), trie.metrics().max_depth());
        assert_eq!(levels.len(), 7);
        assert_eq!(levels[6].data_cell_count, 2);
        assert_eq!(trie.find(&key(0x1234_5678)).map(|e| e.value), Some(1));
        assert_eq!(trie.find(&key(0x1234_5679)).map(|e| e.value), Some(2));

        // Erasing leaves the array nodes in place.
        trie.erase(&key(0x1234_5678)).unwrap();
        trie.erase(&key(0x1234_5679)).unwrap();
        assert!(trie.is_empty());
        assert_eq!(trie.level_statistics().len(), 7);
    }

    #[test]
    fn allocation_failure_reverts_the_slot() {
        let slot_size = mem::size_of::<usize>();
        let bounded = Arc::new(BoundedAllocator::new(slot_size * (256 + 16)));
        let trie = HashTrie::builder(Entry::hash)
            .allocator(Arc::clone(&bounded))
            .build()
            .expect("valid configuration");

        trie.insert(Entry::new(0x1200_0000, 1)).unwrap();
        // Expands the head slot 0x12 into the only array node the budget allows.
        trie.insert(Entry::new(0x1210_0000, 2)).unwrap();
        assert_eq!(bounded.used(), bounded.limit());

        // Collides with 0x1200_0000 one level down.
        let error = trie.insert(Entry::new(0x1201_0000, 3)).unwrap_err();
        assert_eq!(error.error(), &Error::AllocationFailed { capacity: 16 });
        let (_, item) = error.into_parts();
        assert_eq!(item, Entry::new(0x1201_0000, 3));

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.find(&key(0x1200_0000)).map(|e| e.value), Some(1));
        assert!(trie.find(&key(0x1201_0000)).is_none());
        assert_eq!(trie.level_statistics().len(), 2);

        // The slot is usable again, and the item handed back can be retried.
        assert_eq!(trie.erase(&key(0x1200_0000)).map(|e| e.value), Some(1));
        assert!(trie.insert(item).unwrap().is_inserted());
        assert_eq!(trie.find(&key(0x1201_0000)).map(|e| e.value), Some(3));

        drop(trie);
        assert_eq!(bounded.used(), 0);
    }

    #[test]
    fn update_hands_back_item_on_allocation_failure() {
        let slot_size = mem::size_of::<usize>();
        let bounded = Arc::new(BoundedAllocator::new(slot_size * 256));
        let counters = Arc::new(Counters::default());
        let trie = HashTrie::builder(|t: &Tracked| t.entry.hash())
            .allocator(bounded)
            .build()
            .expect("valid configuration");

        let tracked = |hash, value| Tracked::new(Entry::new(hash, value), &counters);
        trie.insert(tracked(0x1200_0000, 1)).unwrap();

        // Not `Clone`: the only way to retry is the item in the error.
        let error = trie.update(tracked(0x1210_0000, 2), true).unwrap_err();
        assert_eq!(error.error(), &Error::AllocationFailed { capacity: 16 });
        assert_eq!(error.item().entry.value, 2);
        assert_eq!(counters.dropped(), 0);

        assert!(trie.erase_and(&key(0x1200_0000), |_| ()).is_some());
        assert!(matches!(
            trie.update(error.into_item(), true),
            Ok(UpdateOutcome::Inserted)
        ));
        assert_eq!(trie.find_and(&key(0x1210_0000), |t| t.entry.value), Some(2));
    }

    #[test]
    fn inconsistent_comparator_exhausts_hash_bits() {
        // Every hash compares unequal, even to itself.
        let trie = HashTrie::builder(|item: &(u8, u32)| [item.0])
            .comparator(|_: &[u8; 1], _: &[u8; 1]| std::cmp::Ordering::Less)
            .stats_enabled(true)
            .build()
            .expect("valid configuration");
        assert_eq!(trie.metrics().max_depth(), 1);

        assert!(trie.insert((1, 1)).unwrap().is_inserted());
        let before = trie.level_statistics();

        let error = trie.insert((1, 2)).unwrap_err();
        assert_eq!(error.error(), &Error::HashBitsExhausted { depth: 1 });
        assert_eq!(error.into_item(), (1, 2));

        let after = trie.level_statistics();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].data_cell_count, 1);
        assert_eq!(after[0].array_cell_count, 0);
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.statistics().expand_node_success_count(), 0);

        // The slot was never marked as converting: the same insert fails the
        // same way instead of spinning, and other slots still take items.
        assert_eq!(
            trie.insert((1, 3)).map_err(Error::from),
            Err(Error::HashBitsExhausted { depth: 1 })
        );
        assert!(trie.insert((2, 1)).unwrap().is_inserted());
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn build_fails_when_head_does_not_fit() {
        let bounded = Arc::new(BoundedAllocator::new(16));
        let result = HashTrie::builder(Entry::hash).allocator(bounded).build();
        assert!(matches!(result, Err(Error::AllocationFailed { capacity: 256 })));
    }

    #[test]
    fn disposer_sees_every_item_once() {
        let counters = Arc::new(Counters::default());
        let disposed = Arc::clone(&counters);

        let trie = HashTrie::builder(|t: &Tracked| t.entry.hash())
            .reclaim(RcuReclaim::default())
            .disposer(move |t: Tracked| {
                disposed.incl_disposed();
                drop(t);
            })
            .build()
            .expect("valid configuration");

        let tracked = |hash, value| Tracked::new(Entry::new(hash, value), &counters);
        for hash in [0x1000_0000, 0x2000_0000, 0x2100_0000] {
            assert!(trie.insert(tracked(hash, 0)).unwrap().is_inserted());
        }
        assert!(matches!(
            trie.update(tracked(0x1000_0000, 1), false),
            Ok(UpdateOutcome::Updated)
        ));
        assert_eq!(
            trie.erase_and(&key(0x2000_0000), |t| t.entry.value),
            Some(0)
        );
        assert_eq!(counters.created(), 4);

        trie.synchronize().expect("not inside a read region");
        assert_eq!(counters.disposed(), 2);
        assert_eq!(counters.dropped(), 2);

        drop(trie);
        assert_eq!(counters.disposed(), 4);
        assert_eq!(counters.dropped(), 4);
    }

    #[test]
    fn clear_empties_but_keeps_arrays() {
        let trie = entry_trie();
        for i in 0..1000u32 {
            trie.insert(Entry::new(i.wrapping_mul(0x9e37_79b9), i)).unwrap();
        }
        assert_eq!(trie.len(), 1000);
        let depth = trie.level_statistics().len();

        trie.clear();
        assert!(trie.is_empty());
        assert!(trie.find(&key(0)).is_none());

        let levels = trie.level_statistics();
        assert_eq!(levels.len(), depth);
        assert!(levels.iter().all(|level| level.data_cell_count == 0));
    }

    #[test]
    fn erase_item_compares_addresses() {
        let trie = entry_trie();
        trie.insert(Entry::new(5, 50)).unwrap();

        let copy = Entry::new(5, 50);
        assert!(!trie.erase_item(&copy));
        assert_eq!(trie.len(), 1);

        let region = trie.read_region();
        let stored = trie.find_with_guard(&key(5), &region).expect("present");
        assert!(trie.erase_item(stored));
        // Still readable while the region is open.
        assert_eq!(stored.value, 50);
        drop(region);

        assert!(trie.is_empty());
    }

    #[test]
    fn rcu_synchronize_inside_region() {
        let trie = HashTrie::builder(Entry::hash)
            .reclaim(RcuReclaim::new(DeadlockPolicy::Error))
            .build()
            .expect("valid configuration");
        trie.insert(Entry::new(9, 90)).unwrap();

        let region = trie.read_region();
        let found = trie.find_with_guard(&key(9), &region).map(|e| e.value);
        assert_eq!(found, Some(90));
        assert_eq!(trie.synchronize(), Err(Error::Deadlock));
        drop(region);

        assert_eq!(trie.synchronize(), Ok(()));
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn foreign_region_is_rejected() {
        let trie = HashTrie::builder(Entry::hash)
            .reclaim(RcuReclaim::default())
            .build()
            .expect("valid configuration");
        let other = HashTrie::builder(Entry::hash)
            .reclaim(EpochReclaim)
            .build()
            .expect("valid configuration");

        let region = other.read_region();
        let _ = trie.find_with_guard(&key(1), &region);
    }

    #[test]
    fn closure_comparator_and_adjusted_bits() {
        let trie = HashTrie::builder(Entry::hash)
            .comparator(|a: &[u8; 4], b: &[u8; 4]| a.cmp(b))
            .head_bits(3)
            .array_bits(5)
            .build()
            .expect("valid configuration");

        assert_eq!(trie.metrics().head_node_size_log(), 7);
        assert_eq!(trie.head_node_size(), 128);
        assert_eq!(trie.array_node_size(), 32);
        assert_eq!(trie.hash_size(), 4);

        trie.insert(Entry::new(0xdead_beef, 1)).unwrap();
        trie.insert(Entry::new(0xdead_beee, 2)).unwrap();
        assert_eq!(trie.find(&key(0xdead_beef)).map(|e| e.value), Some(1));
        assert_eq!(trie.find(&key(0xdead_beee)).map(|e| e.value), Some(2));
        assert!(format!("{trie:?}").contains("len: 2"));
    }

    #[test]
    fn concurrent_insert_erase_releases_everything() {
        const ITEMS_PER_THREAD: u32 = 512;

        let num_threads = available_parallelism().max(2) as u32;
        let counters = Arc::new(Counters::default());
        let trie = Arc::new(
            HashTrie::builder(|t: &Tracked| t.entry.hash())
                .stats_enabled(true)
                .build()
                .expect("valid configuration"),
        );
        let barrier = Arc::new(Barrier::new(num_threads as usize));

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let trie = Arc::clone(&trie);
                let barrier = Arc::clone(&barrier);
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..ITEMS_PER_THREAD {
                        // Threads share the low bits, so their items collide
                        // in the head array and force expansions.
                        let hash = (i << 16) | t;
                        let item = Tracked::new(Entry::new(hash, i), &counters);
                        assert!(trie.insert(item).unwrap().is_inserted());
                    }
                    for i in (0..ITEMS_PER_THREAD).step_by(2) {
                        let hash = (i << 16) | t;
                        assert!(trie.erase_and(&key(hash), |_| ()).is_some());
                    }
                })
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().expect("thread failed"));

        let expected = num_threads * ITEMS_PER_THREAD / 2;
        assert_eq!(trie.len(), expected as usize);
        for t in 0..num_threads {
            for i in 0..ITEMS_PER_THREAD {
                let hash = (i << 16) | t;
                assert_eq!(trie.contains(&key(hash)), i % 2 == 1);
            }
        }
        assert_eq!(
            trie.statistics().erase_success_count(),
            u64::from(expected)
        );

        drop(trie);
        run_deferred();
        assert_eq!(counters.created(), num_threads * ITEMS_PER_THREAD);
        assert_eq!(counters.dropped(), counters.created());
    }
}
