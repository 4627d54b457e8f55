use super::{
    metrics::Metrics,
    node::{defer_dispose_leaf, into_item, ArrayNode, Node, Slot, SlotState, CONVERTING_TAG},
    splitter::HashSplitter,
    Disposer, HashAccessor,
};
use crate::{
    alloc::NodeAllocator,
    common::{
        backoff::Backoff,
        error::{Error, InsertError},
        item_counter::ItemCounter,
        MemoryModel,
    },
    hash::{HashComparator, HashValue},
    stats::{LevelStatistics, StatsCounter},
};

use std::{
    cmp::Ordering,
    sync::{atomic, Arc},
};

use crossbeam_epoch::{Guard, Owned, Shared};
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InstallMode {
    /// Add the item only if no item with an equal hash is present.
    Insert,
    /// Replace the item with an equal hash, or add the item if there is none
    /// and `allow_insert` is set.
    Update { allow_insert: bool },
}

impl InstallMode {
    fn op(self) -> Op {
        match self {
            Self::Insert => Op::Insert,
            Self::Update { .. } => Op::Update,
        }
    }
}

pub(crate) enum Installed<T> {
    Inserted,
    Updated,
    /// Insert mode only. Holds the item that was not inserted.
    Duplicate(T),
    /// Update mode without `allow_insert` only. Holds the item that was not
    /// inserted.
    Rejected(T),
}

#[derive(Clone, Copy)]
enum Op {
    Insert,
    Update,
    Erase,
}

/// Everything a traversal needs, borrowed from a `HashTrie`.
pub(crate) struct TrieRef<'a, T, H> {
    pub(crate) head: &'a ArrayNode<T>,
    pub(crate) metrics: Metrics,
    pub(crate) accessor: &'a HashAccessor<T, H>,
    pub(crate) comparator: &'a dyn HashComparator<H>,
    pub(crate) allocator: &'a Arc<dyn NodeAllocator>,
    pub(crate) memory_model: MemoryModel,
    pub(crate) backoff: &'a dyn Backoff,
    pub(crate) stats: &'a dyn StatsCounter,
    pub(crate) item_counter: &'a dyn ItemCounter,
    pub(crate) disposer: Option<&'a Disposer<T>>,
}

impl<'a, T, H: HashValue> TrieRef<'a, T, H> {
    pub(crate) fn find<'g>(&self, guard: &'g Guard, hash: &H) -> Option<&'g T> {
        let splitter = self.splitter(hash);
        let mut node = self.head;
        let mut level = 0;
        let mut attempt = 0;

        while let Some(index) = splitter.cut(level) {
            let current = node.slot(index).load(self.memory_model.load(), guard);

            match unsafe { SlotState::of(current) } {
                SlotState::Empty => break,
                SlotState::Leaf(item) => {
                    // A leaf with another hash means there is no deeper level
                    // for this hash yet.
                    if self.has_hash(item, hash) {
                        self.stats.record_find_success();
                        return Some(item);
                    }
                    break;
                }
                SlotState::Array(child) => {
                    node = child;
                    level += 1;
                    attempt = 0;
                }
                SlotState::Converting => {
                    self.stats.record_slot_converting();
                    self.backoff.backoff(attempt);
                    attempt = attempt.saturating_add(1);
                }
            }
        }

        self.stats.record_find_failed();
        None
    }

    /// Installs `item` as a leaf.
    ///
    /// On error, the trie is unchanged and the error holds `item`.
    pub(crate) fn install(
        &self,
        guard: &Guard,
        item: T,
        mode: InstallMode,
    ) -> Result<Installed<T>, InsertError<T>> {
        let hash = (self.accessor)(&item);
        let splitter = self.splitter(&hash);
        let op = mode.op();
        let (success, failure) = self.memory_model.cas();

        let mut new_leaf = Owned::new(Node::Leaf(item));
        let mut node = self.head;
        let mut level = 0;
        let mut attempt = 0;

        loop {
            let index = match splitter.cut(level) {
                Some(index) => index,
                None => {
                    let error = Error::HashBitsExhausted { depth: level };
                    return Err(InsertError::new(error, into_item(new_leaf)));
                }
            };
            let slot = node.slot(index);
            let current = slot.load(self.memory_model.load(), guard);

            match unsafe { SlotState::of(current) } {
                SlotState::Empty => {
                    if mode == (InstallMode::Update { allow_insert: false }) {
                        self.stats.record_update_failed();
                        return Ok(Installed::Rejected(into_item(new_leaf)));
                    }

                    match slot.compare_exchange(current, new_leaf, success, failure, guard) {
                        Ok(_) => {
                            self.item_counter.increment();
                            match op {
                                Op::Insert => self.stats.record_insert_success(),
                                _ => self.stats.record_update_new(),
                            }
                            self.stats.record_height(level + 1);
                            return Ok(Installed::Inserted);
                        }
                        Err(e) => {
                            new_leaf = e.new;
                            self.retry(op, &mut attempt, false);
                        }
                    }
                }
                SlotState::Leaf(existing) => {
                    let existing_hash = (self.accessor)(existing);

                    if self.comparator.compare(&hash, &existing_hash) != Ordering::Equal {
                        match self.expand(guard, slot, current, &existing_hash, level) {
                            Ok(Some(child)) => {
                                node = child;
                                level += 1;
                                attempt = 0;
                            }
                            Ok(None) => {
                                self.stats.record_expand_node_failed();
                                self.retry(op, &mut attempt, false);
                            }
                            Err(e) => return Err(InsertError::new(e, into_item(new_leaf))),
                        }
                        continue;
                    }

                    if mode == InstallMode::Insert {
                        self.stats.record_insert_failed();
                        return Ok(Installed::Duplicate(into_item(new_leaf)));
                    }

                    match slot.compare_exchange(current, new_leaf, success, failure, guard) {
                        Ok(_) => {
                            unsafe { defer_dispose_leaf(guard, current, self.disposer) };
                            self.stats.record_update_existing();
                            return Ok(Installed::Updated);
                        }
                        Err(e) => {
                            new_leaf = e.new;
                            self.retry(op, &mut attempt, false);
                        }
                    }
                }
                SlotState::Array(child) => {
                    node = child;
                    level += 1;
                    attempt = 0;
                }
                SlotState::Converting => self.retry(op, &mut attempt, true),
            }
        }
    }

    /// Pushes the leaf in `slot` down into a new array node and returns that
    /// node, or `None` if the slot no longer holds `leaf`.
    ///
    /// If the array node cannot be allocated, `slot` is restored to `leaf`.
    fn expand<'g>(
        &self,
        guard: &'g Guard,
        slot: &Slot<T>,
        leaf: Shared<'g, Node<T>>,
        leaf_hash: &H,
        level: usize,
    ) -> Result<Option<&'g ArrayNode<T>>, Error> {
        let next_level = level + 1;
        let leaf_index = self
            .splitter(leaf_hash)
            .cut(next_level)
            .ok_or(Error::HashBitsExhausted { depth: next_level })?;

        let (success, failure) = self.memory_model.cas();
        let converting = leaf.with_tag(CONVERTING_TAG);
        if slot
            .compare_exchange(leaf, converting, success, failure, guard)
            .is_err()
        {
            return Ok(None);
        }

        // Only this thread may change the slot until the store below.
        let array = match ArrayNode::try_new(self.metrics.array_node_size(), self.allocator) {
            Ok(array) => array,
            Err(e) => {
                slot.store(leaf, self.memory_model.store());
                log::warn!("rolled back the expansion of a slot at depth {next_level}: {e}");
                return Err(e);
            }
        };
        array.slot(leaf_index).store(leaf, atomic::Ordering::Relaxed);

        let array = Owned::new(Node::Array(array)).into_shared(guard);
        slot.store(array, self.memory_model.store());

        self.stats.record_expand_node_success();
        self.stats.record_array_node_created();
        self.stats.record_height(next_level + 1);

        match unsafe { array.deref() } {
            Node::Array(array) => Ok(Some(array)),
            Node::Leaf(_) => unreachable!("just published an array node"),
        }
    }

    /// Unlinks the leaf with `hash` if `condition` holds for its item, and
    /// retires it. The returned reference stays valid while `guard` lives.
    pub(crate) fn erase<'g, F>(&self, guard: &'g Guard, hash: &H, mut condition: F) -> Option<&'g T>
    where
        F: FnMut(&T) -> bool,
    {
        let splitter = self.splitter(hash);
        let (success, failure) = self.memory_model.cas();
        let mut node = self.head;
        let mut level = 0;
        let mut attempt = 0;

        while let Some(index) = splitter.cut(level) {
            let slot = node.slot(index);
            let current = slot.load(self.memory_model.load(), guard);

            match unsafe { SlotState::of(current) } {
                SlotState::Empty => break,
                SlotState::Leaf(item) => {
                    if !self.has_hash(item, hash) || !condition(item) {
                        break;
                    }

                    match slot.compare_exchange(current, Shared::null(), success, failure, guard) {
                        Ok(_) => {
                            self.item_counter.decrement();
                            unsafe { defer_dispose_leaf(guard, current, self.disposer) };
                            self.stats.record_erase_success();
                            return Some(item);
                        }
                        Err(_) => self.retry(Op::Erase, &mut attempt, false),
                    }
                }
                SlotState::Array(child) => {
                    node = child;
                    level += 1;
                    attempt = 0;
                }
                SlotState::Converting => self.retry(Op::Erase, &mut attempt, true),
            }
        }

        self.stats.record_erase_failed();
        None
    }

    /// Empties every leaf slot reachable when it is visited and returns the
    /// number of leaves unlinked. Array nodes stay in place.
    pub(crate) fn clear(&self, guard: &Guard) -> usize {
        let (success, failure) = self.memory_model.cas();
        let mut stack: SmallVec<[&ArrayNode<T>; 16]> = SmallVec::new();
        stack.push(self.head);
        let mut unlinked = 0;

        while let Some(array) = stack.pop() {
            for slot in array.slots() {
                let mut attempt = 0;
                loop {
                    let current = slot.load(self.memory_model.load(), guard);

                    match unsafe { SlotState::of(current) } {
                        SlotState::Empty => break,
                        SlotState::Array(child) => {
                            stack.push(child);
                            break;
                        }
                        SlotState::Leaf(_) => {
                            if slot
                                .compare_exchange(current, Shared::null(), success, failure, guard)
                                .is_ok()
                            {
                                self.item_counter.decrement();
                                unsafe { defer_dispose_leaf(guard, current, self.disposer) };
                                unlinked += 1;
                                break;
                            }
                            self.retry(Op::Erase, &mut attempt, false);
                        }
                        SlotState::Converting => self.retry(Op::Erase, &mut attempt, true),
                    }
                }
            }
        }

        unlinked
    }

    pub(crate) fn level_statistics(&self, guard: &Guard) -> Vec<LevelStatistics> {
        let mut levels: Vec<LevelStatistics> = Vec::new();
        let mut stack: SmallVec<[(&ArrayNode<T>, usize); 16]> = SmallVec::new();
        stack.push((self.head, 0));

        while let Some((array, depth)) = stack.pop() {
            // Parents are visited before their children.
            if levels.len() == depth {
                levels.push(LevelStatistics::new(array.capacity()));
            }
            let level = &mut levels[depth];
            level.array_node_count += 1;

            for slot in array.slots() {
                let current = slot.load(self.memory_model.load(), guard);
                match unsafe { SlotState::of(current) } {
                    SlotState::Empty => level.empty_cell_count += 1,
                    // A converting slot still holds its leaf.
                    SlotState::Leaf(_) | SlotState::Converting => level.data_cell_count += 1,
                    SlotState::Array(child) => {
                        level.array_cell_count += 1;
                        stack.push((child, depth + 1));
                    }
                }
            }
        }

        levels
    }

    fn splitter<'h>(&self, hash: &'h H) -> HashSplitter<'h> {
        HashSplitter::new(
            hash.as_bytes(),
            self.metrics.head_node_size_log(),
            self.metrics.array_node_size_log(),
        )
    }

    #[inline]
    fn has_hash(&self, item: &T, hash: &H) -> bool {
        self.comparator.compare(hash, &(self.accessor)(item)) == Ordering::Equal
    }

    fn retry(&self, op: Op, attempt: &mut u32, converting: bool) {
        if converting {
            self.stats.record_slot_converting();
        } else {
            self.stats.record_slot_changed();
        }
        match op {
            Op::Insert => self.stats.record_insert_retry(),
            Op::Update => self.stats.record_update_retry(),
            Op::Erase => self.stats.record_erase_retry(),
        }
        self.backoff.backoff(*attempt);
        *attempt = attempt.saturating_add(1);
    }
}
