use std::ops::Add;

/// A snapshot of the operation statistics of a trie.
///
/// Counters are incremented according to the following rules:
///
/// - `insert` increments `insert_success_count` when the item was added and
///   `insert_failed_count` when an item with an equal hash was already present.
/// - `update` increments `update_new_count` when the item was added,
///   `update_existing_count` when it replaced an item with an equal hash, and
///   `update_failed_count` when nothing matched and insertion was not allowed.
/// - `erase` and its variants increment `erase_success_count` or
///   `erase_failed_count`.
/// - `find` and its variants increment `find_success_count` or
///   `find_failed_count`.
/// - Every retry after a lost compare-and-swap or a converting slot increments
///   the retry count of the running operation, plus `slot_changed_count` or
///   `slot_converting_count` respectively.
/// - Every collision that ends in a published array node increments
///   `expand_node_success_count`; a collision whose leaf was changed by another
///   thread first increments `expand_node_failed_count`.
/// - `array_node_count` counts the array nodes created, not including the head
///   array. `height` is the largest depth reached, the head array being depth 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrieStats {
    pub(crate) insert_success_count: u64,
    pub(crate) insert_failed_count: u64,
    pub(crate) insert_retry_count: u64,
    pub(crate) update_new_count: u64,
    pub(crate) update_existing_count: u64,
    pub(crate) update_failed_count: u64,
    pub(crate) update_retry_count: u64,
    pub(crate) erase_success_count: u64,
    pub(crate) erase_failed_count: u64,
    pub(crate) erase_retry_count: u64,
    pub(crate) find_success_count: u64,
    pub(crate) find_failed_count: u64,
    pub(crate) expand_node_success_count: u64,
    pub(crate) expand_node_failed_count: u64,
    pub(crate) slot_changed_count: u64,
    pub(crate) slot_converting_count: u64,
    pub(crate) array_node_count: u64,
    pub(crate) height: u64,
}

impl TrieStats {
    pub fn insert_success_count(&self) -> u64 {
        self.insert_success_count
    }

    pub fn insert_failed_count(&self) -> u64 {
        self.insert_failed_count
    }

    pub fn insert_retry_count(&self) -> u64 {
        self.insert_retry_count
    }

    pub fn update_new_count(&self) -> u64 {
        self.update_new_count
    }

    pub fn update_existing_count(&self) -> u64 {
        self.update_existing_count
    }

    pub fn update_failed_count(&self) -> u64 {
        self.update_failed_count
    }

    pub fn update_retry_count(&self) -> u64 {
        self.update_retry_count
    }

    pub fn erase_success_count(&self) -> u64 {
        self.erase_success_count
    }

    pub fn erase_failed_count(&self) -> u64 {
        self.erase_failed_count
    }

    pub fn erase_retry_count(&self) -> u64 {
        self.erase_retry_count
    }

    pub fn find_success_count(&self) -> u64 {
        self.find_success_count
    }

    pub fn find_failed_count(&self) -> u64 {
        self.find_failed_count
    }

    pub fn find_count(&self) -> u64 {
        self.find_success_count
            .saturating_add(self.find_failed_count)
    }

    pub fn find_success_rate(&self) -> f64 {
        let find_count = self.find_count();
        if find_count == 0 {
            1.0
        } else {
            self.find_success_count as f64 / find_count as f64
        }
    }

    pub fn expand_node_success_count(&self) -> u64 {
        self.expand_node_success_count
    }

    pub fn expand_node_failed_count(&self) -> u64 {
        self.expand_node_failed_count
    }

    pub fn slot_changed_count(&self) -> u64 {
        self.slot_changed_count
    }

    pub fn slot_converting_count(&self) -> u64 {
        self.slot_converting_count
    }

    pub fn array_node_count(&self) -> u64 {
        self.array_node_count
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

impl Add for &TrieStats {
    type Output = TrieStats;

    fn add(self, rhs: Self) -> Self::Output {
        TrieStats {
            insert_success_count: self
                .insert_success_count
                .saturating_add(rhs.insert_success_count),
            insert_failed_count: self
                .insert_failed_count
                .saturating_add(rhs.insert_failed_count),
            insert_retry_count: self
                .insert_retry_count
                .saturating_add(rhs.insert_retry_count),
            update_new_count: self.update_new_count.saturating_add(rhs.update_new_count),
            update_existing_count: self
                .update_existing_count
                .saturating_add(rhs.update_existing_count),
            update_failed_count: self
                .update_failed_count
                .saturating_add(rhs.update_failed_count),
            update_retry_count: self
                .update_retry_count
                .saturating_add(rhs.update_retry_count),
            erase_success_count: self
                .erase_success_count
                .saturating_add(rhs.erase_success_count),
            erase_failed_count: self
                .erase_failed_count
                .saturating_add(rhs.erase_failed_count),
            erase_retry_count: self.erase_retry_count.saturating_add(rhs.erase_retry_count),
            find_success_count: self
                .find_success_count
                .saturating_add(rhs.find_success_count),
            find_failed_count: self.find_failed_count.saturating_add(rhs.find_failed_count),
            expand_node_success_count: self
                .expand_node_success_count
                .saturating_add(rhs.expand_node_success_count),
            expand_node_failed_count: self
                .expand_node_failed_count
                .saturating_add(rhs.expand_node_failed_count),
            slot_changed_count: self
                .slot_changed_count
                .saturating_add(rhs.slot_changed_count),
            slot_converting_count: self
                .slot_converting_count
                .saturating_add(rhs.slot_converting_count),
            array_node_count: self.array_node_count.saturating_add(rhs.array_node_count),
            height: self.height.max(rhs.height),
        }
    }
}
