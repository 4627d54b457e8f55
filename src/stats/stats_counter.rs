use super::TrieStats;

use crossbeam_utils::atomic::AtomicCell;

fn saturating_add(counter: &AtomicCell<u64>, value: u64) {
    let mut v0 = counter.load();
    loop {
        let v1 = v0.saturating_add(value);
        match counter.compare_exchange(v0, v1) {
            Ok(_) => break,
            Err(v2) => v0 = v2,
        }
    }
}

fn store_max(cell: &AtomicCell<u64>, value: u64) {
    let mut v0 = cell.load();
    while v0 < value {
        match cell.compare_exchange(v0, value) {
            Ok(_) => break,
            Err(v1) => v0 = v1,
        }
    }
}

/// Records the events of trie operations.
///
/// Every method but `snapshot` has a no-op default, so a counter only needs to
/// implement the events it cares about. The counters are observability signals
/// only; the trie never reads them back.
pub trait StatsCounter: Send + Sync {
    fn record_insert_success(&self) {}

    fn record_insert_failed(&self) {}

    fn record_insert_retry(&self) {}

    fn record_update_new(&self) {}

    fn record_update_existing(&self) {}

    fn record_update_failed(&self) {}

    fn record_update_retry(&self) {}

    fn record_erase_success(&self) {}

    fn record_erase_failed(&self) {}

    fn record_erase_retry(&self) {}

    fn record_find_success(&self) {}

    fn record_find_failed(&self) {}

    fn record_expand_node_success(&self) {}

    fn record_expand_node_failed(&self) {}

    fn record_slot_changed(&self) {}

    fn record_slot_converting(&self) {}

    fn record_array_node_created(&self) {}

    #[allow(unused_variables)]
    fn record_height(&self, height: usize) {}

    fn snapshot(&self) -> TrieStats;
}

/// A `StatsCounter` that does not record any event.
#[derive(Debug, Default)]
pub struct DisabledStatsCounter;

impl StatsCounter for DisabledStatsCounter {
    fn snapshot(&self) -> TrieStats {
        // All counters stay at 0.
        TrieStats::default()
    }
}

#[derive(Default)]
pub struct DefaultStatsCounter {
    insert_success_count: AtomicCell<u64>,
    insert_failed_count: AtomicCell<u64>,
    insert_retry_count: AtomicCell<u64>,
    update_new_count: AtomicCell<u64>,
    update_existing_count: AtomicCell<u64>,
    update_failed_count: AtomicCell<u64>,
    update_retry_count: AtomicCell<u64>,
    erase_success_count: AtomicCell<u64>,
    erase_failed_count: AtomicCell<u64>,
    erase_retry_count: AtomicCell<u64>,
    find_success_count: AtomicCell<u64>,
    find_failed_count: AtomicCell<u64>,
    expand_node_success_count: AtomicCell<u64>,
    expand_node_failed_count: AtomicCell<u64>,
    slot_changed_count: AtomicCell<u64>,
    slot_converting_count: AtomicCell<u64>,
    array_node_count: AtomicCell<u64>,
    height: AtomicCell<u64>,
}

impl StatsCounter for DefaultStatsCounter {
    fn record_insert_success(&self) {
        saturating_add(&self.insert_success_count, 1);
    }

    fn record_insert_failed(&self) {
        saturating_add(&self.insert_failed_count, 1);
    }

    fn record_insert_retry(&self) {
        saturating_add(&self.insert_retry_count, 1);
    }

    fn record_update_new(&self) {
        saturating_add(&self.update_new_count, 1);
    }

    fn record_update_existing(&self) {
        saturating_add(&self.update_existing_count, 1);
    }

    fn record_update_failed(&self) {
        saturating_add(&self.update_failed_count, 1);
    }

    fn record_update_retry(&self) {
        saturating_add(&self.update_retry_count, 1);
    }

    fn record_erase_success(&self) {
        saturating_add(&self.erase_success_count, 1);
    }

    fn record_erase_failed(&self) {
        saturating_add(&self.erase_failed_count, 1);
    }

    fn record_erase_retry(&self) {
        saturating_add(&self.erase_retry_count, 1);
    }

    fn record_find_success(&self) {
        saturating_add(&self.find_success_count, 1);
    }

    fn record_find_failed(&self) {
        saturating_add(&self.find_failed_count, 1);
    }

    fn record_expand_node_success(&self) {
        saturating_add(&self.expand_node_success_count, 1);
    }

    fn record_expand_node_failed(&self) {
        saturating_add(&self.expand_node_failed_count, 1);
    }

    fn record_slot_changed(&self) {
        saturating_add(&self.slot_changed_count, 1);
    }

    fn record_slot_converting(&self) {
        saturating_add(&self.slot_converting_count, 1);
    }

    fn record_array_node_created(&self) {
        saturating_add(&self.array_node_count, 1);
    }

    fn record_height(&self, height: usize) {
        store_max(&self.height, height as u64);
    }

    fn snapshot(&self) -> TrieStats {
        TrieStats {
            insert_success_count: self.insert_success_count.load(),
            insert_failed_count: self.insert_failed_count.load(),
            insert_retry_count: self.insert_retry_count.load(),
            update_new_count: self.update_new_count.load(),
            update_existing_count: self.update_existing_count.load(),
            update_failed_count: self.update_failed_count.load(),
            update_retry_count: self.update_retry_count.load(),
            erase_success_count: self.erase_success_count.load(),
            erase_failed_count: self.erase_failed_count.load(),
            erase_retry_count: self.erase_retry_count.load(),
            find_success_count: self.find_success_count.load(),
            find_failed_count: self.find_failed_count.load(),
            expand_node_success_count: self.expand_node_success_count.load(),
            expand_node_failed_count: self.expand_node_failed_count.load(),
            slot_changed_count: self.slot_changed_count.load(),
            slot_converting_count: self.slot_converting_count.load(),
            array_node_count: self.array_node_count.load(),
            height: self.height.load(),
        }
    }
}
