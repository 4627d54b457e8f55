use std::cmp::Ordering;

use hashtrie::{
    alloc::BoundedAllocator,
    hash::{BitwiseComparator, HashComparator},
    reclaim::{DeadlockPolicy, RcuReclaim},
    Error, HashTrie, HashTrieBuilder, Metrics, StripedItemCounter, YieldBackoff,
};

#[test]
fn metrics_raise_head_bits_until_divisible() {
    let metrics = Metrics::make(3, 5, 4);
    assert_eq!(metrics.hash_bits(), 32);
    assert_eq!(metrics.head_node_size_log(), 7);
    assert_eq!(metrics.array_node_size_log(), 5);
    assert_eq!((32 - 7) % 5, 0);
    assert_eq!(metrics.head_node_size(), 128);
    assert_eq!(metrics.array_node_size(), 32);
}

#[test]
fn metrics_always_divide_evenly() {
    for hash_size in 1..=32 {
        for head_bits in 0..=40 {
            for array_bits in 0..=12 {
                let metrics = Metrics::make(head_bits, array_bits, hash_size);
                let head = metrics.head_node_size_log();
                let array = metrics.array_node_size_log();

                assert!(array >= 2);
                assert!(head >= 4.min(hash_size * 8));
                assert!(head <= hash_size * 8);
                assert_eq!(
                    (hash_size * 8 - head) % array,
                    0,
                    "head_bits={head_bits} array_bits={array_bits} hash_size={hash_size}"
                );
            }
        }
    }
}

#[test]
fn bitwise_comparator_follows_bytes() {
    let a = [0x01u8, 0x02, 0x03];
    let b = [0x01u8, 0x02, 0x03];
    let c = [0x01u8, 0x03, 0x00];

    assert_eq!(BitwiseComparator.compare(&a, &b), Ordering::Equal);
    assert_eq!(BitwiseComparator.compare(&a, &c), Ordering::Less);
    assert_eq!(BitwiseComparator.compare(&c, &a), Ordering::Greater);
}

#[test]
fn rcu_deadlock_policy_through_the_trie() -> anyhow::Result<()> {
    let trie = HashTrieBuilder::new(|v: &u32| v.to_be_bytes())
        .reclaim(RcuReclaim::new(DeadlockPolicy::Ignore))
        .backoff(YieldBackoff)
        .item_counter(StripedItemCounter::default())
        .build()?;

    trie.insert(1)?;
    let region = trie.read_region();
    assert_eq!(trie.find_with_guard(&1u32.to_be_bytes(), &region), Some(&1));
    // Ignored: the barrier runs without waiting for this region.
    trie.synchronize()?;
    drop(region);

    assert_eq!(trie.erase(&1u32.to_be_bytes()), Some(1));
    trie.synchronize()?;
    assert!(trie.is_empty());
    Ok(())
}

#[test]
fn allocation_budget_is_enforced() -> anyhow::Result<()> {
    let slot = std::mem::size_of::<usize>();
    // The head array (16 slots) and one array node (4 slots).
    let budget = std::sync::Arc::new(BoundedAllocator::new(slot * (16 + 4)));
    let trie = HashTrie::builder(|v: &u16| v.to_be_bytes())
        .head_bits(4)
        .array_bits(2)
        .allocator(std::sync::Arc::clone(&budget))
        .build()?;

    trie.insert(0x1000)?;
    trie.insert(0x1400)?;
    assert_eq!(trie.level_statistics().len(), 2);

    let error = trie.insert(0x1100).unwrap_err();
    assert_eq!(error.error(), &Error::AllocationFailed { capacity: 4 });
    assert_eq!(error.into_item(), 0x1100);
    assert_eq!(trie.len(), 2);
    assert_eq!(trie.find(&0x1000u16.to_be_bytes()), Some(0x1000));
    Ok(())
}
