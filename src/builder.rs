use crate::{
    alloc::{DefaultAllocator, NodeAllocator},
    common::{
        backoff::{Backoff, ExponentialBackoff},
        constants::{DEFAULT_ARRAY_BITS, DEFAULT_HEAD_BITS, MAX_NODE_BITS},
        error::Error,
        item_counter::{AtomicItemCounter, ItemCounter},
        MemoryModel,
    },
    hash::{BitwiseComparator, HashComparator, HashValue},
    reclaim::{EpochReclaim, Reclaim},
    stats::{DefaultStatsCounter, DisabledStatsCounter, StatsCounter},
    trie::{metrics::Metrics, set::HashTrie, Disposer, HashAccessor},
};

use std::sync::Arc;

/// Builds a [`HashTrie`][hash-trie] with various configuration knobs.
///
/// Only the hash accessor is mandatory. Everything else has a default:
///
/// | Option | Default |
/// |---|---|
/// | `comparator` | [`BitwiseComparator`][bitwise] |
/// | `head_bits` / `array_bits` | 8 / 4 |
/// | `allocator` | [`DefaultAllocator`][default-alloc] |
/// | `memory_model` | [`MemoryModel::Relaxed`][relaxed] |
/// | `backoff` | [`ExponentialBackoff`][exp-backoff] |
/// | statistics | disabled |
/// | `disposer` | none; released items are dropped |
/// | `item_counter` | [`AtomicItemCounter`][atomic-counter] |
/// | `reclaim` | [`EpochReclaim`][epoch] |
///
/// [hash-trie]: ./struct.HashTrie.html
/// [bitwise]: ./hash/struct.BitwiseComparator.html
/// [default-alloc]: ./alloc/struct.DefaultAllocator.html
/// [relaxed]: ./enum.MemoryModel.html#variant.Relaxed
/// [exp-backoff]: ./struct.ExponentialBackoff.html
/// [atomic-counter]: ./struct.AtomicItemCounter.html
/// [epoch]: ./reclaim/struct.EpochReclaim.html
///
/// # Examples
///
/// ```rust
/// use hashtrie::{reclaim::RcuReclaim, HashTrieBuilder, MemoryModel};
///
/// // Items are (id, payload) pairs keyed by the 8 bytes of the id.
/// let trie = HashTrieBuilder::new(|item: &(u64, String)| item.0.to_be_bytes())
///     .head_bits(10)
///     .array_bits(6)
///     .memory_model(MemoryModel::SequentiallyConsistent)
///     .reclaim(RcuReclaim::default())
///     .stats_enabled(true)
///     .build()
///     .expect("valid configuration");
///
/// // 64 - 10 = 54 bits below the head cut, divisible by 6.
/// assert_eq!(trie.head_node_size(), 1024);
/// assert_eq!(trie.array_node_size(), 64);
///
/// trie.insert((7, "seven".to_string())).unwrap();
/// assert_eq!(trie.statistics().insert_success_count(), 1);
/// ```
pub struct HashTrieBuilder<T, H> {
    accessor: HashAccessor<T, H>,
    comparator: Arc<dyn HashComparator<H>>,
    head_bits: usize,
    array_bits: usize,
    allocator: Arc<dyn NodeAllocator>,
    memory_model: MemoryModel,
    backoff: Arc<dyn Backoff>,
    stats_counter: Arc<dyn StatsCounter>,
    item_counter: Arc<dyn ItemCounter>,
    disposer: Option<Disposer<T>>,
    reclaim: Arc<dyn Reclaim>,
}

impl<T, H> HashTrieBuilder<T, H>
where
    T: Send + Sync + 'static,
    H: HashValue,
{
    /// Construct a new `HashTrieBuilder` for items whose hash value is
    /// extracted by `accessor`.
    pub fn new(accessor: impl Fn(&T) -> H + Send + Sync + 'static) -> Self {
        Self {
            accessor: Arc::new(accessor),
            comparator: Arc::new(BitwiseComparator),
            head_bits: DEFAULT_HEAD_BITS,
            array_bits: DEFAULT_ARRAY_BITS,
            allocator: Arc::new(DefaultAllocator),
            memory_model: MemoryModel::default(),
            backoff: Arc::new(ExponentialBackoff::default()),
            stats_counter: Arc::new(DisabledStatsCounter),
            item_counter: Arc::new(AtomicItemCounter::default()),
            disposer: None,
            reclaim: Arc::new(EpochReclaim),
        }
    }

    /// Builds a `HashTrie<T, H>`.
    ///
    /// The requested bit widths are normalized as described in
    /// [`Metrics`][metrics]; check [`HashTrie::metrics`][trie-metrics] for the
    /// widths actually used.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `H` is zero bytes wide, or if a node would
    ///   have more than `2^24` slots after normalization.
    /// - [`Error::AllocationFailed`] if the head array cannot be allocated.
    ///
    /// [metrics]: ./struct.Metrics.html
    /// [trie-metrics]: ./struct.HashTrie.html#method.metrics
    pub fn build(self) -> Result<HashTrie<T, H>, Error> {
        if H::SIZE == 0 {
            return Err(Error::InvalidConfig(
                "the hash value must be at least one byte wide".to_string(),
            ));
        }

        let metrics = Metrics::make(self.head_bits, self.array_bits, H::SIZE);
        let head_bits = metrics.head_node_size_log();
        let array_bits = metrics.array_node_size_log();

        if head_bits > MAX_NODE_BITS || array_bits > MAX_NODE_BITS {
            return Err(Error::InvalidConfig(format!(
                "node bits (head: {head_bits}, array: {array_bits}) exceed the maximum of {MAX_NODE_BITS}"
            )));
        }

        if head_bits != self.head_bits || array_bits != self.array_bits {
            log::debug!(
                "adjusted node bits from (head: {}, array: {}) to (head: {head_bits}, array: {array_bits}) for a {}-bit hash",
                self.head_bits,
                self.array_bits,
                metrics.hash_bits(),
            );
        }

        let trie = HashTrie::with_everything(
            metrics,
            self.accessor,
            self.comparator,
            self.allocator,
            self.memory_model,
            self.backoff,
            self.stats_counter,
            self.item_counter,
            self.disposer,
            self.reclaim,
        )?;

        log::debug!(
            "built a hash trie: {} head slots, {} slots per array node, max depth {}",
            trie.head_node_size(),
            trie.array_node_size(),
            metrics.max_depth(),
        );
        Ok(trie)
    }

    /// Sets the comparator that decides whether two hash values are equal.
    ///
    /// It must agree with the bytes of the hash value; see
    /// [`HashComparator`][comparator].
    ///
    /// [comparator]: ./hash/trait.HashComparator.html
    pub fn comparator(self, comparator: impl HashComparator<H> + 'static) -> Self {
        Self {
            comparator: Arc::new(comparator),
            ..self
        }
    }

    /// Sets the number of hash bits consumed by the head array.
    pub fn head_bits(self, bits: usize) -> Self {
        Self {
            head_bits: bits,
            ..self
        }
    }

    /// Sets the number of hash bits consumed by each deeper array node.
    pub fn array_bits(self, bits: usize) -> Self {
        Self {
            array_bits: bits,
            ..self
        }
    }

    /// Sets the allocator that approves and accounts for array nodes.
    pub fn allocator<A: NodeAllocator + 'static>(self, allocator: Arc<A>) -> Self {
        Self {
            allocator,
            ..self
        }
    }

    pub fn memory_model(self, memory_model: MemoryModel) -> Self {
        Self {
            memory_model,
            ..self
        }
    }

    /// Sets the strategy applied between retries of a contended slot.
    pub fn backoff(self, backoff: impl Backoff + 'static) -> Self {
        Self {
            backoff: Arc::new(backoff),
            ..self
        }
    }

    /// Enables or disables the operation statistics returned by
    /// [`HashTrie::statistics`][statistics].
    ///
    /// [statistics]: ./struct.HashTrie.html#method.statistics
    pub fn stats_enabled(self, enabled: bool) -> Self {
        let stats_counter: Arc<dyn StatsCounter> = if enabled {
            Arc::new(DefaultStatsCounter::default())
        } else {
            Arc::new(DisabledStatsCounter)
        };
        Self {
            stats_counter,
            ..self
        }
    }

    /// Records operation statistics with a custom counter.
    pub fn stats_counter(self, counter: impl StatsCounter + 'static) -> Self {
        Self {
            stats_counter: Arc::new(counter),
            ..self
        }
    }

    /// Sets a closure that receives every item the trie releases, instead of
    /// dropping it.
    pub fn disposer(self, disposer: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            disposer: Some(Arc::new(disposer)),
            ..self
        }
    }

    /// Sets the counter backing [`HashTrie::len`][len].
    ///
    /// [len]: ./struct.HashTrie.html#method.len
    pub fn item_counter(self, counter: impl ItemCounter + 'static) -> Self {
        Self {
            item_counter: Arc::new(counter),
            ..self
        }
    }

    /// Sets the memory reclamation scheme.
    pub fn reclaim(self, reclaim: impl Reclaim + 'static) -> Self {
        Self {
            reclaim: Arc::new(reclaim),
            ..self
        }
    }
}
