use crate::common::constants::{MIN_ARRAY_BITS, MIN_HEAD_BITS};

/// The node sizes of a trie, normalized from the requested bit widths.
///
/// Requested widths are not honored verbatim:
///
/// - `array_bits` is raised to at least 2.
/// - `head_bits` is raised to at least 4 and capped at the width of the hash.
/// - `head_bits` then grows by `(hash_bits - head_bits) % array_bits`, so that
///   the bits below the head cut divide evenly into array cuts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metrics {
    hash_bits: usize,
    head_node_size_log: usize,
    array_node_size_log: usize,
}

impl Metrics {
    pub fn make(head_bits: usize, array_bits: usize, hash_size: usize) -> Self {
        let hash_bits = hash_size * 8;

        let array_bits = array_bits.max(MIN_ARRAY_BITS);
        let mut head_bits = head_bits.max(MIN_HEAD_BITS).min(hash_bits);

        let remainder = (hash_bits - head_bits) % array_bits;
        if remainder != 0 {
            head_bits += remainder;
        }

        debug_assert_eq!((hash_bits - head_bits) % array_bits, 0);

        Self {
            hash_bits,
            head_node_size_log: head_bits,
            array_node_size_log: array_bits,
        }
    }

    /// The number of bits consumed by the head array.
    pub fn head_node_size_log(&self) -> usize {
        self.head_node_size_log
    }

    /// The number of bits consumed by each deeper array node.
    pub fn array_node_size_log(&self) -> usize {
        self.array_node_size_log
    }

    /// The number of slots of the head array, `2^head_node_size_log`.
    ///
    /// # Panics
    ///
    /// Panics if the size does not fit in `usize`.
    pub fn head_node_size(&self) -> usize {
        node_size(self.head_node_size_log)
    }

    /// The number of slots of every deeper array node, `2^array_node_size_log`.
    ///
    /// # Panics
    ///
    /// Panics if the size does not fit in `usize`.
    pub fn array_node_size(&self) -> usize {
        node_size(self.array_node_size_log)
    }

    pub fn hash_bits(&self) -> usize {
        self.hash_bits
    }

    /// The number of levels of a fully expanded trie, the head array included.
    pub fn max_depth(&self) -> usize {
        1 + (self.hash_bits - self.head_node_size_log) / self.array_node_size_log
    }
}

fn node_size(log: usize) -> usize {
    u32::try_from(log)
        .ok()
        .and_then(|log| 1usize.checked_shl(log))
        .unwrap_or_else(|| panic!("a node of 2^{log} slots does not fit in usize"))
}
