/// The shape of one level of a trie.
///
/// Returned by `HashTrie::level_statistics`, one entry per depth, the head
/// array first. Slots are read one at a time while other threads may be
/// mutating the trie, so the numbers of a level need not be consistent with
/// each other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelStatistics {
    /// The number of array nodes at this level.
    pub array_node_count: usize,
    /// The number of slots of each array node at this level.
    pub node_capacity: usize,
    /// The number of slots holding an item.
    pub data_cell_count: usize,
    /// The number of slots pointing to a deeper array node.
    pub array_cell_count: usize,
    /// The number of empty slots.
    pub empty_cell_count: usize,
}

impl LevelStatistics {
    pub(crate) fn new(node_capacity: usize) -> Self {
        Self {
            node_capacity,
            ..Default::default()
        }
    }

    /// The total number of slots at this level.
    pub fn cell_count(&self) -> usize {
        self.array_node_count * self.node_capacity
    }
}
