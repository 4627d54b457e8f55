use std::fmt;

/// The error type of the fallible `HashTrie` operations.
///
/// Not finding an item, finding a duplicate, and losing a compare-and-swap race
/// are all ordinary outcomes and never reported through this type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An array node could not be allocated, either because the configured
    /// [`NodeAllocator`][node-allocator] refused it or because the global
    /// allocator is out of memory.
    ///
    /// When this happens in the middle of an expansion, the slot being expanded
    /// is restored to the leaf it held before, so the trie stays fully usable.
    ///
    /// [node-allocator]: ./alloc/trait.NodeAllocator.html
    #[error("failed to allocate an array node of {capacity} slots")]
    AllocationFailed { capacity: usize },

    /// A grace-period barrier was requested from inside a read region. Waiting
    /// would never finish because the calling thread itself keeps the grace
    /// period open.
    ///
    /// Only reported when the reclamation scheme is configured with
    /// [`DeadlockPolicy::Error`][policy].
    ///
    /// [policy]: ./reclaim/enum.DeadlockPolicy.html#variant.Error
    #[error("synchronize was called inside a read region and would deadlock")]
    Deadlock,

    /// Two items whose hash values compare unequal agree on every hash bit.
    /// This means the configured comparator is inconsistent with the bytes of
    /// the hash value.
    #[error("hash bits exhausted at depth {depth} without telling two items apart")]
    HashBitsExhausted { depth: usize },

    /// The builder was given a configuration that cannot be realized.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The error of [`HashTrie::insert`][insert] and [`HashTrie::update`][update].
/// Hands back the item that was not added, so it can be retried.
///
/// Converts into an [`Error`], dropping the item.
///
/// [insert]: ./struct.HashTrie.html#method.insert
/// [update]: ./struct.HashTrie.html#method.update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertError<T> {
    error: Error,
    item: T,
}

impl<T> InsertError<T> {
    pub(crate) fn new(error: Error, item: T) -> Self {
        Self { error, item }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn into_item(self) -> T {
        self.item
    }

    pub fn into_parts(self) -> (Error, T) {
        (self.error, self.item)
    }
}

impl<T> fmt::Display for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the item was not added: {}", self.error)
    }
}

impl<T: fmt::Debug> std::error::Error for InsertError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<InsertError<T>> for Error {
    fn from(e: InsertError<T>) -> Self {
        e.error
    }
}
