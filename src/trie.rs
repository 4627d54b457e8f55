//! A lock-free hash trie.
//!
//! The trie is a tree of fixed-size arrays of atomic slots. The bits of an
//! item's hash value, most significant first, select one slot per level: the
//! first `head_bits` pick a slot of the head array, and every further group of
//! `array_bits` picks a slot of an array node one level down.
//!
//! A slot is in one of four states:
//!
//! - empty (a null pointer),
//! - a leaf holding one item,
//! - an array node one level down,
//! - converting: a leaf pointer carrying a tag bit, set while the leaf is being
//!   pushed down into a new array node.
//!
//! All mutations are single compare-and-swaps on one slot. When an insertion
//! meets a leaf with a different hash value, the inserting thread first marks
//! the slot converting, builds a new array node holding the old leaf at its
//! next-level index, and then publishes the array node with a plain store. No
//! other thread may change a converting slot, so readers and writers that see
//! the mark back off and read the slot again. Array nodes are never removed
//! while the trie is alive; erasing only empties slots.
//!
//! Memory is reclaimed through [`Reclaim`][reclaim]: every operation runs in a
//! read region and unlinked leaves are retired rather than freed.
//!
//! [reclaim]: ../reclaim/trait.Reclaim.html

pub(crate) mod metrics;
pub(crate) mod node;
pub(crate) mod set;
pub(crate) mod splitter;
pub(crate) mod traverse;

use std::sync::Arc;

/// Extracts the hash value of an item.
pub type HashAccessor<T, H> = Arc<dyn Fn(&T) -> H + Send + Sync + 'static>;

/// Receives every item the trie releases: erased and replaced items once no
/// reader can see them any more, and the remaining items when the trie is
/// dropped.
pub type Disposer<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;
