#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! `hashtrie` provides a lock-free concurrent set organized as a multi-level
//! trie over fixed-width hash values, a.k.a. a Feldman hash trie.
//!
//! Items are keyed by a hash value that the caller extracts from each item,
//! such as a digest, a UUID or a fixed-width integer key. The bits of the hash
//! value select one slot per level of the trie. All operations are lock-free:
//! each one only ever compare-and-swaps a single slot, and threads that meet a
//! slot being expanded by another thread back off and read it again.
//!
//! # Features
//!
//! - Insert, update (with or without insertion), find and erase by hash value.
//! - Configurable node sizes, memory ordering, backoff, item counting and
//!   array node allocation, see [`HashTrieBuilder`].
//! - Deferred memory reclamation through a pluggable [`Reclaim`][reclaim]
//!   scheme: epoch-based by default, or RCU-style with a grace-period barrier
//!   and deadlock detection.
//! - Operation statistics and per-level shape statistics.
//!
//! # Example
//!
//! ```rust
//! use hashtrie::{HashTrie, UpdateOutcome};
//! use std::{sync::Arc, thread};
//!
//! let trie = Arc::new(
//!     HashTrie::builder(|(key, _): &(u32, u32)| key.to_be_bytes())
//!         .build()
//!         .expect("valid configuration"),
//! );
//!
//! let handles: Vec<_> = (0..4u32)
//!     .map(|t| {
//!         let trie = Arc::clone(&trie);
//!         thread::spawn(move || {
//!             for i in 0..100u32 {
//!                 let key = t * 1000 + i;
//!                 trie.insert((key, 0)).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! handles.into_iter().for_each(|h| h.join().unwrap());
//!
//! assert_eq!(trie.len(), 400);
//! assert_eq!(trie.update((2042, 1), false), Ok(UpdateOutcome::Updated));
//! assert_eq!(trie.find(&2042u32.to_be_bytes()), Some((2042, 1)));
//! ```
//!
//! [reclaim]: ./reclaim/trait.Reclaim.html

pub mod alloc;
pub mod hash;
pub mod reclaim;
pub mod stats;

mod builder;
mod common;
mod trie;

pub use builder::HashTrieBuilder;
pub use common::{
    backoff::{Backoff, ExponentialBackoff, NoBackoff, SpinBackoff, YieldBackoff},
    error::{Error, InsertError},
    item_counter::{AtomicItemCounter, ItemCounter, StripedItemCounter},
    MemoryModel,
};
pub use trie::{
    metrics::Metrics,
    set::{HashTrie, InsertOutcome, UpdateOutcome},
    Disposer, HashAccessor,
};
