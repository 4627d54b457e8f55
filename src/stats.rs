//! Statistics about the operations and the shape of a trie.
//!
//! Operation statistics are recorded by a [`StatsCounter`] chosen at build time.
//! By default a trie uses [`DisabledStatsCounter`], which records nothing; call
//! `HashTrieBuilder::stats_enabled(true)` to use [`DefaultStatsCounter`]
//! instead.
//!
//! [`LevelStatistics`] describe the shape of the trie and are computed on
//! demand by `HashTrie::level_statistics`, regardless of the stats counter.

mod level_stats;
mod stats_counter;
mod trie_stats;

pub use level_stats::LevelStatistics;
pub use stats_counter::{DefaultStatsCounter, DisabledStatsCounter, StatsCounter};
pub use trie_stats::TrieStats;
