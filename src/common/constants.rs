/// Default number of hash bits consumed by the head array (256 slots).
pub(crate) const DEFAULT_HEAD_BITS: usize = 8;

/// Default number of hash bits consumed by each deeper array node (16 slots).
pub(crate) const DEFAULT_ARRAY_BITS: usize = 4;

pub(crate) const MIN_HEAD_BITS: usize = 4;
pub(crate) const MIN_ARRAY_BITS: usize = 2;

/// Largest node width the builder accepts. A head array of this width already
/// takes 128MiB of slots on 64-bit targets.
pub(crate) const MAX_NODE_BITS: usize = 24;

// Same spin limit as `crossbeam_utils::Backoff`.
pub(crate) const DEFAULT_SPIN_LIMIT: u32 = 6;
pub(crate) const MAX_SPIN_LIMIT: u32 = 30;

/// How many pin-and-flush rounds a grace-period barrier runs.
pub(crate) const GRACE_PERIOD_ROUNDS: usize = 128;

/// Number of cells of a `StripedItemCounter` created by `Default`.
pub(crate) const DEFAULT_COUNTER_STRIPES: usize = 16;
