//! Memory reclamation schemes.
//!
//! A trie never frees a leaf or an array node that another thread might still
//! be reading. Every operation runs inside a [`ReadRegion`]: pointers loaded from
//! slots while the region is open stay valid until it is closed (dropped), and
//! nodes unlinked during the region are retired rather than freed. The scheme
//! decides when retired nodes are finally released.
//!
//! Two schemes are provided, both built on [`crossbeam_epoch`]:
//!
//! - [`EpochReclaim`], the default, shares the process-wide epoch collector.
//! - [`RcuReclaim`] owns a private collector and adds an RCU-style
//!   [`synchronize`](Reclaim::synchronize) barrier with a configurable
//!   [`DeadlockPolicy`].

use crate::common::{constants::GRACE_PERIOD_ROUNDS, error::Error};

use std::{
    cell::{Cell, RefCell},
    fmt,
    ops::Deref,
    ptr,
    rc::Rc,
    sync::{Arc, Weak},
};

use crossbeam_epoch::{Collector, Guard, LocalHandle};
use smallvec::SmallVec;

/// A reclamation scheme.
pub trait Reclaim: Send + Sync {
    /// Opens a read region. Nodes retired by any thread after this call are not
    /// released before the region is dropped.
    fn enter_read_region(&self) -> ReadRegion;

    /// Returns `true` if `region` protects memory retired through this scheme.
    fn owns(&self, region: &ReadRegion) -> bool;

    /// Waits for a grace period, so that nodes retired before the call get
    /// released.
    ///
    /// This is best-effort for schemes shared with other code: threads that
    /// keep a region open elsewhere hold the grace period back.
    fn synchronize(&self) -> Result<(), Error>;
}

/// A scoped read region. Closing the region is dropping it.
///
/// Dereferences to the [`Guard`] that protects loaded pointers.
pub struct ReadRegion {
    guard: Guard,
    _rcu: Option<RcuReader>,
}

impl ReadRegion {
    /// Wraps a guard pinned by a custom reclamation scheme.
    pub fn from_guard(guard: Guard) -> Self {
        Self { guard, _rcu: None }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }
}

impl Deref for ReadRegion {
    type Target = Guard;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl fmt::Debug for ReadRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadRegion")
            .field("rcu", &self._rcu.is_some())
            .finish()
    }
}

/// Epoch-based reclamation on the global `crossbeam_epoch` collector.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpochReclaim;

impl Reclaim for EpochReclaim {
    fn enter_read_region(&self) -> ReadRegion {
        ReadRegion::from_guard(crossbeam_epoch::pin())
    }

    fn owns(&self, region: &ReadRegion) -> bool {
        region.collector() == Some(crossbeam_epoch::default_collector())
    }

    fn synchronize(&self) -> Result<(), Error> {
        if crossbeam_epoch::is_pinned() {
            // The epoch cannot advance past our own pin. Hand over what we have
            // and leave the rest to later collections.
            crossbeam_epoch::pin().flush();
            return Ok(());
        }

        for _ in 0..GRACE_PERIOD_ROUNDS {
            crossbeam_epoch::pin().flush();
        }
        log::trace!("epoch grace period: {GRACE_PERIOD_ROUNDS} rounds");
        Ok(())
    }
}

/// What [`RcuReclaim::synchronize`] does when it is called from inside a read
/// region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeadlockPolicy {
    /// Return [`Error::Deadlock`].
    #[default]
    Error,
    /// Run the barrier anyway. It cannot release anything retired while the
    /// calling thread is pinned.
    Ignore,
    /// Panic.
    Panic,
}

/// The state of one thread in one RCU domain: its registration with the
/// domain's collector and how many read regions it has open there.
struct RcuParticipant {
    handle: LocalHandle,
    depth: Cell<usize>,
}

struct CachedParticipant {
    domain: Weak<()>,
    participant: Rc<RcuParticipant>,
}

thread_local! {
    static RCU_PARTICIPANTS: RefCell<Vec<CachedParticipant>> = RefCell::new(Vec::new());
}

/// Keeps the thread's participant alive and counted as reading while a region
/// is open.
struct RcuReader {
    participant: Rc<RcuParticipant>,
}

impl RcuReader {
    fn enter(participant: Rc<RcuParticipant>) -> Self {
        participant.depth.set(participant.depth.get() + 1);
        Self { participant }
    }
}

impl Drop for RcuReader {
    fn drop(&mut self) {
        let depth = &self.participant.depth;
        depth.set(depth.get() - 1);
    }
}

/// RCU-style reclamation on a collector private to one trie.
///
/// Each `RcuReclaim` is its own RCU domain. Read regions are tracked per thread
/// and per domain, so a [`synchronize`](Reclaim::synchronize) issued from inside
/// a read region of the same domain is detected and handled according to the
/// [`DeadlockPolicy`]. Regions of other domains do not hold its grace periods
/// back.
///
/// A thread registers with the collector on its first read region and keeps
/// that registration until the domain is dropped and the thread opens a read
/// region of any domain, or until the thread exits. Retired nodes still
/// pending at that point are released then.
pub struct RcuReclaim {
    collector: Collector,
    domain: Arc<()>,
    policy: DeadlockPolicy,
}

impl RcuReclaim {
    pub fn new(policy: DeadlockPolicy) -> Self {
        Self {
            collector: Collector::new(),
            domain: Arc::new(()),
            policy,
        }
    }

    pub fn policy(&self) -> DeadlockPolicy {
        self.policy
    }

    /// Returns `true` if the current thread is inside a read region of this
    /// domain.
    pub fn in_read_region(&self) -> bool {
        RCU_PARTICIPANTS
            .try_with(|participants| {
                participants
                    .borrow()
                    .iter()
                    .find(|cached| self.is_domain_of(cached))
                    .map_or(false, |cached| cached.participant.depth.get() > 0)
            })
            .unwrap_or(false)
    }

    fn is_domain_of(&self, cached: &CachedParticipant) -> bool {
        ptr::eq(cached.domain.as_ptr(), Arc::as_ptr(&self.domain))
    }

    /// Returns the participant of the current thread, registering it on first
    /// use. Participants of dropped domains are released on the way.
    fn participant(&self) -> Rc<RcuParticipant> {
        let found = RCU_PARTICIPANTS.try_with(|participants| {
            let mut stale = SmallVec::<[CachedParticipant; 4]>::new();
            let mut participants = participants.borrow_mut();

            let mut i = 0;
            while i < participants.len() {
                if participants[i].domain.strong_count() == 0 {
                    stale.push(participants.swap_remove(i));
                } else {
                    i += 1;
                }
            }

            let position = participants
                .iter()
                .position(|cached| self.is_domain_of(cached));
            let participant = match position {
                Some(i) => Rc::clone(&participants[i].participant),
                None => {
                    let participant = Rc::new(self.register());
                    participants.push(CachedParticipant {
                        domain: Arc::downgrade(&self.domain),
                        participant: Rc::clone(&participant),
                    });
                    participant
                }
            };
            // Unregistering may run deferred functions. Release the cache first.
            drop(participants);
            drop(stale);
            participant
        });

        // The cache is gone while the thread exits.
        found.unwrap_or_else(|_| Rc::new(self.register()))
    }

    fn register(&self) -> RcuParticipant {
        RcuParticipant {
            handle: self.collector.register(),
            depth: Cell::new(0),
        }
    }
}

impl Default for RcuReclaim {
    fn default() -> Self {
        Self::new(DeadlockPolicy::default())
    }
}

impl fmt::Debug for RcuReclaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RcuReclaim")
            .field("policy", &self.policy)
            .finish()
    }
}

impl Reclaim for RcuReclaim {
    fn enter_read_region(&self) -> ReadRegion {
        let participant = self.participant();
        let guard = participant.handle.pin();
        ReadRegion {
            guard,
            _rcu: Some(RcuReader::enter(participant)),
        }
    }

    fn owns(&self, region: &ReadRegion) -> bool {
        region.collector() == Some(&self.collector)
    }

    fn synchronize(&self) -> Result<(), Error> {
        if self.in_read_region() {
            match self.policy {
                DeadlockPolicy::Error => {
                    log::error!("synchronize called inside an RCU read region");
                    return Err(Error::Deadlock);
                }
                DeadlockPolicy::Panic => {
                    panic!("synchronize called inside an RCU read region");
                }
                DeadlockPolicy::Ignore => {
                    log::debug!("synchronize inside an RCU read region; ignoring");
                }
            }
        }

        let participant = self.participant();
        for _ in 0..GRACE_PERIOD_ROUNDS {
            participant.handle.pin().flush();
        }
        log::trace!("rcu grace period: {GRACE_PERIOD_ROUNDS} rounds");
        Ok(())
    }
}
