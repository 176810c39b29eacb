use crate::error::LockOrderViolation;

use parking_lot::Mutex;
use parking_lot::lock_api::RawMutex as _;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, DefaultHasher};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

/// Source of lock identities. Ids are never reused within a process.
static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Locks held by each thread of control, in acquisition order.
///
/// A single record spans every [`OrderedLockSet`], so nesting through two
/// different sets is checked exactly like nesting through one.
static RECORDS: Mutex<HashMap<ThreadId, Vec<LockId>, BuildHasherDefault<DefaultHasher>>> =
    parking_lot::const_mutex(HashMap::with_hasher(BuildHasherDefault::new()));

/// Globally comparable identity of an [`OrderedLock`].
///
/// Ids are assigned from a monotonic counter at construction, so a lock
/// created earlier always orders before a lock created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(u64);

impl LockId {
    /// Returns the raw numeric identity.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// A plain mutual-exclusion lock with a stable ordering identity.
///
/// An `OrderedLock` carries no data: it guards whatever critical section
/// its owner associates with it. It can only be taken through an
/// [`OrderedLockSet`], which enforces the global acquisition order.
pub struct OrderedLock {
    id: LockId,
    raw: parking_lot::RawMutex,
}

impl OrderedLock {
    /// Creates a new unlocked lock with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: LockId(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed)),
            raw: parking_lot::RawMutex::INIT,
        }
    }

    /// Returns the lock's ordering identity.
    pub fn id(&self) -> LockId {
        self.id
    }

    /// Returns `true` if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Default for OrderedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OrderedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedLock")
            .field("id", &self.id)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Deadlock-avoiding acquisition of groups of locks.
///
/// Every batch passed to [`acquire`](Self::acquire) is taken in ascending
/// [`LockId`] order, which makes circular waits impossible. Nested
/// acquisitions are checked against a per-thread record of held locks: a
/// thread that already holds a lock may only take locks with strictly
/// greater ids.
///
/// The acquisition record is keyed by [`ThreadId`] and shared by every set
/// of the process, whichever set a lock was taken through. Entries are
/// created on the first acquisition of a thread and removed as soon as the
/// thread holds nothing. A set is therefore a cheap handle and may be
/// created wherever it is convenient.
///
/// # Examples
///
/// ```rust
/// use conclave::sync::{OrderedLock, OrderedLockSet};
///
/// let set = OrderedLockSet::new();
/// let (x, y) = (OrderedLock::new(), OrderedLock::new());
///
/// {
///     // Order of the arguments does not matter.
///     let _guard = set.acquire(&[&y, &x]).unwrap();
///     assert!(x.is_locked() && y.is_locked());
/// }
///
/// assert!(!x.is_locked() && !y.is_locked());
/// ```
#[derive(Clone, Copy, Default)]
pub struct OrderedLockSet {
    _private: (),
}

impl OrderedLockSet {
    /// Creates a handle on the acquisition record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every lock in `locks`, blocking until all are held.
    ///
    /// Locks are sorted by id and duplicates are ignored. Before taking
    /// anything, the calling thread's record is checked: if it already
    /// holds a lock whose id is greater than or equal to the smallest
    /// requested id, the call fails with [`LockOrderViolation`] and no new
    /// lock is taken.
    ///
    /// The returned guard releases the locks in reverse order when dropped,
    /// including during unwinding.
    pub fn acquire<'a>(
        &'a self,
        locks: &[&'a OrderedLock],
    ) -> Result<LockSetGuard<'a>, LockOrderViolation> {
        let locks = admit(locks)?;

        for lock in &locks {
            lock.raw.lock();
        }

        Ok(LockSetGuard::new(locks))
    }

    /// Attempts to acquire every lock in `locks` without blocking.
    ///
    /// Performs the same order check as [`acquire`](Self::acquire). Returns
    /// `Ok(None)` if any lock is busy, in which case locks taken so far are
    /// released and the record is left unchanged.
    pub fn try_acquire<'a>(
        &'a self,
        locks: &[&'a OrderedLock],
    ) -> Result<Option<LockSetGuard<'a>>, LockOrderViolation> {
        let locks = admit(locks)?;

        for (taken, lock) in locks.iter().enumerate() {
            if !lock.raw.try_lock() {
                for held in locks[..taken].iter().rev() {
                    // Safety: these locks were taken by this call on this thread.
                    unsafe { held.raw.unlock() };
                }
                forget(&locks);
                return Ok(None);
            }
        }

        Ok(Some(LockSetGuard::new(locks)))
    }

    /// Returns the ids currently held by the calling thread, in acquisition
    /// order.
    pub fn held(&self) -> Vec<LockId> {
        RECORDS
            .lock()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for OrderedLockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedLockSet")
            .field("threads", &RECORDS.lock().len())
            .finish()
    }
}

/// Sorts the batch, checks it against the caller's record and records it.
fn admit<'a>(locks: &[&'a OrderedLock]) -> Result<Vec<&'a OrderedLock>, LockOrderViolation> {
    let mut locks = locks.to_vec();
    locks.sort_by_key(|lock| lock.id);
    locks.dedup_by_key(|lock| lock.id);

    let Some(first) = locks.first() else {
        return Ok(locks);
    };

    let mut records = RECORDS.lock();
    let record = records.entry(thread::current().id()).or_default();

    if let Some(&held) = record.iter().max() {
        if held >= first.id {
            tracing::warn!(%held, requested = %first.id, "lock order violation");

            return Err(LockOrderViolation {
                held,
                requested: first.id,
            });
        }
    }

    record.extend(locks.iter().map(|lock| lock.id));
    Ok(locks)
}

/// Removes `locks` from the caller's record.
fn forget(locks: &[&OrderedLock]) {
    if locks.is_empty() {
        return;
    }

    let id = thread::current().id();
    let mut records = RECORDS.lock();

    if let Some(record) = records.get_mut(&id) {
        record.retain(|held| !locks.iter().any(|lock| lock.id == *held));

        if record.is_empty() {
            records.remove(&id);
        }
    }
}

/// Scope-bound ownership of a batch of locks.
///
/// Created by [`OrderedLockSet::acquire`]. Dropping the guard releases the
/// locks in descending id order and removes them from the owning thread's
/// record. The guard cannot leave the thread that acquired it.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct LockSetGuard<'a> {
    locks: Vec<&'a OrderedLock>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> LockSetGuard<'a> {
    fn new(locks: Vec<&'a OrderedLock>) -> Self {
        Self {
            locks,
            _not_send: PhantomData,
        }
    }

    /// Ids held by this guard, ascending.
    pub fn ids(&self) -> Vec<LockId> {
        self.locks.iter().map(|lock| lock.id).collect()
    }
}

impl fmt::Debug for LockSetGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockSetGuard")
            .field("ids", &self.ids())
            .finish()
    }
}

impl Drop for LockSetGuard<'_> {
    fn drop(&mut self) {
        for lock in self.locks.iter().rev() {
            // Safety: the guard owns these locks and is pinned to this thread.
            unsafe { lock.raw.unlock() };
        }

        forget(&self.locks);
    }
}
