//! # Lock Coordinator
//!
//! Grants shared and exclusive locks on catalog objects (tables) to sessions.
//! Structural changes take the exclusive mode, which serializes them against
//! every other structural change on the same object.
//!
//! Locks are handed out as [`LockGuard`]s; dropping the guard releases the
//! lock and wakes blocked requesters. A blocked request ends in one of three
//! ways besides being granted:
//!
//! - the session's lock timeout elapses ([`LockError::Timeout`]),
//! - granting would close a cycle in the wait-for graph ([`LockError::Deadlock`]);
//!   the requesting session is the one aborted,
//! - the session's [`Interrupt`] is raised ([`LockError::Interrupted`]).
//!
//! In every case the requester leaves the wait queue holding nothing new. An
//! interrupt only ends a wait; a lock that can be granted right away is
//! granted. The wait it ends consumes it.

use crate::Interrupt;
use common::config::LOCK_POLL_INTERVAL;
use common::util::time::format_duration;
use common::{ObjectId, SessionId};
use getset::CopyGetters;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("Timeout trying to lock {resource} for {session} after {waited}")]
    Timeout {
        resource: ObjectId,
        session: SessionId,
        waited: String,
    },
    #[error("Deadlock detected: {session} waiting for {resource} closes a wait cycle")]
    Deadlock {
        resource: ObjectId,
        session: SessionId,
    },
    #[error("{session} was interrupted while waiting for {resource}")]
    Interrupted {
        resource: ObjectId,
        session: SessionId,
    },
}

/// Current grants on one resource. Counts make every grant re-entrant for
/// the session that already holds it.
#[derive(Debug, Default)]
struct Holders {
    exclusive: Option<(SessionId, usize)>,
    shared: HashMap<SessionId, usize>,
}

impl Holders {
    fn can_grant(&self, session: SessionId, mode: LockMode) -> bool {
        if let Some((owner, _)) = self.exclusive {
            return owner == session;
        }
        match mode {
            LockMode::Shared => true,
            LockMode::Exclusive => self.shared.keys().all(|holder| *holder == session),
        }
    }

    fn grant(&mut self, session: SessionId, mode: LockMode) {
        match mode {
            LockMode::Exclusive => match &mut self.exclusive {
                Some((_, count)) => *count += 1,
                None => self.exclusive = Some((session, 1)),
            },
            LockMode::Shared => *self.shared.entry(session).or_insert(0) += 1,
        }
    }

    fn release(&mut self, session: SessionId, mode: LockMode) {
        match mode {
            LockMode::Exclusive => {
                if let Some((owner, count)) = &mut self.exclusive {
                    debug_assert_eq!(*owner, session);
                    *count -= 1;
                    if *count == 0 {
                        self.exclusive = None;
                    }
                }
            }
            LockMode::Shared => {
                if let Some(count) = self.shared.get_mut(&session) {
                    *count -= 1;
                    if *count == 0 {
                        self.shared.remove(&session);
                    }
                }
            }
        }
    }

    fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.exclusive
            .iter()
            .map(|(owner, _)| *owner)
            .chain(self.shared.keys().copied())
    }

    fn is_empty(&self) -> bool {
        self.exclusive.is_none() && self.shared.is_empty()
    }
}

#[derive(Debug, Default)]
struct LockTable {
    resources: HashMap<ObjectId, Holders>,
    /// Wait-for edges: a blocked session and the resource it is waiting on.
    waiting: HashMap<SessionId, ObjectId>,
}

impl LockTable {
    fn can_grant(&self, resource: ObjectId, session: SessionId, mode: LockMode) -> bool {
        self.resources
            .get(&resource)
            .map_or(true, |holders| holders.can_grant(session, mode))
    }

    /// Follows holders of `resource`, then whatever those holders wait on, and
    /// reports whether the walk leads back to `session`.
    ///
    /// The requester's own grant on `resource` (an upgrade) only counts once
    /// the walk comes back to `resource` through another waiter.
    fn closes_cycle(&self, session: SessionId, resource: ObjectId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![(resource, true)];

        while let Some((current, requested)) = pending.pop() {
            let Some(holders) = self.resources.get(&current) else {
                continue;
            };
            for holder in holders.sessions() {
                if holder == session {
                    if !requested {
                        return true;
                    }
                    continue;
                }
                if visited.insert(holder) {
                    if let Some(next) = self.waiting.get(&holder) {
                        pending.push((*next, false));
                    }
                }
            }
        }

        false
    }
}

/// Grants table locks to sessions. One coordinator is shared by every table of
/// a database so that wait cycles spanning several tables can be detected.
#[derive(Debug, Default)]
pub struct LockCoordinator {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blocks until `session` holds `resource` in `mode`, or fails without
    /// holding anything.
    #[instrument(skip(self, interrupt))]
    pub fn acquire(
        self: &Arc<Self>,
        resource: ObjectId,
        session: SessionId,
        mode: LockMode,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<LockGuard, LockError> {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut table = self.table.lock();

        loop {
            if table.can_grant(resource, session, mode) {
                table.waiting.remove(&session);
                table
                    .resources
                    .entry(resource)
                    .or_default()
                    .grant(session, mode);
                debug!(
                    %resource,
                    %session,
                    %mode,
                    waited = %format_duration(start.elapsed()),
                    "lock granted"
                );
                return Ok(LockGuard {
                    coordinator: Arc::clone(self),
                    resource,
                    session,
                    mode,
                });
            }

            if interrupt.take() {
                table.waiting.remove(&session);
                warn!(%resource, %session, "lock wait interrupted");
                return Err(LockError::Interrupted { resource, session });
            }

            if table.closes_cycle(session, resource) {
                table.waiting.remove(&session);
                warn!(%resource, %session, "deadlock detected, aborting requester");
                return Err(LockError::Deadlock { resource, session });
            }

            let now = Instant::now();
            if now >= deadline {
                table.waiting.remove(&session);
                let waited = format_duration(now - start);
                warn!(%resource, %session, %waited, "lock wait timed out");
                return Err(LockError::Timeout {
                    resource,
                    session,
                    waited,
                });
            }

            table.waiting.insert(session, resource);
            trace!(%resource, %session, "waiting for lock");
            let _ = self
                .released
                .wait_for(&mut table, (deadline - now).min(LOCK_POLL_INTERVAL));
        }
    }

    /// The resource `session` is currently blocked on, if any.
    pub fn waiting_on(&self, session: SessionId) -> Option<ObjectId> {
        self.table.lock().waiting.get(&session).copied()
    }

    /// Returns `true` if any session holds a lock on `resource`.
    pub fn is_locked(&self, resource: ObjectId) -> bool {
        self.table
            .lock()
            .resources
            .get(&resource)
            .map_or(false, |holders| !holders.is_empty())
    }

    fn release(&self, resource: ObjectId, session: SessionId, mode: LockMode) {
        let mut table = self.table.lock();
        if let Some(holders) = table.resources.get_mut(&resource) {
            holders.release(session, mode);
            if holders.is_empty() {
                table.resources.remove(&resource);
            }
        }
        drop(table);

        trace!(%resource, %session, %mode, "lock released");
        self.released.notify_all();
    }
}

/// A granted lock. Released when dropped.
#[derive(CopyGetters)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    coordinator: Arc<LockCoordinator>,
    #[getset(get_copy = "pub")]
    resource: ObjectId,
    #[getset(get_copy = "pub")]
    session: SessionId,
    #[getset(get_copy = "pub")]
    mode: LockMode,
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("resource", &self.resource)
            .field("session", &self.session)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.coordinator
            .release(self.resource, self.session, self.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions_sorted::assert_eq;
    use std::thread;

    const TABLE: ObjectId = ObjectId(1);
    const OTHER_TABLE: ObjectId = ObjectId(2);
    const LONG: Duration = Duration::from_secs(5);
    const SHORT: Duration = Duration::from_millis(50);

    fn wait_until_blocked(coordinator: &LockCoordinator, session: SessionId) {
        let deadline = Instant::now() + LONG;
        while coordinator.waiting_on(session).is_none() {
            assert!(Instant::now() < deadline, "{session} never blocked");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_exclusive_excludes_other_sessions() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        let _guard = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, LONG, &interrupt)
            .unwrap();

        let result = coordinator.acquire(TABLE, SessionId(2), LockMode::Shared, SHORT, &interrupt);

        assert!(matches!(result, Err(LockError::Timeout { .. })));
        assert_eq!(coordinator.waiting_on(SessionId(2)), None);
    }

    #[test]
    fn test_shared_locks_are_compatible() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        let _first = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Shared, LONG, &interrupt)
            .unwrap();
        let _second = coordinator
            .acquire(TABLE, SessionId(2), LockMode::Shared, SHORT, &interrupt)
            .unwrap();

        let result =
            coordinator.acquire(TABLE, SessionId(3), LockMode::Exclusive, SHORT, &interrupt);
        assert!(matches!(result, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn test_reentrant_and_upgrade() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        let shared = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Shared, LONG, &interrupt)
            .unwrap();
        let exclusive = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, SHORT, &interrupt)
            .unwrap();
        let again = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, SHORT, &interrupt)
            .unwrap();

        drop(again);
        drop(shared);
        assert!(coordinator.is_locked(TABLE));
        drop(exclusive);
        assert!(!coordinator.is_locked(TABLE));
    }

    #[test]
    fn test_drop_wakes_waiter() {
        let coordinator = LockCoordinator::new();
        let guard = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, LONG, &Interrupt::new())
            .unwrap();

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                coordinator
                    .acquire(TABLE, SessionId(2), LockMode::Exclusive, LONG, &Interrupt::new())
                    .map(|guard| guard.session())
            })
        };

        wait_until_blocked(&coordinator, SessionId(2));
        drop(guard);

        assert_eq!(waiter.join().unwrap(), Ok(SessionId(2)));
        assert!(!coordinator.is_locked(TABLE));
    }

    #[test]
    fn test_deadlock_aborts_requester() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        let _a_holds = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, LONG, &interrupt)
            .unwrap();
        let b_holds = coordinator
            .acquire(OTHER_TABLE, SessionId(2), LockMode::Exclusive, LONG, &interrupt)
            .unwrap();

        let a_waits = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                coordinator
                    .acquire(OTHER_TABLE, SessionId(1), LockMode::Exclusive, LONG, &Interrupt::new())
                    .map(|guard| guard.resource())
            })
        };
        wait_until_blocked(&coordinator, SessionId(1));

        let result =
            coordinator.acquire(TABLE, SessionId(2), LockMode::Exclusive, LONG, &interrupt);
        assert_eq!(
            result.unwrap_err(),
            LockError::Deadlock {
                resource: TABLE,
                session: SessionId(2)
            }
        );

        drop(b_holds);
        assert_eq!(a_waits.join().unwrap(), Ok(OTHER_TABLE));
    }

    #[test]
    fn test_interrupt_stops_waiting() {
        let coordinator = LockCoordinator::new();
        let _guard = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Exclusive, LONG, &Interrupt::new())
            .unwrap();
        let interrupt = Interrupt::new();

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            let interrupt = interrupt.clone();
            thread::spawn(move || {
                coordinator
                    .acquire(TABLE, SessionId(2), LockMode::Exclusive, LONG, &interrupt)
                    .map(|guard| guard.session())
            })
        };
        wait_until_blocked(&coordinator, SessionId(2));
        interrupt.raise();

        assert_eq!(
            waiter.join().unwrap(),
            Err(LockError::Interrupted {
                resource: TABLE,
                session: SessionId(2)
            })
        );
        assert_eq!(coordinator.waiting_on(SessionId(2)), None);
        assert!(!interrupt.is_raised());
    }

    #[test]
    fn test_interrupt_raised_while_idle_does_not_block_a_free_lock() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        interrupt.raise();

        let guard = coordinator.acquire(TABLE, SessionId(1), LockMode::Exclusive, SHORT, &interrupt);

        assert!(guard.is_ok());
        assert!(interrupt.is_raised());
    }

    #[test]
    fn test_second_upgrade_of_a_shared_lock_is_a_deadlock() {
        let coordinator = LockCoordinator::new();
        let interrupt = Interrupt::new();
        let first_shared = coordinator
            .acquire(TABLE, SessionId(1), LockMode::Shared, LONG, &interrupt)
            .unwrap();
        let second_shared = coordinator
            .acquire(TABLE, SessionId(2), LockMode::Shared, LONG, &interrupt)
            .unwrap();

        let first_upgrade = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                coordinator
                    .acquire(TABLE, SessionId(1), LockMode::Exclusive, LONG, &Interrupt::new())
                    .map(|guard| guard.mode())
            })
        };
        wait_until_blocked(&coordinator, SessionId(1));

        let result =
            coordinator.acquire(TABLE, SessionId(2), LockMode::Exclusive, LONG, &interrupt);
        assert_eq!(
            result.unwrap_err(),
            LockError::Deadlock {
                resource: TABLE,
                session: SessionId(2)
            }
        );

        drop(second_shared);
        assert_eq!(first_upgrade.join().unwrap(), Ok(LockMode::Exclusive));
        drop(first_shared);
    }
}
