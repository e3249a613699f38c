use auth::UserRef;
use common::SessionId;
use concurrency::Interrupt;
use getset::{CopyGetters, Getters};
use std::time::Duration;

/// A connected user. Statements run synchronously on the caller's thread.
#[derive(Debug, Getters, CopyGetters)]
pub struct Session {
    #[getset(get_copy = "pub")]
    id: SessionId,
    #[getset(get = "pub")]
    user: UserRef,
    /// How long a statement waits for a table lock before giving up.
    #[getset(get_copy = "pub")]
    lock_timeout: Duration,
    #[getset(get = "pub")]
    interrupt: Interrupt,
}

impl Session {
    pub fn new(id: SessionId, user: UserRef, lock_timeout: Duration) -> Self {
        Self {
            id,
            user,
            lock_timeout,
            interrupt: Interrupt::new(),
        }
    }

    /// Cancels the statement currently running: its current or next lock
    /// wait fails with an interrupt. A statement started afterwards runs
    /// normally. Safe to call from any thread.
    pub fn cancel(&self) {
        self.interrupt.raise();
    }

    /// Forgets a cancellation aimed at an earlier statement.
    pub fn start_statement(&self) {
        self.interrupt.clear();
    }
}
