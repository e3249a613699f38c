pub mod interrupt;
pub mod lock;

pub use interrupt::Interrupt;
pub use lock::{LockCoordinator, LockError, LockGuard, LockMode};
