use crate::AuthError;
use bcrypt::{hash, verify};

pub use bcrypt::DEFAULT_COST;

/// A bcrypt hash of a user's password. The clear text is never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: &str, cost: u32) -> Result<Self, AuthError> {
        Ok(Self(hash(password, cost)?))
    }

    /// Malformed hashes never match.
    pub fn matches(&self, password: &str) -> bool {
        verify(password, &self.0).unwrap_or(false)
    }
}
