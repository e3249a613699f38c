//! Principals and the rights they hold over catalog objects.

pub mod password;
pub mod right;
pub mod user;

pub use right::{AuthorizationGate, Right};
pub use user::{User, UserRef};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not enough rights for object \"{object}\": {user} lacks {right}")]
    PermissionDenied {
        user: String,
        object: String,
        right: Right,
    },
    #[error("Admin rights are required, \"{0}\" is not an admin")]
    AdminRequired(String),
    #[error("Wrong user name or password")]
    WrongCredentials,
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}
