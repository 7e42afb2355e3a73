//! Authentication domain types

mod config;
mod error;
mod scope;
mod types;

pub use config::{DEFAULT_SCOPE, IdentityConfig};
pub use error::{AuthError, AuthResult};
pub use scope::Scope;
pub use types::Credentials;
