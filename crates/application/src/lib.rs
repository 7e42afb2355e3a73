//! Warden Application - Session orchestration and ports
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for the identity provider, profile API,
//!   credential persistence, browser and clock)
//! - The credential store with single-flight renewal
//! - The session controller state machine

pub mod auth;
pub mod ports;
pub mod session;

#[cfg(test)]
mod test_support;

pub use auth::{CredentialStatus, CredentialStore};
pub use ports::{
    AuthorizationRequest, Clock, CredentialRepository, FileSystem, FileSystemError,
    IdentityClient, ProfileApi, StorageError, UserAgent,
};
pub use session::{SessionController, SessionSettings};
