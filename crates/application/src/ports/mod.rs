//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod credential_repository;
mod file_system;
mod identity_client;
mod profile_api;
mod user_agent;

pub use clock::Clock;
pub use credential_repository::{CredentialRepository, StorageError};
pub use file_system::{FileSystem, FileSystemError};
pub use identity_client::{AuthorizationRequest, IdentityClient};
pub use profile_api::ProfileApi;
pub use user_agent::UserAgent;
