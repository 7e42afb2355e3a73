//! File-based persistence adapters.

mod credential_repository;
mod file_system;

pub use credential_repository::{CREDENTIALS_SCHEMA_VERSION, FileCredentialRepository};
pub use file_system::TokioFileSystem;
