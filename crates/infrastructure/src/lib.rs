//! Warden Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod auth;
pub mod persistence;
pub mod serialization;

pub use adapters::{ManagementApiClient, SystemClock};
pub use auth::{HttpIdentityClient, Launcher, LoopbackUserAgent, PkcePair, print_launcher};
pub use persistence::{CREDENTIALS_SCHEMA_VERSION, FileCredentialRepository, TokioFileSystem};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
