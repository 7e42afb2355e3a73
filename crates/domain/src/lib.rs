//! Warden Domain - Core session types
//!
//! This crate defines the domain model for the Warden session manager.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod profile;
pub mod state;

pub use auth::{AuthError, AuthResult, Credentials, DEFAULT_SCOPE, IdentityConfig, Scope};
pub use error::{DomainError, DomainResult};
pub use profile::{Metadata, MetadataPatch, ProfileFidelity, UserProfile};
pub use state::{Session, SessionSnapshot, SessionState};
