//! Credential caching and renewal.
//!
//! This module provides:
//! - A persisted credential cache with expiry tracking
//! - Single-flight renewal shared by concurrent callers
//! - Credential status reporting for display

mod credential_store;

pub use credential_store::{CredentialStatus, CredentialStore, DEFAULT_EXPIRY_MARGIN_SECS};
