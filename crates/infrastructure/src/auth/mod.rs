//! Identity provider adapters.
//!
//! This module provides:
//! - The HTTP identity client (authorization code + PKCE, refresh, logout)
//! - PKCE material generation
//! - A loopback user agent receiving the browser redirect

mod identity_client;
mod loopback;
mod pkce;

pub use identity_client::{HttpIdentityClient, parse_callback};
pub use loopback::{Launcher, LoopbackUserAgent, print_launcher};
pub use pkce::{PkcePair, challenge_for};
