//! Proof-key material for the authorization-code flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Verifier, challenge and state for one authorization attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    /// Secret sent with the code exchange.
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent with the authorization request.
    pub challenge: String,
    /// Anti-forgery value echoed back on the redirect.
    pub state: String,
}

impl PkcePair {
    /// Generates fresh random material.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = random_urlsafe::<48>();
        Self {
            challenge: challenge_for(&verifier),
            verifier,
            state: random_urlsafe::<16>(),
        }
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .field("state", &self.state)
            .finish()
    }
}

/// Computes the S256 code challenge for a verifier.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_urlsafe<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn is_urlsafe(value: &str) -> bool {
        value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_generated_lengths() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), 64);
        assert_eq!(pair.challenge.len(), 43);
        assert_eq!(pair.state.len(), 22);
        assert!(is_urlsafe(&pair.verifier));
        assert!(is_urlsafe(&pair.state));
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let pair = PkcePair::generate();
        assert_eq!(pair.challenge, challenge_for(&pair.verifier));
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pairs_are_unique() {
        let first = PkcePair::generate();
        let second = PkcePair::generate();
        assert_ne!(first.verifier, second.verifier);
        assert_ne!(first.state, second.state);
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let pair = PkcePair::generate();
        assert!(!format!("{pair:?}").contains(&pair.verifier));
    }
}
