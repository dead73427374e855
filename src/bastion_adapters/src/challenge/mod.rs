//! `WWW-Authenticate` challenges sent when a protected resource needs credentials.

pub mod basic_challenge;
pub mod digest_challenge;

pub use basic_challenge::BasicChallenge;
pub use digest_challenge::DigestChallenge;

use bastion_core::AuthResponse;

pub const DEFAULT_REALM: &str = "Bastion Protected Area";

/// Asks the client to authenticate.
pub trait Challenge: Send + Sync {
    fn challenge(&self, response: &mut dyn AuthResponse);
}
