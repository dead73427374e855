use bastion_core::AuthResponse;
use chrono::Utc;

use super::{BasicChallenge, Challenge, DEFAULT_REALM};
use crate::encoders::digest_encoder::md5_hex;

const DEFAULT_OPAQUE_SEED: &str = "bastion-default-opaque";

/// Digest challenge whose nonce rotates every hour unless set explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    basic: BasicChallenge,
    nonce: String,
    opaque: String,
}

impl Default for DigestChallenge {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl DigestChallenge {
    pub fn new(realm: impl Into<String>) -> Self {
        let hour = Utc::now().format("%Y-%m-%d %-H").to_string();
        Self {
            basic: BasicChallenge::new(realm),
            nonce: md5_hex(hour),
            opaque: md5_hex(DEFAULT_OPAQUE_SEED),
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = nonce.into();
        self
    }

    pub fn with_opaque(mut self, opaque: impl Into<String>) -> Self {
        self.opaque = opaque.into();
        self
    }

    pub fn realm(&self) -> &str {
        self.basic.realm()
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    pub fn header_value(&self) -> String {
        format!(
            "Digest realm=\"{}\",qop=\"auth\",nonce=\"{}\",opaque=\"{}\"",
            self.realm(),
            self.nonce,
            self.opaque
        )
    }
}

impl Challenge for DigestChallenge {
    fn challenge(&self, response: &mut dyn AuthResponse) {
        response.set_status(401);
        response.set_header("WWW-Authenticate", &self.header_value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::testing::MockResponse;

    #[test]
    fn defaults_derive_from_the_hour_and_a_fixed_seed() {
        let challenge = DigestChallenge::default();

        assert_eq!(challenge.realm(), DEFAULT_REALM);
        assert_eq!(challenge.nonce().len(), 32);
        assert_eq!(challenge.opaque(), md5_hex(DEFAULT_OPAQUE_SEED));
    }

    #[test]
    fn writes_the_digest_header() {
        let challenge = DigestChallenge::new("Admin")
            .with_nonce("n0nce")
            .with_opaque("0paque");
        let mut response = MockResponse::default();

        challenge.challenge(&mut response);

        assert_eq!(response.status, Some(401));
        assert_eq!(
            response.headers.get("www-authenticate").map(String::as_str),
            Some("Digest realm=\"Admin\",qop=\"auth\",nonce=\"n0nce\",opaque=\"0paque\"")
        );
    }
}
