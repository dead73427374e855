use bastion_core::{IdentityOptions, PasswordEncoder, SecurityError};
use md5::{Digest, Md5};

use super::plaintext_encoder::constant_time_eq;

pub(crate) fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}

/// Verifies RFC 2617 `qop=auth` digest responses.
///
/// The identity carries the client's response as its credentials and the
/// remaining digest parameters plus the request `method` as options. The
/// stored user credentials are the HA1 hash unless plain passwords are
/// configured.
#[derive(Debug, Clone)]
pub struct DigestResponseEncoder {
    realm: String,
    username: String,
    plain_user_credentials: bool,
}

impl DigestResponseEncoder {
    pub fn new(realm: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            username: username.into(),
            plain_user_credentials: false,
        }
    }

    /// Treats stored credentials as plain passwords instead of HA1 hashes.
    pub fn with_plain_user_credentials(mut self, plain: bool) -> Self {
        self.plain_user_credentials = plain;
        self
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn ha1(&self, password: &str) -> String {
        md5_hex(format!("{}:{}:{}", self.username, self.realm, password))
    }

    fn expected_response(
        &self,
        stored: &str,
        options: &IdentityOptions,
    ) -> Result<String, SecurityError> {
        let param = |name: &str| {
            options.get(name).map(String::as_str).ok_or_else(|| {
                SecurityError::MalformedCredentials(format!("Digest parameter {name} is missing"))
            })
        };

        let ha1 = if self.plain_user_credentials {
            self.ha1(stored)
        } else {
            stored.to_string()
        };
        let ha2 = md5_hex(format!("{}:{}", param("method")?, param("uri")?));

        Ok(md5_hex(format!(
            "{}:{}:{}:{}:{}:{}",
            ha1,
            param("nonce")?,
            param("nc")?,
            param("cnonce")?,
            param("qop")?,
            ha2
        )))
    }
}

impl PasswordEncoder for DigestResponseEncoder {
    /// Computes the response a client knowing `plain` would send.
    fn encode(&self, plain: &str, options: &IdentityOptions) -> Result<String, SecurityError> {
        self.expected_response(plain, options)
    }

    fn is_valid(&self, encoded: &str, plain: &str, options: &IdentityOptions) -> bool {
        match self.expected_response(encoded, options) {
            Ok(expected) => constant_time_eq(&expected, plain),
            Err(error) => {
                tracing::debug!(%error, "Digest response could not be verified");
                false
            }
        }
    }
}
