//! Sealed identity cookies shared by the session and remember-me providers.
//!
//! The cookie value is `base64(token:seal(credentials):reliability:base64(json(options)))`.
//! Credentials are sealed with AES-256-GCM under `SHA-256(secret)`, a random
//! nonce per cookie and the provider key as associated data.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use bastion_core::cookie::Cookie;
use bastion_core::{
    AuthResponse, Identity, IdentityKind, IdentityOptions, Reliability, SecurityError,
};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;
const DELIMITER: char = ':';

/// Authenticated encryption of credential strings.
pub struct CookieCipher {
    cipher: Aes256Gcm,
    provider_key: String,
}

impl fmt::Debug for CookieCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCipher")
            .field("provider_key", &self.provider_key)
            .finish_non_exhaustive()
    }
}

impl CookieCipher {
    pub fn new(provider_key: impl Into<String>, secret: &Secret<String>) -> Result<Self, SecurityError> {
        let provider_key = provider_key.into();
        if provider_key.is_empty() {
            return Err(SecurityError::Configuration(
                "Provider key must not be empty".to_string(),
            ));
        }
        if secret.expose_secret().is_empty() {
            return Err(SecurityError::Configuration(
                "Cookie secret must not be empty".to_string(),
            ));
        }

        let key = Sha256::digest(secret.expose_secret().as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecurityError::Configuration(format!("Failed to create cipher: {e}")))?;
        Ok(Self {
            cipher,
            provider_key,
        })
    }

    pub fn provider_key(&self) -> &str {
        &self.provider_key
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, SecurityError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let payload = Payload {
            msg: plaintext.as_bytes(),
            aad: self.provider_key.as_bytes(),
        };
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), payload)
            .map_err(|e| SecurityError::Cipher(format!("Encryption failed: {e}")))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub fn open(&self, sealed: &str) -> Result<String, SecurityError> {
        let malformed = |reason: &str| SecurityError::MalformedCredentials(reason.to_string());

        let sealed = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| malformed("Sealed credentials are not valid base64"))?;
        if sealed.len() < NONCE_LEN {
            return Err(malformed("Sealed credentials are too short"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let payload = Payload {
            msg: ciphertext,
            aad: self.provider_key.as_bytes(),
        };
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| malformed("Sealed credentials could not be decrypted"))?;
        String::from_utf8(plaintext).map_err(|_| malformed("Sealed credentials are not UTF-8"))
    }
}

/// Attributes of the cookie a provider writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    pub(crate) fn build(&self, value: String, max_age: Option<time::Duration>) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = max_age {
            builder = builder.max_age(max_age);
        }
        builder.build()
    }

    pub(crate) fn remove(&self, response: &mut dyn AuthResponse) {
        let mut removal = self.build(String::new(), None);
        removal.make_removal();
        response.set_cookie(removal);
    }
}

/// Encodes identities into sealed cookie values and back.
#[derive(Debug)]
pub(crate) struct SealedIdentityCodec {
    cipher: CookieCipher,
    kind: IdentityKind,
    ceiling: Reliability,
}

impl SealedIdentityCodec {
    pub(crate) fn new(cipher: CookieCipher, kind: IdentityKind, ceiling: Reliability) -> Self {
        Self {
            cipher,
            kind,
            ceiling,
        }
    }

    pub(crate) fn cipher(&self) -> &CookieCipher {
        &self.cipher
    }

    pub(crate) fn encode(&self, identity: &Identity) -> Result<String, SecurityError> {
        if identity.token().contains(DELIMITER) {
            return Err(SecurityError::MalformedCredentials(format!(
                "Identity token must not contain the cookie delimiter \"{DELIMITER}\""
            )));
        }
        let sealed = self.cipher.seal(identity.credentials().expose_secret())?;
        let options = serde_json::to_vec(identity.options())
            .map_err(|e| SecurityError::Cipher(e.to_string()))?;

        let value = format!(
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            identity.token(),
            sealed,
            identity.reliability().value(),
            STANDARD.encode(options)
        );
        Ok(STANDARD.encode(value))
    }

    /// `None` for values without token or credentials, an error for tampered ones.
    pub(crate) fn decode(&self, raw: &str) -> Option<Result<Identity, SecurityError>> {
        let malformed = || {
            SecurityError::MalformedCredentials(
                "Identity cookie is not provided in correct manner".to_string(),
            )
        };

        let decoded = match STANDARD.decode(raw).map(String::from_utf8) {
            Ok(Ok(decoded)) => decoded,
            _ => return Some(Err(malformed())),
        };
        let mut parts = decoded.splitn(4, DELIMITER);
        let token = parts.next().filter(|token| !token.is_empty())?;
        let sealed = parts.next().filter(|sealed| !sealed.is_empty())?;

        let credentials = match self.cipher.open(sealed) {
            Ok(credentials) => credentials,
            Err(error) => return Some(Err(error)),
        };
        let reliability = parts
            .next()
            .and_then(|value| value.parse::<Reliability>().ok())
            .unwrap_or(Reliability::MINIMUM)
            .clamp_to(self.ceiling);
        let options: IdentityOptions = parts
            .next()
            .and_then(|encoded| STANDARD.decode(encoded).ok())
            .and_then(|json| serde_json::from_slice(&json).ok())
            .unwrap_or_default();

        Some(Ok(Identity::new(token, credentials, reliability)
            .with_kind(self.kind.clone())
            .with_options(options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(provider_key: &str) -> CookieCipher {
        CookieCipher::new(provider_key, &Secret::new("s3cr3t".to_string())).unwrap()
    }

    fn codec() -> SealedIdentityCodec {
        SealedIdentityCodec::new(cipher("main"), IdentityKind::Session, Reliability::SESSION)
    }

    #[test]
    fn empty_secret_or_key_is_a_configuration_error() {
        let empty = Secret::new(String::new());
        assert!(matches!(
            CookieCipher::new("main", &empty),
            Err(SecurityError::Configuration(_))
        ));
        assert!(matches!(
            CookieCipher::new("", &Secret::new("x".to_string())),
            Err(SecurityError::Configuration(_))
        ));
    }

    #[test]
    fn sealing_is_randomised_and_reversible() {
        let cipher = cipher("main");
        let first = cipher.seal("12345").unwrap();
        let second = cipher.seal("12345").unwrap();

        assert_ne!(first, second);
        assert_eq!(cipher.open(&first).unwrap(), "12345");
        assert!(!first.contains(DELIMITER));
    }

    #[test]
    fn provider_key_is_bound_to_the_ciphertext() {
        let sealed = cipher("main").seal("12345").unwrap();

        assert!(matches!(
            cipher("other").open(&sealed),
            Err(SecurityError::MalformedCredentials(_))
        ));
    }

    #[test]
    fn identity_round_trip_keeps_options_and_clamps_reliability() {
        let codec = codec();
        let identity = Identity::new("admin", "12345", Reliability::HTML_FORM)
            .with_option("theme", "dark");

        let decoded = codec.decode(&codec.encode(&identity).unwrap()).unwrap().unwrap();
        assert_eq!(decoded.token(), "admin");
        assert_eq!(decoded.credentials().expose_secret(), "12345");
        assert_eq!(decoded.reliability(), Reliability::SESSION);
        assert_eq!(decoded.option("theme"), Some("dark"));
        assert_eq!(decoded.kind(), &IdentityKind::Session);
    }

    #[test]
    fn lower_reliability_is_never_raised() {
        let codec = codec();
        let identity = Identity::new("admin", "12345", Reliability::HTTP);

        let decoded = codec.decode(&codec.encode(&identity).unwrap()).unwrap().unwrap();
        assert_eq!(decoded.reliability(), Reliability::HTTP);
    }

    #[test]
    fn tokens_with_the_delimiter_cannot_be_encoded() {
        let identity = Identity::new("ad:min", "12345", Reliability::HTTP);
        assert!(matches!(
            codec().encode(&identity),
            Err(SecurityError::MalformedCredentials(_))
        ));
    }

    #[test]
    fn tampered_values_are_rejected() {
        let codec = codec();
        let forged = STANDARD.encode("admin:bm90LXNlYWxlZA:500:");

        assert!(matches!(codec.decode(&forged), Some(Err(_))));
        assert!(matches!(codec.decode("%%%"), Some(Err(_))));
        assert!(codec.decode(&STANDARD.encode(":x:1:")).is_none());
    }
}
