use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use bastion_core::{IdentityOptions, PasswordEncoder, SecurityError};

use super::plaintext_encoder::MAX_PASSWORD_LENGTH;

/// Argon2id hashes in PHC string format.
#[derive(Debug, Clone)]
pub struct Argon2PasswordEncoder {
    params: Params,
}

impl Argon2PasswordEncoder {
    pub fn new() -> Result<Self, SecurityError> {
        let params = Params::new(15000, 2, 1, None)
            .map_err(|e| SecurityError::Configuration(e.to_string()))?;
        Ok(Self::with_params(params))
    }

    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    #[tracing::instrument(name = "Argon2PasswordEncoder::encode", skip_all)]
    fn encode(&self, plain: &str, _options: &IdentityOptions) -> Result<String, SecurityError> {
        if plain.len() > MAX_PASSWORD_LENGTH {
            return Err(SecurityError::MalformedCredentials(
                "Password is too long".to_string(),
            ));
        }
        let salt = SaltString::generate(rand_core::OsRng);
        self.hasher()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SecurityError::Cipher(e.to_string()))
    }

    fn is_valid(&self, encoded: &str, plain: &str, _options: &IdentityOptions) -> bool {
        if plain.len() > MAX_PASSWORD_LENGTH {
            return false;
        }
        let Ok(expected) = PasswordHash::new(encoded) else {
            return false;
        };
        self.hasher()
            .verify_password(plain.as_bytes(), &expected)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_its_own_hashes() {
        let encoder = Argon2PasswordEncoder::new().unwrap();
        let options = IdentityOptions::new();
        let hash = encoder.encode("12345", &options).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(encoder.is_valid(&hash, "12345", &options));
        assert!(!encoder.is_valid(&hash, "54321", &options));
    }

    #[test]
    fn salts_every_hash() {
        let encoder = Argon2PasswordEncoder::new().unwrap();
        let options = IdentityOptions::new();

        assert_ne!(
            encoder.encode("12345", &options).unwrap(),
            encoder.encode("12345", &options).unwrap()
        );
    }

    #[test]
    fn non_phc_values_never_match() {
        let encoder = Argon2PasswordEncoder::new().unwrap();
        assert!(!encoder.is_valid("12345", "12345", &IdentityOptions::new()));
    }
}
