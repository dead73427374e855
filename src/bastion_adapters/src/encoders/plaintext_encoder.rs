use bastion_core::{IdentityOptions, PasswordEncoder, SecurityError};
use subtle::ConstantTimeEq;

pub const MAX_PASSWORD_LENGTH: usize = 4096;

/// Identity option overriding the encoder's case handling for one comparison.
pub const IGNORE_PASSWORD_CASE_OPTION: &str = "ignore_password_case";

/// Stores passwords as they are, comparing in constant time.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextPasswordEncoder {
    ignore_password_case: bool,
}

impl PlaintextPasswordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_case(mut self, ignore: bool) -> Self {
        self.ignore_password_case = ignore;
        self
    }

    fn ignores_case(&self, options: &IdentityOptions) -> bool {
        options
            .get(IGNORE_PASSWORD_CASE_OPTION)
            .map(|value| matches!(value.as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(self.ignore_password_case)
    }
}

pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl PasswordEncoder for PlaintextPasswordEncoder {
    fn encode(&self, plain: &str, _options: &IdentityOptions) -> Result<String, SecurityError> {
        if plain.len() > MAX_PASSWORD_LENGTH {
            return Err(SecurityError::MalformedCredentials(
                "Password is too long".to_string(),
            ));
        }
        Ok(plain.to_string())
    }

    fn is_valid(&self, encoded: &str, plain: &str, options: &IdentityOptions) -> bool {
        if plain.len() > MAX_PASSWORD_LENGTH {
            return false;
        }
        if self.ignores_case(options) {
            constant_time_eq(&encoded.to_lowercase(), &plain.to_lowercase())
        } else {
            constant_time_eq(encoded, plain)
        }
    }
}
