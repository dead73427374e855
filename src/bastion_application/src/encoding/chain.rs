use std::sync::Arc;

use bastion_core::{IdentityOptions, PasswordEncoder, SecurityError};

/// Accepts a password when any member encoder does.
///
/// Encoding always uses the first member.
#[derive(Debug, Default, Clone)]
pub struct PasswordEncoderChain {
    encoders: Vec<Arc<dyn PasswordEncoder>>,
}

impl PasswordEncoderChain {
    pub fn new(encoders: Vec<Arc<dyn PasswordEncoder>>) -> Self {
        Self { encoders }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        self.encoders.push(encoder);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl PasswordEncoder for PasswordEncoderChain {
    fn encode(&self, plain: &str, options: &IdentityOptions) -> Result<String, SecurityError> {
        self.encoders
            .first()
            .ok_or_else(|| SecurityError::Configuration("Encoder chain is empty".to_string()))?
            .encode(plain, options)
    }

    fn is_valid(&self, encoded: &str, plain: &str, options: &IdentityOptions) -> bool {
        self.encoders
            .iter()
            .any(|encoder| encoder.is_valid(encoded, plain, options))
    }
}
