use std::fmt;

use crate::domain::identity::{Identity, IdentityOptions};
use crate::error::SecurityError;
use crate::http_abstraction::AuthRequest;

/// Transforms and compares credentials against their stored representation.
pub trait PasswordEncoder: Send + Sync + fmt::Debug {
    fn encode(&self, plain: &str, options: &IdentityOptions) -> Result<String, SecurityError>;

    /// Whether `plain` matches the stored `encoded` value.
    fn is_valid(&self, encoded: &str, plain: &str, options: &IdentityOptions) -> bool;
}

/// Derives the attempt-tracking key for an identity in a request context.
///
/// Implementations must be deterministic and free of side effects.
pub trait HashGenerator: Send + Sync + fmt::Debug {
    fn generate(&self, identity: &Identity, request: &dyn AuthRequest) -> String;
}
