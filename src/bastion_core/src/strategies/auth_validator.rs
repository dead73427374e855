use async_trait::async_trait;

use crate::domain::{identity::Identity, user::SharedUser};
use crate::error::AuthenticationError;
use crate::http_abstraction::AuthRequest;

/// Common surface of authentication hooks.
///
/// The name identifies the validator in denials and is the key used to
/// replace or remove it from a service.
pub trait AuthenticationValidator: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Hook run before the user is resolved.
///
/// `Ok(false)` is a plain denial. A richer denial (for example a brute-force
/// block carrying the attempt) is returned as `Err`.
#[async_trait]
pub trait PreAuthenticationValidator: AuthenticationValidator {
    async fn grant_before_authentication(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError>;
}

/// Hook run after user resolution and credential verification, whatever their outcome.
///
/// `user` is `Some` only when authentication succeeded.
#[async_trait]
pub trait PostAuthenticationValidator: AuthenticationValidator {
    async fn grant_after_authentication(
        &self,
        identity: &Identity,
        user: Option<&SharedUser>,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError>;
}
