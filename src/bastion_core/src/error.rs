use std::fmt;

use thiserror::Error;

use crate::domain::{attempt::Attempt, identity::Identity, user::AccountRestriction};
use crate::ports::repositories::AttemptStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoIdentityReason {
    Missing,
    AnonymousDisallowed,
}

impl fmt::Display for NoIdentityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoIdentityReason::Missing => write!(f, "No identity presented"),
            NoIdentityReason::AnonymousDisallowed => write!(f, "Anonymous identity is not allowed"),
        }
    }
}

/// Why an authentication attempt was refused.
///
/// Every variant maps to an HTTP-style status code through
/// [`AuthenticationError::status_code`]. The code is a classification hint for
/// the host application, not a transport requirement.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("{reason}")]
    NoIdentity { reason: NoIdentityReason },
    #[error("User {username} not found")]
    UserNotFound { username: String },
    #[error("User {username} is {restriction}")]
    AccountRestricted {
        username: String,
        restriction: AccountRestriction,
    },
    #[error("Bad credential: {0}")]
    BadCredential(String),
    #[error("Wrong password for user {username}")]
    WrongPassword { username: String },
    #[error("Authentication denied by validator {validator}")]
    ValidatorDenied { validator: String },
    #[error("Login got blocked. Too many attempts occurred, please try again later")]
    FailedAttempt {
        validator: String,
        attempt: Option<Attempt>,
    },
    #[error("Session limit reached")]
    AutoLogout { validator: String },
    #[error("Attempt storage failure: {0}")]
    Storage(#[from] AttemptStoreError),
    #[error("User provider failure: {0}")]
    UserProvider(String),
}

impl AuthenticationError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthenticationError::NoIdentity {
                reason: NoIdentityReason::Missing,
            } => 401,
            AuthenticationError::NoIdentity {
                reason: NoIdentityReason::AnonymousDisallowed,
            } => 403,
            AuthenticationError::UserNotFound { .. }
            | AuthenticationError::AccountRestricted { .. }
            | AuthenticationError::WrongPassword { .. }
            | AuthenticationError::ValidatorDenied { .. }
            | AuthenticationError::AutoLogout { .. } => 401,
            AuthenticationError::BadCredential(_) | AuthenticationError::FailedAttempt { .. } => {
                403
            }
            AuthenticationError::Storage(_) | AuthenticationError::UserProvider(_) => 500,
        }
    }
}

/// An [`AuthenticationError`] annotated with the identity that caused it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct AuthenticationFailure {
    #[source]
    error: AuthenticationError,
    identity: Option<Identity>,
}

impl AuthenticationFailure {
    pub fn new(error: AuthenticationError, identity: Option<Identity>) -> Self {
        Self { error, identity }
    }

    pub fn error(&self) -> &AuthenticationError {
        &self.error
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn status_code(&self) -> u16 {
        self.error.status_code()
    }

    pub fn into_error(self) -> AuthenticationError {
        self.error
    }
}

impl From<AuthenticationError> for AuthenticationFailure {
    fn from(error: AuthenticationError) -> Self {
        Self::new(error, None)
    }
}

/// Failures outside the authentication decision itself: misconfigured
/// components and unreadable credentials on the wire.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Security configuration error: {0}")]
    Configuration(String),
    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),
    #[error("Cipher failure: {0}")]
    Cipher(String),
}

impl SecurityError {
    pub fn status_code(&self) -> u16 {
        match self {
            SecurityError::MalformedCredentials(_) => 403,
            SecurityError::Configuration(_) | SecurityError::Cipher(_) => 500,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Unsupported access decision strategy {0}")]
    UnsupportedStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reliability::Reliability;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let missing = AuthenticationError::NoIdentity {
            reason: NoIdentityReason::Missing,
        };
        let anonymous = AuthenticationError::NoIdentity {
            reason: NoIdentityReason::AnonymousDisallowed,
        };
        let blocked = AuthenticationError::FailedAttempt {
            validator: "ip".to_string(),
            attempt: None,
        };

        assert_eq!(missing.status_code(), 401);
        assert_eq!(anonymous.status_code(), 403);
        assert_eq!(blocked.status_code(), 403);
        assert_eq!(
            AuthenticationError::BadCredential("No password encoder specified".into())
                .status_code(),
            403
        );
        assert_eq!(
            AuthenticationError::AutoLogout {
                validator: "auto-logout".into()
            }
            .status_code(),
            401
        );
    }

    #[test]
    fn failure_keeps_the_identity() {
        let identity = Identity::new("admin", "12345", Reliability::HTTP);
        let failure = AuthenticationFailure::new(
            AuthenticationError::WrongPassword {
                username: "admin".into(),
            },
            Some(identity.clone()),
        );

        assert_eq!(failure.identity(), Some(&identity));
        assert_eq!(failure.status_code(), 401);
        assert_eq!(failure.to_string(), "Wrong password for user admin");
    }
}
