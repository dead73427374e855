pub mod domain;
pub mod error;
pub mod http_abstraction;
pub mod ports;
pub mod strategies;

// Re-export commonly used types for convenience
pub use domain::{
    attempt::{Attempt, expiry_cutoff},
    identity::{Identity, IdentityKind, IdentityOptions, LOGGED_OUT_COOKIE_NAME, LOGGED_OUT_MARKER},
    reliability::Reliability,
    user::{
        AccountRestriction, AccountStatus, AdvancedUser, ROLE_ADMINISTRATOR, ROLE_ROOT,
        SharedUser, SimpleUser, User,
    },
};

pub use error::{
    AuthenticationError, AuthenticationFailure, AuthorizationError, NoIdentityReason,
    SecurityError,
};

pub use ports::{
    repositories::{AttemptStore, AttemptStoreError, UserProvider, UserProviderError},
    services::{HashGenerator, PasswordEncoder},
};

pub use strategies::{
    auth_validator::{
        AuthenticationValidator, PostAuthenticationValidator, PreAuthenticationValidator,
    },
    identity_provider::{ChainIdentityProvider, IdentityProvider, IdentityStream},
    voter::{Vote, Voter},
};

pub use http_abstraction::{AuthRequest, AuthResponse};

/// Cookie type used by [`AuthResponse`].
pub use cookie;

#[cfg(any(test, feature = "testing"))]
pub use http_abstraction::testing;
