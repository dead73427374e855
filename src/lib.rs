//! # Bastion
//!
//! Pluggable authentication and authorization for HTTP services. This facade
//! re-exports the member crates so hosts depend on a single package.
//!
//! ## Structure
//!
//! - **Core domain types**: `Identity`, `Reliability`, `User`, `Attempt`, errors
//! - **Ports and strategies**: `UserProvider`, `AttemptStore`, `IdentityProvider`, `Voter`
//! - **Use cases**: `AuthenticationService`, `AuthorizationService`, `IdentityService`
//! - **Adapters**: identity providers, user providers, attempt stores, encoders, settings
//! - **Axum**: `AxumRequest`, `AxumResponse`, `AuthRejection`
//! - **Security**: the assembled entry point

mod security;

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and traits
pub mod core {
    pub use bastion_core::*;
}

pub use bastion_core::{
    AccountRestriction, AccountStatus, AdvancedUser, Attempt, AuthRequest, AuthResponse,
    AuthenticationError, AuthenticationFailure, AuthorizationError, Identity, IdentityKind,
    IdentityOptions, NoIdentityReason, ROLE_ADMINISTRATOR, ROLE_ROOT, Reliability, SecurityError,
    SharedUser, SimpleUser, User,
};

// ============================================================================
// Ports and Strategies
// ============================================================================

pub use bastion_core::{
    AttemptStore, AttemptStoreError, AuthenticationValidator, ChainIdentityProvider,
    HashGenerator, IdentityProvider, IdentityStream, PasswordEncoder, PostAuthenticationValidator,
    PreAuthenticationValidator, UserProvider, UserProviderError, Vote, Voter,
};

// ============================================================================
// Use Cases (Application Layer)
// ============================================================================

/// Application services, validators and voters
pub mod use_cases {
    pub use bastion_application::*;
}

pub use bastion_application::{
    AuthenticationService, AuthorizationService, AutoLogoutValidator, BruteForceValidator,
    CallbackVoter, DecisionStrategy, IdentityService, PasswordEncoderChain, RoleChainVoter,
    RoleVoter, SingleRoleVoter,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    pub use bastion_adapters::{challenge, config, encoders, identity, persistence, telemetry};
}

pub use bastion_adapters::{
    AnonymousIdentityProvider, Argon2PasswordEncoder, BasicChallenge, BasicIdentityProvider,
    ChainUserProvider, Challenge, CookieCipher, DigestChallenge, DigestIdentityProvider,
    DigestResponseEncoder, InMemoryUserProvider, InitialUserProvider, MemoryAttemptStore,
    PlaintextPasswordEncoder, PostFieldsIdentityProvider, RememberMeIdentityProvider,
    SecuritySettings, SessionIdentityProvider, SqliteAttemptStore, init_tracing,
};

// ============================================================================
// Axum Integration
// ============================================================================

pub use bastion_axum::{AuthRejection, AxumRequest, AxumResponse};

// ============================================================================
// Security (Main Entry Point)
// ============================================================================

pub use security::Security;

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing the port traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};

pub use http;
