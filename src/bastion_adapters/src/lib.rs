pub mod challenge;
pub mod config;
pub mod encoders;
pub mod identity;
pub mod persistence;
pub mod telemetry;

pub use challenge::{BasicChallenge, Challenge, DEFAULT_REALM, DigestChallenge};
pub use config::{SecuritySettings, builders::AttemptValidators};
pub use encoders::{
    Argon2PasswordEncoder, DigestResponseEncoder, PlaintextPasswordEncoder,
};
pub use identity::{
    AnonymousIdentityProvider, BasicIdentityProvider, CookieCipher, CookieSettings,
    DigestIdentityProvider, PostFieldsIdentityProvider, RememberMeIdentityProvider,
    SessionIdentityProvider,
};
pub use persistence::{
    ChainUserProvider, InMemoryUserProvider, InitialUser, InitialUserProvider,
    MemoryAttemptStore, SqliteAttemptStore,
};
pub use telemetry::init_tracing;
