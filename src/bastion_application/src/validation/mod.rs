pub mod attempt_validator;
pub mod hash_generator;

pub use attempt_validator::{
    AutoLogoutValidator, BruteForceValidator, DEFAULT_BLOCKED_INTERVAL,
    DEFAULT_MAX_INACTIVE_INTERVAL, DEFAULT_MAX_TRIALS, ThresholdRule,
};
pub use hash_generator::{
    HashChainGenerator, RemoteAddressHashGenerator, RequestUriHashGenerator, TokenHashGenerator,
};
