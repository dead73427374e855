pub mod authorization;
pub mod encoding;
pub mod use_cases;
pub mod validation;

pub use authorization::{
    CallbackVoter, RoleChainVoter, RoleMatcher, RoleVoter, SingleRoleVoter, role_chain_covers,
};
pub use encoding::PasswordEncoderChain;
pub use use_cases::{
    AuthenticationService, AuthorizationService, DecisionStrategy, IdentityService,
    RequestIdentities,
};
pub use validation::{
    AutoLogoutValidator, BruteForceValidator, DEFAULT_BLOCKED_INTERVAL,
    DEFAULT_MAX_INACTIVE_INTERVAL, DEFAULT_MAX_TRIALS, HashChainGenerator,
    RemoteAddressHashGenerator, RequestUriHashGenerator, ThresholdRule, TokenHashGenerator,
};
