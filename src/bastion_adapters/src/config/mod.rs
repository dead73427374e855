pub mod builders;
pub mod settings;

pub use settings::{
    AnonymousSettings, AttemptSettings, AuthorizationSettings, AutoLogoutSettings,
    ConfiguredVoter, EncoderSettings, HttpAuthSettings, InitialUserRecord, PasswordEncoderKind,
    PostFieldSettings, RememberMeSettings, SecuritySettings, SessionSettings, ThrottleSettings,
    UserRecord,
};

/// Optional settings file, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config/security";

/// Environment variables are read as `BASTION__SECTION__KEY`.
pub const ENV_PREFIX: &str = "BASTION";
pub const ENV_SEPARATOR: &str = "__";
