use std::path::{Path, PathBuf};
use std::sync::Arc;

use bastion_core::{AccountStatus, AdvancedUser, SecurityError, SharedUser, SimpleUser};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::{DEFAULT_CONFIG_FILE, ENV_PREFIX, ENV_SEPARATOR};
use crate::challenge::DEFAULT_REALM;
use crate::identity::{
    ANONYMOUS_COOKIE_NAME, DEFAULT_REMEMBER_ME_FIELD, DEFAULT_REMEMBER_ME_LIFETIME,
    REMEMBER_ME_COOKIE_NAME, SESSION_COOKIE_NAME,
};
use crate::identity::post_fields_provider::{DEFAULT_CREDENTIALS_FIELD, DEFAULT_TOKEN_FIELD};

/// Everything a host needs to assemble the security layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub attempts: AttemptSettings,
    pub http: HttpAuthSettings,
    /// Shared secret of the session and remember-me cookies. Both providers
    /// are left out of the chain while it is unset.
    pub cookie_secret: Option<Secret<String>>,
    pub session: SessionSettings,
    pub remember_me: RememberMeSettings,
    pub post_fields: PostFieldSettings,
    pub anonymous: AnonymousSettings,
    pub encoder: EncoderSettings,
    pub users: Vec<UserRecord>,
    pub initial_user: Option<InitialUserRecord>,
    pub authorization: AuthorizationSettings,
}

impl SecuritySettings {
    /// Reads `.env`, then `config/security.*` if present, then `BASTION__*` variables.
    pub fn load() -> Result<Self, SecurityError> {
        dotenvy::dotenv().ok();
        Self::from_builder(Self::base_sources())
    }

    /// Like [`SecuritySettings::load`], with a required file layered over the default one.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SecurityError> {
        dotenvy::dotenv().ok();
        let builder = Self::base_sources().add_source(File::from(path.as_ref()).required(true));
        Self::from_builder(builder)
    }

    /// Settings from a JSON document alone, ignoring files and environment.
    pub fn from_json(json: &str) -> Result<Self, SecurityError> {
        Self::deserialize_config(
            Config::builder()
                .add_source(File::from_str(json, FileFormat::Json))
                .build(),
        )
    }

    fn base_sources() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SecurityError> {
        Self::deserialize_config(
            builder
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .separator(ENV_SEPARATOR)
                        .try_parsing(true),
                )
                .build(),
        )
    }

    fn deserialize_config(config: Result<Config, config::ConfigError>) -> Result<Self, SecurityError> {
        config
            .and_then(|config| config.try_deserialize())
            .map_err(|e| SecurityError::Configuration(format!("Failed to load settings: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub max_trials: u32,
    pub blocked_seconds: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_trials: 3,
            blocked_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutoLogoutSettings {
    pub enabled: bool,
    pub max_inactive_seconds: u64,
}

impl Default for AutoLogoutSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_inactive_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttemptSettings {
    pub database_path: PathBuf,
    pub ip_table: String,
    pub uri_table: String,
    pub auto_logout_table: String,
    pub by_ip: ThrottleSettings,
    pub by_uri: ThrottleSettings,
    pub auto_logout: AutoLogoutSettings,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("bastion_attempts.sqlite"),
            ip_table: "ATTEMPT".to_string(),
            uri_table: "URI_ATTEMPT".to_string(),
            auto_logout_table: "AL_ATTEMPT".to_string(),
            by_ip: ThrottleSettings::default(),
            by_uri: ThrottleSettings::default(),
            auto_logout: AutoLogoutSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpAuthSettings {
    pub realm: String,
    pub basic: bool,
    pub digest: bool,
    /// Stored credentials are plain passwords unless this is set, in which
    /// case they already hold `md5(username:realm:password)`.
    pub digest_credentials_are_ha1: bool,
}

impl Default for HttpAuthSettings {
    fn default() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            basic: true,
            digest: false,
            digest_credentials_are_ha1: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub provider_key: String,
    pub cookie_name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            provider_key: "session".to_string(),
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RememberMeSettings {
    pub enabled: bool,
    pub provider_key: String,
    pub cookie_name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub lifetime_seconds: u64,
    pub opt_in_field: String,
}

impl Default for RememberMeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider_key: "remember_me".to_string(),
            cookie_name: REMEMBER_ME_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            lifetime_seconds: DEFAULT_REMEMBER_ME_LIFETIME.as_secs(),
            opt_in_field: DEFAULT_REMEMBER_ME_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostFieldSettings {
    pub enabled: bool,
    pub username_field: String,
    pub password_field: String,
}

impl Default for PostFieldSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            username_field: DEFAULT_TOKEN_FIELD.to_string(),
            password_field: DEFAULT_CREDENTIALS_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnonymousSettings {
    pub enabled: bool,
    pub cookie_name: String,
    /// Name of the user anonymous identities resolve to. Anonymous
    /// identities are refused when unset.
    pub username: Option<String>,
}

impl Default for AnonymousSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: ANONYMOUS_COOKIE_NAME.to_string(),
            username: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordEncoderKind {
    #[default]
    Plaintext,
    Argon2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub kind: PasswordEncoderKind,
    pub ignore_password_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfiguredVoter {
    /// Every required role must be owned.
    Role,
    /// One owned role out of the required ones suffices.
    AnyRole,
    RoleChain,
    Administrator,
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    pub strategy: String,
    pub allow_if_all_abstain: bool,
    pub allow_if_equal_granted_denied: bool,
    pub voters: Vec<ConfiguredVoter>,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            strategy: "affirmative".to_string(),
            allow_if_all_abstain: false,
            allow_if_equal_granted_denied: true,
            voters: vec![ConfiguredVoter::Role],
        }
    }
}

/// A user declared in the settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub credentials: Secret<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Account status flag names, e.g. `BLOCKED`.
    #[serde(default)]
    pub status: Vec<String>,
}

impl UserRecord {
    pub fn to_user(&self) -> Result<SharedUser, SecurityError> {
        if self.username.is_empty() {
            return Err(SecurityError::Configuration(
                "Configured user without username".to_string(),
            ));
        }
        if self.credentials.expose_secret().is_empty() {
            return Err(SecurityError::Configuration(format!(
                "Configured user {} without credentials",
                self.username
            )));
        }

        let mut status = AccountStatus::NONE;
        for name in &self.status {
            let flag = AccountStatus::from_name(name).ok_or_else(|| {
                SecurityError::Configuration(format!(
                    "Unknown account status {name} for user {}",
                    self.username
                ))
            })?;
            status.insert(flag);
        }

        let user = SimpleUser::new(
            self.username.clone(),
            self.credentials.expose_secret().clone(),
            self.roles.iter().cloned(),
        );
        Ok(Arc::new(AdvancedUser::new(user, status)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitialUserRecord {
    pub username: String,
    pub password: Secret<String>,
    /// Defaults to the root role.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = SecuritySettings::from_json("{}").unwrap();

        assert_eq!(settings.attempts.ip_table, "ATTEMPT");
        assert_eq!(settings.attempts.uri_table, "URI_ATTEMPT");
        assert_eq!(settings.attempts.auto_logout_table, "AL_ATTEMPT");
        assert_eq!(settings.attempts.by_ip.max_trials, 3);
        assert_eq!(settings.attempts.by_uri.blocked_seconds, 900);
        assert_eq!(settings.attempts.auto_logout.max_inactive_seconds, 900);
        assert_eq!(settings.remember_me.lifetime_seconds, 8_640_000);
        assert_eq!(settings.remember_me.opt_in_field, "remember_me");
        assert_eq!(settings.post_fields.username_field, "username");
        assert_eq!(settings.post_fields.password_field, "password");
        assert_eq!(settings.http.realm, DEFAULT_REALM);
        assert_eq!(settings.authorization.strategy, "affirmative");
        assert!(settings.authorization.allow_if_equal_granted_denied);
        assert!(!settings.authorization.allow_if_all_abstain);
        assert!(settings.cookie_secret.is_none());
        assert!(settings.users.is_empty());
    }

    #[test]
    fn nested_sections_keep_unset_defaults() {
        let settings = SecuritySettings::from_json(
            r#"{
                "cookie_secret": "s3cr3t",
                "attempts": { "by_ip": { "max_trials": 5 } },
                "remember_me": { "cookie_name": "keep" },
                "encoder": { "kind": "argon2" },
                "authorization": { "strategy": "unanimous", "voters": ["role_chain", "root"] }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.attempts.by_ip.max_trials, 5);
        assert_eq!(settings.attempts.by_ip.blocked_seconds, 900);
        assert_eq!(settings.remember_me.cookie_name, "keep");
        assert_eq!(settings.remember_me.provider_key, "remember_me");
        assert_eq!(settings.encoder.kind, PasswordEncoderKind::Argon2);
        assert_eq!(
            settings.authorization.voters,
            vec![ConfiguredVoter::RoleChain, ConfiguredVoter::Root]
        );
        assert_eq!(settings.cookie_secret.unwrap().expose_secret(), "s3cr3t");
    }

    #[test]
    fn malformed_document_is_a_configuration_error() {
        assert!(matches!(
            SecuritySettings::from_json(r#"{ "users": "admin" }"#),
            Err(SecurityError::Configuration(_))
        ));
    }

    #[test]
    fn user_records_become_advanced_users() {
        let record = UserRecord {
            username: "editor".to_string(),
            credentials: Secret::new("secret".to_string()),
            roles: vec!["EDITOR".to_string()],
            status: vec!["hidden".to_string(), "INTERNAL".to_string()],
        };

        let user = record.to_user().unwrap();
        assert_eq!(user.username(), "editor");
        assert_eq!(user.roles(), ["EDITOR".to_string()]);
        let status = user.account_status().unwrap();
        assert!(status.contains(AccountStatus::HIDDEN));
        assert!(status.contains(AccountStatus::INTERNAL));
    }

    #[test]
    fn incomplete_or_unknown_records_are_rejected() {
        let record = |username: &str, credentials: &str, status: &[&str]| UserRecord {
            username: username.to_string(),
            credentials: Secret::new(credentials.to_string()),
            roles: Vec::new(),
            status: status.iter().map(|s| s.to_string()).collect(),
        };

        for invalid in [
            record("", "secret", &[]),
            record("editor", "", &[]),
            record("editor", "secret", &["SUSPENDED"]),
        ] {
            assert!(matches!(
                invalid.to_user(),
                Err(SecurityError::Configuration(_))
            ));
        }
    }
}
