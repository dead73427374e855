//! Turns [`SecuritySettings`] into the runtime objects.

use std::sync::Arc;
use std::time::Duration;

use bastion_application::{
    AuthenticationService, AuthorizationService, AutoLogoutValidator, BruteForceValidator,
    DecisionStrategy, RoleChainVoter, RoleVoter, SingleRoleVoter,
};
use bastion_core::{
    ChainIdentityProvider, PasswordEncoder, SecurityError, SharedUser, SimpleUser, UserProvider,
    Voter,
};
use secrecy::{ExposeSecret, Secret};

use super::settings::{ConfiguredVoter, PasswordEncoderKind, SecuritySettings};
use crate::challenge::{BasicChallenge, Challenge, DigestChallenge};
use crate::encoders::{Argon2PasswordEncoder, PlaintextPasswordEncoder};
use crate::identity::{
    AnonymousIdentityProvider, BasicIdentityProvider, CookieCipher, CookieSettings,
    DigestIdentityProvider, PostFieldsIdentityProvider, RememberMeIdentityProvider,
    SessionIdentityProvider,
};
use crate::persistence::{
    ChainUserProvider, InMemoryUserProvider, InitialUserProvider, SqliteAttemptStore,
};

/// Attempt validators opened from the settings, `None` where disabled.
#[derive(Default)]
pub struct AttemptValidators {
    pub by_ip: Option<Arc<BruteForceValidator>>,
    pub by_uri: Option<Arc<BruteForceValidator>>,
    pub auto_logout: Option<Arc<AutoLogoutValidator>>,
}

impl AttemptValidators {
    pub fn register(&self, service: &mut AuthenticationService) {
        if let Some(validator) = &self.by_ip {
            service.add_validator(validator.clone());
        }
        if let Some(validator) = &self.by_uri {
            service.add_validator(validator.clone());
        }
        if let Some(validator) = &self.auto_logout {
            service.add_validator(validator.clone());
        }
    }
}

impl SecuritySettings {
    fn cookie_cipher(&self, provider_key: &str) -> Result<Option<CookieCipher>, SecurityError> {
        match &self.cookie_secret {
            Some(secret) => CookieCipher::new(provider_key, secret).map(Some),
            None => Ok(None),
        }
    }

    pub fn digest_challenge(&self) -> DigestChallenge {
        DigestChallenge::new(self.http.realm.clone())
    }

    /// The challenge sent to clients without identity, `None` when HTTP auth is off.
    pub fn challenge(&self, digest: &DigestChallenge) -> Option<Arc<dyn Challenge>> {
        if self.http.digest {
            Some(Arc::new(digest.clone()))
        } else if self.http.basic {
            Some(Arc::new(BasicChallenge::new(self.http.realm.clone())))
        } else {
            None
        }
    }

    /// Providers in the order session, remember-me, POST fields, Digest, Basic, anonymous.
    pub fn identity_provider(&self) -> Result<ChainIdentityProvider, SecurityError> {
        self.identity_provider_for(&self.digest_challenge())
    }

    /// Like [`identity_provider`](Self::identity_provider), expecting answers to `digest`.
    pub fn identity_provider_for(
        &self,
        digest: &DigestChallenge,
    ) -> Result<ChainIdentityProvider, SecurityError> {
        let mut chain = ChainIdentityProvider::default();

        if let Some(cipher) = self.cookie_cipher(&self.session.provider_key)? {
            let session = &self.session;
            let cookie = CookieSettings {
                name: session.cookie_name.clone(),
                path: session.path.clone(),
                domain: session.domain.clone(),
                secure: session.secure,
                http_only: session.http_only,
            };
            chain.add_provider(Arc::new(SessionIdentityProvider::new(cipher).with_cookie(cookie)));
        } else {
            tracing::warn!("No cookie secret configured, session and remember-me cookies are disabled");
        }

        if self.remember_me.enabled {
            if let Some(cipher) = self.cookie_cipher(&self.remember_me.provider_key)? {
                let remember_me = &self.remember_me;
                let cookie = CookieSettings {
                    name: remember_me.cookie_name.clone(),
                    path: remember_me.path.clone(),
                    domain: remember_me.domain.clone(),
                    secure: remember_me.secure,
                    http_only: remember_me.http_only,
                };
                let provider = RememberMeIdentityProvider::new(cipher)
                    .with_cookie(cookie)
                    .with_lifetime(Duration::from_secs(remember_me.lifetime_seconds))
                    .with_opt_in_field(remember_me.opt_in_field.clone());
                chain.add_provider(Arc::new(provider));
            }
        }

        if self.post_fields.enabled {
            chain.add_provider(Arc::new(PostFieldsIdentityProvider::new(
                self.post_fields.username_field.clone(),
                self.post_fields.password_field.clone(),
            )));
        }

        if self.http.digest {
            let provider = DigestIdentityProvider::new(digest.clone())?
                .with_plain_user_credentials(!self.http.digest_credentials_are_ha1);
            chain.add_provider(Arc::new(provider));
        }

        if self.http.basic {
            let challenge = BasicChallenge::new(self.http.realm.clone());
            chain.add_provider(Arc::new(BasicIdentityProvider::from(&challenge)));
        }

        if self.anonymous.enabled {
            chain.add_provider(Arc::new(AnonymousIdentityProvider::new(
                self.anonymous.cookie_name.clone(),
            )));
        }

        Ok(chain)
    }

    /// Configured users first, then the initial user.
    pub fn user_provider(&self) -> Result<ChainUserProvider, SecurityError> {
        let users = self
            .users
            .iter()
            .map(|record| record.to_user())
            .collect::<Result<Vec<_>, _>>()?;
        let mut chain =
            ChainUserProvider::default().with_provider(Arc::new(InMemoryUserProvider::with_users(users)));

        if let Some(initial) = &self.initial_user {
            let mut provider = InitialUserProvider::new(
                initial.username.clone(),
                Secret::new(initial.password.expose_secret().clone()),
            )?;
            if let Some(roles) = &initial.roles {
                provider = provider.with_roles(roles.iter().cloned());
            }
            chain.add_provider(Arc::new(provider));
        }

        Ok(chain)
    }

    pub fn password_encoder(&self) -> Result<Arc<dyn PasswordEncoder>, SecurityError> {
        Ok(match self.encoder.kind {
            PasswordEncoderKind::Plaintext => Arc::new(
                PlaintextPasswordEncoder::new().ignoring_case(self.encoder.ignore_password_case),
            ),
            PasswordEncoderKind::Argon2 => Arc::new(Argon2PasswordEncoder::new()?),
        })
    }

    /// Opens the attempt tables. Requires a running tokio runtime.
    pub fn attempt_validators(&self) -> Result<AttemptValidators, SecurityError> {
        let attempts = &self.attempts;
        let open = |table: &str| {
            SqliteAttemptStore::open(&attempts.database_path, table)
                .map_err(|e| SecurityError::Configuration(e.to_string()))
        };

        let mut validators = AttemptValidators::default();
        if attempts.by_ip.enabled {
            validators.by_ip = Some(Arc::new(BruteForceValidator::by_client_ip(
                Arc::new(open(&attempts.ip_table)?),
                attempts.by_ip.max_trials,
                Duration::from_secs(attempts.by_ip.blocked_seconds),
            )));
        }
        if attempts.by_uri.enabled {
            validators.by_uri = Some(Arc::new(BruteForceValidator::by_server_uri(
                Arc::new(open(&attempts.uri_table)?),
                attempts.by_uri.max_trials,
                Duration::from_secs(attempts.by_uri.blocked_seconds),
            )));
        }
        if attempts.auto_logout.enabled {
            validators.auto_logout = Some(Arc::new(AutoLogoutValidator::new(
                Arc::new(open(&attempts.auto_logout_table)?),
                Duration::from_secs(attempts.auto_logout.max_inactive_seconds),
            )));
        }
        Ok(validators)
    }

    pub fn authorization_service(&self) -> Result<AuthorizationService, SecurityError> {
        let settings = &self.authorization;
        let strategy: DecisionStrategy = settings
            .strategy
            .parse()
            .map_err(|e: bastion_core::AuthorizationError| SecurityError::Configuration(e.to_string()))?;

        let mut service = AuthorizationService::new(strategy)
            .allow_if_all_abstain(settings.allow_if_all_abstain)
            .allow_if_equal_granted_denied(settings.allow_if_equal_granted_denied);
        for voter in &settings.voters {
            let voter: Arc<dyn Voter> = match voter {
                ConfiguredVoter::Role => Arc::new(RoleVoter::new(true)),
                ConfiguredVoter::AnyRole => Arc::new(RoleVoter::new(false)),
                ConfiguredVoter::RoleChain => Arc::new(RoleChainVoter::new(true)),
                ConfiguredVoter::Administrator => Arc::new(SingleRoleVoter::administrator()),
                ConfiguredVoter::Root => Arc::new(SingleRoleVoter::root()),
            };
            service.add_voter(voter);
        }
        Ok(service)
    }

    /// Authentication service with the configured users, encoder and attempt validators.
    pub fn authentication_service(&self) -> Result<AuthenticationService, SecurityError> {
        let user_provider: Arc<dyn UserProvider> = Arc::new(self.user_provider()?);
        let mut service = AuthenticationService::new(user_provider, Some(self.password_encoder()?));

        if let Some(username) = &self.anonymous.username {
            let anonymous: SharedUser = Arc::new(SimpleUser::new(
                username.clone(),
                String::new(),
                Vec::<String>::new(),
            ));
            service = service.with_anonymous_user(anonymous);
        }
        self.attempt_validators()?.register(&mut service);
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{IdentityProvider, UserProviderError};
    use bastion_core::testing::MockRequest;
    use tempfile::TempDir;

    fn settings(json: &str) -> SecuritySettings {
        SecuritySettings::from_json(json).unwrap()
    }

    #[test]
    fn chain_follows_the_fixed_order() {
        let settings = settings(
            r#"{ "cookie_secret": "s3cr3t", "http": { "digest": true } }"#,
        );
        let chain = settings.identity_provider().unwrap();

        assert_eq!(chain.providers().len(), 6);
        let request = MockRequest::new("POST", "/login")
            .with_form_field("username", "admin")
            .with_form_field("password", "12345");
        let tokens: Vec<String> = chain
            .yield_identities(&request)
            .map(|identity| identity.unwrap().token().to_string())
            .collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], "admin");
        assert!(tokens[1].starts_with("bastion_anonymous_"));
    }

    #[test]
    fn cookie_providers_need_a_secret() {
        let chain = settings(r#"{ "anonymous": { "enabled": false } }"#)
            .identity_provider()
            .unwrap();

        // POST fields and Basic
        assert_eq!(chain.providers().len(), 2);
    }

    #[tokio::test]
    async fn configured_users_shadow_the_initial_user() {
        let settings = settings(
            r#"{
                "users": [{ "username": "admin", "credentials": "configured", "roles": ["EDITOR"] }],
                "initial_user": { "username": "admin", "password": "initial" }
            }"#,
        );
        let provider = settings.user_provider().unwrap();

        let user = provider.load_user("admin").await.unwrap().unwrap();
        assert_eq!(user.roles(), ["EDITOR".to_string()]);
        assert!(matches!(
            provider.load_user("nobody").await,
            Ok(None) | Err(UserProviderError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn initial_user_defaults_to_root() {
        let settings = settings(r#"{ "initial_user": { "username": "root", "password": "toor" } }"#);
        let provider = settings.user_provider().unwrap();

        let user = provider.load_user("root").await.unwrap().unwrap();
        assert_eq!(user.roles(), [bastion_core::ROLE_ROOT.to_string()]);
    }

    #[test]
    fn unknown_strategy_is_a_configuration_error() {
        let settings = settings(r#"{ "authorization": { "strategy": "majority" } }"#);
        assert!(matches!(
            settings.authorization_service(),
            Err(SecurityError::Configuration(_))
        ));
    }

    #[test]
    fn authorization_service_uses_configured_voters() {
        let settings = settings(
            r#"{ "authorization": { "strategy": "Consensus", "voters": ["role_chain", "root"] } }"#,
        );
        let service = settings.authorization_service().unwrap();

        assert_eq!(service.strategy(), DecisionStrategy::Consensus);
        assert_eq!(service.voters().len(), 2);
        let admin = SimpleUser::new("admin", "", ["ROOT.ADMIN"]);
        assert!(service.grant_access(&admin, None, &["ROOT.ADMIN.USERS"]));
    }

    #[tokio::test]
    async fn attempt_validators_follow_the_switches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attempts.sqlite");
        let mut settings = SecuritySettings::default();
        settings.attempts.database_path = path;
        settings.attempts.by_uri.enabled = false;
        settings.attempts.auto_logout.enabled = true;

        let validators = settings.attempt_validators().unwrap();
        assert!(validators.by_ip.is_some());
        assert!(validators.by_uri.is_none());
        assert!(validators.auto_logout.is_some());
    }

    #[tokio::test]
    async fn invalid_table_names_fail_fast() {
        let dir = TempDir::new().unwrap();
        let mut settings = SecuritySettings::default();
        settings.attempts.database_path = dir.path().join("attempts.sqlite");
        settings.attempts.ip_table = "ATTEMPT; DROP TABLE x".to_string();

        assert!(matches!(
            settings.attempt_validators(),
            Err(SecurityError::Configuration(_))
        ));
    }
}
