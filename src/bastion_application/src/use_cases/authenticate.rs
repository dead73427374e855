use std::sync::Arc;

use bastion_core::{
    AccountStatus, AuthRequest, AuthenticationError, AuthenticationFailure, Identity,
    NoIdentityReason, PasswordEncoder, PostAuthenticationValidator, PreAuthenticationValidator,
    SharedUser, UserProvider, UserProviderError,
};
use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use crate::encoding::PasswordEncoderChain;

// Identity <-> user pairs authenticated by one service instance
#[derive(Default)]
struct IdentityRegistry {
    pairs: Vec<(Identity, SharedUser)>,
}

impl IdentityRegistry {
    fn register(&mut self, identity: Identity, user: SharedUser) {
        self.pairs
            .retain(|(known, owner)| known != &identity && !Arc::ptr_eq(owner, &user));
        self.pairs.push((identity, user));
    }

    fn user_for(&self, identity: &Identity) -> Option<SharedUser> {
        self.pairs
            .iter()
            .find(|(known, _)| known == identity)
            .map(|(_, user)| user.clone())
    }

    fn identity_for(&self, user: &SharedUser) -> Option<Identity> {
        self.pairs
            .iter()
            .find(|(_, owner)| Arc::ptr_eq(owner, user))
            .map(|(identity, _)| identity.clone())
    }

    fn remove(&mut self, predicate: impl Fn(&(Identity, SharedUser)) -> bool) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|pair| !predicate(pair));
        self.pairs.len() != before
    }
}

/// Verifies identities against the user provider.
///
/// A call runs the pre-validators, resolves the user, checks account status,
/// verifies credentials with the selected encoder and then runs the
/// post-validators. Post-validators run whether resolution and verification
/// succeeded or not, so attempt bookkeeping always sees the outcome.
pub struct AuthenticationService {
    user_provider: Arc<dyn UserProvider>,
    password_encoder: Option<Arc<dyn PasswordEncoder>>,
    anonymous_user: Option<SharedUser>,
    pre_validators: Vec<Arc<dyn PreAuthenticationValidator>>,
    post_validators: Vec<Arc<dyn PostAuthenticationValidator>>,
    registry: RwLock<IdentityRegistry>,
}

impl AuthenticationService {
    pub fn new(
        user_provider: Arc<dyn UserProvider>,
        password_encoder: Option<Arc<dyn PasswordEncoder>>,
    ) -> Self {
        Self {
            user_provider,
            password_encoder,
            anonymous_user: None,
            pre_validators: Vec::new(),
            post_validators: Vec::new(),
            registry: RwLock::new(IdentityRegistry::default()),
        }
    }

    /// User returned for anonymous identities. Without one they are refused.
    pub fn with_anonymous_user(mut self, user: SharedUser) -> Self {
        self.anonymous_user = Some(user);
        self
    }

    pub fn with_validator<V>(mut self, validator: Arc<V>) -> Self
    where
        V: PreAuthenticationValidator + PostAuthenticationValidator + 'static,
    {
        self.add_validator(validator);
        self
    }

    /// Registers a validator for both hook points, replacing any validator of the same name.
    pub fn add_validator<V>(&mut self, validator: Arc<V>)
    where
        V: PreAuthenticationValidator + PostAuthenticationValidator + 'static,
    {
        self.add_pre_validator(validator.clone());
        self.add_post_validator(validator);
    }

    pub fn add_pre_validator(&mut self, validator: Arc<dyn PreAuthenticationValidator>) {
        self.pre_validators.retain(|v| v.name() != validator.name());
        self.pre_validators.push(validator);
    }

    pub fn add_post_validator(&mut self, validator: Arc<dyn PostAuthenticationValidator>) {
        self.post_validators.retain(|v| v.name() != validator.name());
        self.post_validators.push(validator);
    }

    /// Removes the named validator from both hook points.
    pub fn remove_validator(&mut self, name: &str) -> bool {
        let before = self.pre_validators.len() + self.post_validators.len();
        self.pre_validators.retain(|v| v.name() != name);
        self.post_validators.retain(|v| v.name() != name);
        before != self.pre_validators.len() + self.post_validators.len()
    }

    pub fn user_provider(&self) -> &Arc<dyn UserProvider> {
        &self.user_provider
    }

    pub fn password_encoder(&self) -> Option<&Arc<dyn PasswordEncoder>> {
        self.password_encoder.as_ref()
    }

    pub fn anonymous_user(&self) -> Option<&SharedUser> {
        self.anonymous_user.as_ref()
    }

    /// Authenticates `identity`, returning the resolved user.
    ///
    /// `specific_encoder` is the encoder an identity provider requires for its
    /// identities. It is tried before the service's default encoder.
    #[tracing::instrument(
        name = "AuthenticationService::authenticate",
        skip_all,
        fields(token = identity.map(Identity::token))
    )]
    pub async fn authenticate(
        &self,
        identity: Option<&Identity>,
        request: &dyn AuthRequest,
        specific_encoder: Option<Arc<dyn PasswordEncoder>>,
    ) -> Result<SharedUser, AuthenticationFailure> {
        let Some(identity) = identity else {
            tracing::debug!("No identity presented");
            return Err(AuthenticationError::NoIdentity {
                reason: NoIdentityReason::Missing,
            }
            .into());
        };

        self.authenticate_identity(identity, request, specific_encoder)
            .await
            .map_err(|error| {
                tracing::debug!(%error, "Authentication failed");
                AuthenticationFailure::new(error, Some(identity.clone()))
            })
    }

    /// Like [`authenticate`](Self::authenticate), but stores the failure in
    /// `failure` and returns `None` instead of propagating it.
    pub async fn authenticate_silently(
        &self,
        identity: Option<&Identity>,
        request: &dyn AuthRequest,
        specific_encoder: Option<Arc<dyn PasswordEncoder>>,
        failure: &mut Option<AuthenticationFailure>,
    ) -> Option<SharedUser> {
        match self.authenticate(identity, request, specific_encoder).await {
            Ok(user) => Some(user),
            Err(error) => {
                *failure = Some(error);
                None
            }
        }
    }

    async fn authenticate_identity(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        specific_encoder: Option<Arc<dyn PasswordEncoder>>,
    ) -> Result<SharedUser, AuthenticationError> {
        self.run_pre_validators(identity, request).await?;

        if identity.reliability().is_anonymous() {
            return self
                .anonymous_user
                .clone()
                .ok_or(AuthenticationError::NoIdentity {
                    reason: NoIdentityReason::AnonymousDisallowed,
                });
        }

        let outcome = self.resolve_and_verify(identity, specific_encoder).await;
        let post_validation = self
            .run_post_validators(identity, outcome.as_ref().ok(), request)
            .await;

        let user = outcome?;
        post_validation?;

        user.erase_credentials();
        self.registry
            .write()
            .await
            .register(identity.clone(), user.clone());
        Ok(user)
    }

    async fn run_pre_validators(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
    ) -> Result<(), AuthenticationError> {
        for validator in self.pre_validators.iter().filter(|v| v.is_enabled()) {
            if !validator
                .grant_before_authentication(identity, request)
                .await?
            {
                return Err(AuthenticationError::ValidatorDenied {
                    validator: validator.name().to_string(),
                });
            }
        }
        Ok(())
    }

    // With `user` absent an earlier step already failed: every validator still
    // runs and its own failures are only logged.
    async fn run_post_validators(
        &self,
        identity: &Identity,
        user: Option<&SharedUser>,
        request: &dyn AuthRequest,
    ) -> Result<(), AuthenticationError> {
        for validator in self.post_validators.iter().filter(|v| v.is_enabled()) {
            let denial = match validator
                .grant_after_authentication(identity, user, request)
                .await
            {
                Ok(true) => continue,
                Ok(false) => AuthenticationError::ValidatorDenied {
                    validator: validator.name().to_string(),
                },
                Err(error) => error,
            };

            if user.is_some() {
                return Err(denial);
            }
            tracing::warn!(
                validator = validator.name(),
                error = %denial,
                "Post-validation failed after an earlier authentication failure"
            );
        }
        Ok(())
    }

    async fn resolve_and_verify(
        &self,
        identity: &Identity,
        specific_encoder: Option<Arc<dyn PasswordEncoder>>,
    ) -> Result<SharedUser, AuthenticationError> {
        let username = identity.token();
        let user = match self.user_provider.load_user(username).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(UserProviderError::UserNotFound(_)) => {
                return Err(AuthenticationError::UserNotFound {
                    username: username.to_string(),
                });
            }
            Err(UserProviderError::UnexpectedError(e)) => {
                return Err(AuthenticationError::UserProvider(e));
            }
        };

        if let Some(restriction) = user.account_status().and_then(AccountStatus::restriction) {
            return Err(AuthenticationError::AccountRestricted {
                username: username.to_string(),
                restriction,
            });
        }

        let encoder = self.select_encoder(specific_encoder)?;
        if !encoder.is_valid(
            user.credentials().expose_secret(),
            identity.credentials().expose_secret(),
            identity.options(),
        ) {
            return Err(AuthenticationError::WrongPassword {
                username: username.to_string(),
            });
        }

        Ok(user)
    }

    fn select_encoder(
        &self,
        specific_encoder: Option<Arc<dyn PasswordEncoder>>,
    ) -> Result<Arc<dyn PasswordEncoder>, AuthenticationError> {
        match (specific_encoder, &self.password_encoder) {
            (Some(specific), Some(default)) => Ok(Arc::new(PasswordEncoderChain::new(vec![
                specific,
                default.clone(),
            ]))),
            (Some(specific), None) => Ok(specific),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(AuthenticationError::BadCredential(
                "No password encoder specified".to_string(),
            )),
        }
    }

    pub async fn user_for_identity(&self, identity: &Identity) -> Option<SharedUser> {
        self.registry.read().await.user_for(identity)
    }

    pub async fn identity_for_user(&self, user: &SharedUser) -> Option<Identity> {
        self.registry.read().await.identity_for(user)
    }

    pub async fn clear_identity(&self, identity: &Identity) -> bool {
        self.registry
            .write()
            .await
            .remove(|(known, _)| known == identity)
    }

    pub async fn clear_user(&self, user: &SharedUser) -> bool {
        self.registry
            .write()
            .await
            .remove(|(_, owner)| Arc::ptr_eq(owner, user))
    }

    /// Forgets every authenticated pair.
    pub async fn clear_authentication(&self) {
        self.registry.write().await.pairs.clear();
    }
}
