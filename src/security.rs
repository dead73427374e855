use std::any::Any;
use std::sync::Arc;

use bastion_adapters::{Challenge, SecuritySettings};
use bastion_application::{AuthenticationService, AuthorizationService, IdentityService};
use bastion_core::{
    AuthRequest, AuthResponse, AuthenticationError, AuthenticationFailure, SecurityError,
    SharedUser, User,
};

/// Identity, authentication and authorization services wired together.
pub struct Security {
    identities: IdentityService,
    authentication: AuthenticationService,
    authorization: AuthorizationService,
    challenge: Option<Arc<dyn Challenge>>,
}

impl Security {
    pub fn new(
        identities: IdentityService,
        authentication: AuthenticationService,
        authorization: AuthorizationService,
    ) -> Self {
        Self {
            identities,
            authentication,
            authorization,
            challenge: None,
        }
    }

    pub fn with_challenge(mut self, challenge: Arc<dyn Challenge>) -> Self {
        self.challenge = Some(challenge);
        self
    }

    /// Builds every component from `settings`. Requires a running tokio runtime.
    pub fn from_settings(settings: &SecuritySettings) -> Result<Self, SecurityError> {
        let digest = settings.digest_challenge();
        let identities = IdentityService::new(Arc::new(settings.identity_provider_for(&digest)?));

        Ok(Self {
            identities,
            authentication: settings.authentication_service()?,
            authorization: settings.authorization_service()?,
            challenge: settings.challenge(&digest),
        })
    }

    pub fn identities(&self) -> &IdentityService {
        &self.identities
    }

    pub fn authentication(&self) -> &AuthenticationService {
        &self.authentication
    }

    pub fn authentication_mut(&mut self) -> &mut AuthenticationService {
        &mut self.authentication
    }

    pub fn authorization(&self) -> &AuthorizationService {
        &self.authorization
    }

    /// Authenticates the most preferred identity of `request` and installs it into `response`.
    ///
    /// Unauthenticated failures write the configured challenge.
    #[tracing::instrument(name = "Security::login", skip_all)]
    pub async fn login(
        &self,
        request: &dyn AuthRequest,
        response: &mut (dyn AuthResponse + Send),
    ) -> Result<SharedUser, AuthenticationFailure> {
        let (identity, malformed) = {
            let mut identities = self.identities.identities(request);
            let identity = identities.first().cloned();
            let malformed = identities.failures().first().map(ToString::to_string);
            (identity, malformed)
        };

        if let (None, Some(reason)) = (&identity, malformed) {
            return Err(AuthenticationError::BadCredential(reason).into());
        }

        let encoder = identity
            .as_ref()
            .and_then(|identity| self.identities.specific_encoder(identity));
        let user = match self
            .authentication
            .authenticate(identity.as_ref(), request, encoder)
            .await
        {
            Ok(user) => user,
            Err(failure) => {
                if failure.status_code() == 401 {
                    if let Some(challenge) = &self.challenge {
                        challenge.challenge(&mut *response);
                    }
                }
                return Err(failure);
            }
        };

        if let Some(identity) = &identity {
            match self.identities.install(identity, request, &mut *response) {
                Ok(true) => {}
                Ok(false) => tracing::warn!(token = identity.token(), "Identity was not installed"),
                Err(error) => tracing::warn!(%error, "Failed to install identity"),
            }
        }
        Ok(user)
    }

    /// Forgets the user's identity and clears it from the client.
    pub async fn logout(
        &self,
        user: &SharedUser,
        response: &mut (dyn AuthResponse + Send),
    ) -> Result<bool, SecurityError> {
        let Some(identity) = self.authentication.identity_for_user(user).await else {
            return Ok(false);
        };
        self.authentication.clear_user(user).await;
        self.identities.uninstall(&identity, response)
    }

    pub fn is_granted(&self, user: &dyn User, object: Option<&dyn Any>, attributes: &[&str]) -> bool {
        self.authorization.grant_access(user, object, attributes)
    }
}
