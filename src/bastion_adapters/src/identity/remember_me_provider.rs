use std::time::Duration;

use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityProvider, IdentityStream,
    Reliability, SecurityError,
};

use super::cookie_codec::{CookieCipher, CookieSettings, SealedIdentityCodec};
use super::is_truthy;

pub const REMEMBER_ME_COOKIE_NAME: &str = "bastion_remember_me";

/// 100 days.
pub const DEFAULT_REMEMBER_ME_LIFETIME: Duration = Duration::from_secs(8_640_000);

pub const DEFAULT_REMEMBER_ME_FIELD: &str = "remember_me";

/// Long-lived sealed cookie, written only when the client opts in.
///
/// Joins every login through a common install, so one successful form login
/// can set both the session and the remember-me cookie.
#[derive(Debug)]
pub struct RememberMeIdentityProvider {
    codec: SealedIdentityCodec,
    cookie: CookieSettings,
    lifetime: Duration,
    opt_in_field: String,
}

impl RememberMeIdentityProvider {
    pub fn new(cipher: CookieCipher) -> Self {
        Self {
            codec: SealedIdentityCodec::new(
                cipher,
                IdentityKind::RememberMe,
                Reliability::REMEMBER_ME,
            ),
            cookie: CookieSettings::named(REMEMBER_ME_COOKIE_NAME),
            lifetime: DEFAULT_REMEMBER_ME_LIFETIME,
            opt_in_field: DEFAULT_REMEMBER_ME_FIELD.to_string(),
        }
    }

    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_opt_in_field(mut self, field: impl Into<String>) -> Self {
        self.opt_in_field = field.into();
        self
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn opt_in_field(&self) -> &str {
        &self.opt_in_field
    }

    fn opted_in(&self, request: &dyn AuthRequest) -> bool {
        request.form_field(&self.opt_in_field).is_some_and(is_truthy)
    }
}

impl IdentityProvider for RememberMeIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::RememberMe
    }

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a> {
        Box::new(
            std::iter::once_with(move || {
                request
                    .cookie(&self.cookie.name)
                    .filter(|raw| !raw.is_empty())
                    .and_then(|raw| self.codec.decode(raw))
            })
            .flatten(),
        )
    }

    fn install(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        if !self.opted_in(request) {
            return Ok(true);
        }
        let max_age = time::Duration::try_from(self.lifetime)
            .map_err(|e| SecurityError::Configuration(e.to_string()))?;
        let value = self.codec.encode(identity)?;
        response.set_cookie(self.cookie.build(value, Some(max_age)));
        Ok(true)
    }

    fn accepts_common_install(&self, _identity: &Identity) -> bool {
        true
    }

    fn uninstall(
        &self,
        _identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        self.cookie.remove(response);
        Ok(true)
    }
}
