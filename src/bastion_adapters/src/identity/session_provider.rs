use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityProvider, IdentityStream,
    Reliability, SecurityError,
};

use super::cookie_codec::{CookieCipher, CookieSettings, SealedIdentityCodec};

pub const SESSION_COOKIE_NAME: &str = "bastion_session";

/// Carries an authenticated identity in a sealed, browser-session cookie.
///
/// Read identities never exceed [`Reliability::SESSION`].
#[derive(Debug)]
pub struct SessionIdentityProvider {
    codec: SealedIdentityCodec,
    cookie: CookieSettings,
}

impl SessionIdentityProvider {
    pub fn new(cipher: CookieCipher) -> Self {
        Self {
            codec: SealedIdentityCodec::new(cipher, IdentityKind::Session, Reliability::SESSION),
            cookie: CookieSettings::named(SESSION_COOKIE_NAME),
        }
    }

    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }

    pub fn provider_key(&self) -> &str {
        self.codec.cipher().provider_key()
    }
}

impl IdentityProvider for SessionIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::Session
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
        _request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        let value = self.codec.encode(identity)?;
        response.set_cookie(self.cookie.build(value, None));
        Ok(true)
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

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::testing::{MockRequest, MockResponse};
    use secrecy::{ExposeSecret, Secret};

    fn provider() -> SessionIdentityProvider {
        let cipher = CookieCipher::new("session", &Secret::new("s3cr3t".to_string())).unwrap();
        SessionIdentityProvider::new(cipher)
    }

    fn installed_value(provider: &SessionIdentityProvider, identity: &Identity) -> String {
        let mut response = MockResponse::default();
        assert!(
            provider
                .install(identity, &MockRequest::new("POST", "/login"), &mut response)
                .unwrap()
        );
        let cookie = response.cookie(SESSION_COOKIE_NAME).unwrap();
        assert!(cookie.max_age().is_none());
        assert_eq!(cookie.http_only(), Some(true));
        cookie.value().to_string()
    }

    #[test]
    fn installed_cookie_is_read_back_with_session_ceiling() {
        let provider = provider();
        let identity = Identity::new("admin", "12345", Reliability::HTML_FORM);

        let value = installed_value(&provider, &identity);
        let request = MockRequest::new("GET", "/").with_cookie(SESSION_COOKIE_NAME, &value);
        let found: Vec<_> = provider.yield_identities(&request).collect();

        assert_eq!(found.len(), 1);
        let read = found[0].as_ref().unwrap();
        assert_eq!(read.token(), "admin");
        assert_eq!(read.credentials().expose_secret(), "12345");
        assert_eq!(read.reliability(), Reliability::SESSION);
        assert!(provider.is_provided(read));
        assert!(!provider.accepts_common_install(read));
    }

    #[test]
    fn no_cookie_yields_nothing() {
        let provider = provider();
        assert!(provider.yield_identities(&MockRequest::new("GET", "/")).next().is_none());
    }

    #[test]
    fn cookie_from_another_secret_is_an_error_item() {
        let other = SessionIdentityProvider::new(
            CookieCipher::new("session", &Secret::new("different".to_string())).unwrap(),
        );
        let value = installed_value(&other, &Identity::new("admin", "12345", Reliability::HTTP));

        let provider = provider();
        let request = MockRequest::new("GET", "/").with_cookie(SESSION_COOKIE_NAME, &value);
        let found: Vec<_> = provider.yield_identities(&request).collect();

        assert!(matches!(found[..], [Err(SecurityError::MalformedCredentials(_))]));
    }

    #[test]
    fn uninstall_expires_the_cookie() {
        let provider = provider();
        let mut response = MockResponse::default();
        let identity = Identity::new("admin", "", Reliability::SESSION).with_kind(IdentityKind::Session);

        assert!(provider.uninstall(&identity, &mut response).unwrap());
        let cookie = response.cookie(SESSION_COOKIE_NAME).unwrap();
        assert!(cookie.max_age().is_some_and(|age| age.is_zero()));
    }
}
