use bastion_core::cookie::Cookie;
use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityProvider, IdentityStream,
    Reliability, SecurityError,
};
use uuid::Uuid;

use super::is_logged_out;

pub const ANONYMOUS_COOKIE_NAME: &str = "bastion_anonymous_identity";

/// Gives every visitor an opaque, cookie-backed identity.
///
/// A fresh token is minted when the request carries none.
#[derive(Debug, Clone)]
pub struct AnonymousIdentityProvider {
    cookie_name: String,
}

impl Default for AnonymousIdentityProvider {
    fn default() -> Self {
        Self::new(ANONYMOUS_COOKIE_NAME)
    }
}

impl AnonymousIdentityProvider {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn identify(&self, request: &dyn AuthRequest) -> Option<Identity> {
        if is_logged_out(request) {
            return None;
        }
        let token = match request.cookie(&self.cookie_name) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => format!("bastion_anonymous_{}", Uuid::new_v4().simple()),
        };
        Some(Identity::new(token, "", Reliability::ANONYMOUS).with_kind(IdentityKind::Anonymous))
    }
}

impl IdentityProvider for AnonymousIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::Anonymous
    }

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a> {
        Box::new(
            std::iter::once_with(move || self.identify(request))
                .flatten()
                .map(Ok),
        )
    }

    fn install(
        &self,
        identity: &Identity,
        _request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        // Identities of other providers reach here through a common install
        if !self.is_provided(identity) {
            return Ok(true);
        }
        response.set_cookie(
            Cookie::build((self.cookie_name.clone(), identity.token().to_string()))
                .path("/")
                .http_only(true)
                .build(),
        );
        Ok(true)
    }

    fn uninstall(
        &self,
        _identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        response.remove_cookie(&self.cookie_name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::LOGGED_OUT_COOKIE_NAME;
    use bastion_core::testing::{MockRequest, MockResponse};

    fn identities(provider: &AnonymousIdentityProvider, request: &MockRequest) -> Vec<Identity> {
        provider
            .yield_identities(request)
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn reuses_the_cookie_token() {
        let provider = AnonymousIdentityProvider::default();
        let request = MockRequest::new("GET", "/").with_cookie(ANONYMOUS_COOKIE_NAME, "visitor-1");

        let found = identities(&provider, &request);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token(), "visitor-1");
        assert_eq!(found[0].reliability(), Reliability::ANONYMOUS);
        assert!(provider.is_provided(&found[0]));
    }

    #[test]
    fn mints_a_fresh_token_without_cookie() {
        let provider = AnonymousIdentityProvider::default();
        let request = MockRequest::new("GET", "/");

        let first = identities(&provider, &request);
        let second = identities(&provider, &request);
        assert!(first[0].token().starts_with("bastion_anonymous_"));
        assert_ne!(first[0].token(), second[0].token());
    }

    #[test]
    fn logged_out_marker_suppresses_the_identity() {
        let provider = AnonymousIdentityProvider::default();
        let request = MockRequest::new("GET", "/").with_cookie(LOGGED_OUT_COOKIE_NAME, "-");

        assert!(identities(&provider, &request).is_empty());
    }

    #[test]
    fn install_writes_and_uninstall_clears_the_cookie() {
        let provider = AnonymousIdentityProvider::default();
        let identity = Identity::new("visitor-1", "", Reliability::ANONYMOUS)
            .with_kind(IdentityKind::Anonymous);
        let mut response = MockResponse::default();

        assert!(provider.install(&identity, &MockRequest::new("GET", "/"), &mut response).unwrap());
        assert_eq!(response.cookie(ANONYMOUS_COOKIE_NAME).unwrap().value(), "visitor-1");

        assert!(provider.uninstall(&identity, &mut response).unwrap());
        assert_eq!(response.cookie(ANONYMOUS_COOKIE_NAME).unwrap().value(), "");
    }

    #[test]
    fn foreign_identities_are_not_written() {
        let provider = AnonymousIdentityProvider::default();
        let identity = Identity::new("admin", "12345", Reliability::HTML_FORM);
        let mut response = MockResponse::default();

        assert!(provider.install(&identity, &MockRequest::new("POST", "/"), &mut response).unwrap());
        assert!(response.cookies.is_empty());
    }
}
