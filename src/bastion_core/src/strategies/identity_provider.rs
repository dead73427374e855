use std::sync::Arc;

use crate::domain::identity::Identity;
use crate::error::SecurityError;
use crate::http_abstraction::{AuthRequest, AuthResponse};
use crate::ports::services::PasswordEncoder;

/// Lazy, finite sequence of candidate identities borrowed from a request.
pub type IdentityStream<'a> = Box<dyn Iterator<Item = Result<Identity, SecurityError>> + 'a>;

/// A source of candidate identities.
///
/// Each call to [`IdentityProvider::yield_identities`] starts a fresh sequence.
/// Providers never cache what they produced.
pub trait IdentityProvider: Send + Sync {
    /// Whether `identity` was produced by this provider.
    fn is_provided(&self, identity: &Identity) -> bool;

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a>;

    /// Writes the identity into the response so the next request carries it.
    fn install(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError>;

    /// Whether installing `identity` should cascade to every provider of the enclosing chain.
    fn accepts_common_install(&self, _identity: &Identity) -> bool {
        false
    }

    fn uninstall(
        &self,
        identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError>;

    /// Encoder required to verify identities of this provider, if any.
    fn specific_encoder(&self, _identity: &Identity) -> Option<Arc<dyn PasswordEncoder>> {
        None
    }

    fn as_chain(&self) -> Option<&ChainIdentityProvider> {
        None
    }
}

/// Ordered composition of identity providers.
///
/// Identities are yielded in registration order, so earlier providers win
/// downstream.
#[derive(Default, Clone)]
pub struct ChainIdentityProvider {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl ChainIdentityProvider {
    pub fn new(providers: Vec<Arc<dyn IdentityProvider>>) -> Self {
        Self { providers }
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn add_provider(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.push(provider);
    }

    pub fn remove_provider(&mut self, provider: &Arc<dyn IdentityProvider>) {
        self.providers.retain(|p| !Arc::ptr_eq(p, provider));
    }

    pub fn providers(&self) -> &[Arc<dyn IdentityProvider>] {
        &self.providers
    }

    /// Owning provider of `identity`, searching nested chains depth-first.
    pub fn provider_for(&self, identity: &Identity) -> Option<&dyn IdentityProvider> {
        for provider in &self.providers {
            if let Some(chain) = provider.as_chain() {
                if let Some(found) = chain.provider_for(identity) {
                    return Some(found);
                }
            } else if provider.is_provided(identity) {
                return Some(provider.as_ref());
            }
        }
        None
    }

    fn install_everywhere(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        for provider in &self.providers {
            let installed = match provider.as_chain() {
                Some(chain) => chain.install_everywhere(identity, request, response)?,
                None => provider.install(identity, request, response)?,
            };
            if !installed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn uninstall_everywhere(
        &self,
        identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        for provider in &self.providers {
            let removed = match provider.as_chain() {
                Some(chain) => chain.uninstall_everywhere(identity, response)?,
                None => provider.uninstall(identity, response)?,
            };
            if !removed {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl IdentityProvider for ChainIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        self.provider_for(identity).is_some()
    }

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a> {
        Box::new(
            self.providers
                .iter()
                .flat_map(move |provider| provider.yield_identities(request)),
        )
    }

    fn install(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        let Some(owner) = self.provider_for(identity) else {
            return Ok(false);
        };
        if owner.accepts_common_install(identity) {
            self.install_everywhere(identity, request, response)
        } else {
            owner.install(identity, request, response)
        }
    }

    fn accepts_common_install(&self, identity: &Identity) -> bool {
        self.provider_for(identity)
            .is_some_and(|owner| owner.accepts_common_install(identity))
    }

    fn uninstall(
        &self,
        identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        if self.provider_for(identity).is_none() {
            return Ok(false);
        }
        self.uninstall_everywhere(identity, response)
    }

    fn specific_encoder(&self, identity: &Identity) -> Option<Arc<dyn PasswordEncoder>> {
        self.provider_for(identity)
            .and_then(|owner| owner.specific_encoder(identity))
    }

    fn as_chain(&self) -> Option<&ChainIdentityProvider> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::IdentityKind;
    use crate::domain::reliability::Reliability;
    use crate::http_abstraction::testing::{MockRequest, MockResponse};
    use cookie::Cookie;

    // Yields one identity of its kind and records installs as cookies
    struct StubProvider {
        kind: IdentityKind,
        token: &'static str,
        common: bool,
        install_result: bool,
    }

    impl StubProvider {
        fn new(kind: IdentityKind, token: &'static str) -> Self {
            Self {
                kind,
                token,
                common: false,
                install_result: true,
            }
        }
    }

    impl IdentityProvider for StubProvider {
        fn is_provided(&self, identity: &Identity) -> bool {
            identity.kind() == &self.kind
        }

        fn yield_identities<'a>(&'a self, _request: &'a dyn AuthRequest) -> IdentityStream<'a> {
            let identity = Identity::new(self.token, "", Reliability::HTTP).with_kind(self.kind.clone());
            Box::new(std::iter::once(Ok(identity)))
        }

        fn install(
            &self,
            _identity: &Identity,
            _request: &dyn AuthRequest,
            response: &mut dyn AuthResponse,
        ) -> Result<bool, SecurityError> {
            response.set_cookie(Cookie::new(self.token, "installed"));
            Ok(self.install_result)
        }

        fn accepts_common_install(&self, _identity: &Identity) -> bool {
            self.common
        }

        fn uninstall(
            &self,
            _identity: &Identity,
            response: &mut dyn AuthResponse,
        ) -> Result<bool, SecurityError> {
            response.remove_cookie(self.token);
            Ok(true)
        }
    }

    fn tokens(chain: &ChainIdentityProvider, request: &MockRequest) -> Vec<String> {
        chain
            .yield_identities(request)
            .map(|identity| identity.unwrap().token().to_string())
            .collect()
    }

    #[test]
    fn yields_in_registration_order_and_restarts() {
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")))
            .with_provider(Arc::new(StubProvider::new(IdentityKind::HttpBasic, "basic")));
        let request = MockRequest::new("GET", "/");

        assert_eq!(tokens(&chain, &request), vec!["session", "basic"]);
        assert_eq!(tokens(&chain, &request), vec!["session", "basic"]);
    }

    #[test]
    fn finds_owner_inside_nested_chain() {
        let inner = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::HttpDigest, "digest")));
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")))
            .with_provider(Arc::new(inner));

        let digest = Identity::new("x", "", Reliability::HTTP).with_kind(IdentityKind::HttpDigest);
        let anonymous = Identity::new("x", "", Reliability::ANONYMOUS).with_kind(IdentityKind::Anonymous);

        assert!(chain.is_provided(&digest));
        assert!(!chain.is_provided(&anonymous));
        let request = MockRequest::new("GET", "/");
        assert_eq!(tokens(&chain, &request), vec!["session", "digest"]);
    }

    #[test]
    fn install_goes_to_owner_only_without_common_install() {
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")))
            .with_provider(Arc::new(StubProvider::new(IdentityKind::PostFields, "form")));
        let identity = Identity::new("admin", "", Reliability::HTML_FORM).with_kind(IdentityKind::PostFields);
        let mut response = MockResponse::default();

        assert!(chain.install(&identity, &MockRequest::new("POST", "/"), &mut response).unwrap());
        assert!(response.cookie("form").is_some());
        assert!(response.cookie("session").is_none());
    }

    #[test]
    fn common_install_cascades_to_every_provider() {
        let mut remember = StubProvider::new(IdentityKind::RememberMe, "remember");
        remember.common = true;
        let inner = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::HttpBasic, "basic")));
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")))
            .with_provider(Arc::new(remember))
            .with_provider(Arc::new(inner));
        let identity = Identity::new("admin", "", Reliability::REMEMBER_ME).with_kind(IdentityKind::RememberMe);
        let mut response = MockResponse::default();

        assert!(chain.accepts_common_install(&identity));
        assert!(chain.install(&identity, &MockRequest::new("POST", "/"), &mut response).unwrap());
        assert!(response.cookie("session").is_some());
        assert!(response.cookie("remember").is_some());
        assert!(response.cookie("basic").is_some());
    }

    #[test]
    fn common_install_stops_at_first_failure() {
        let mut failing = StubProvider::new(IdentityKind::Session, "session");
        failing.install_result = false;
        let mut remember = StubProvider::new(IdentityKind::RememberMe, "remember");
        remember.common = true;
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(failing))
            .with_provider(Arc::new(remember));
        let identity = Identity::new("admin", "", Reliability::REMEMBER_ME).with_kind(IdentityKind::RememberMe);
        let mut response = MockResponse::default();

        assert!(!chain.install(&identity, &MockRequest::new("POST", "/"), &mut response).unwrap());
        assert!(response.cookie("remember").is_none());
    }

    #[test]
    fn unknown_identities_are_neither_installed_nor_uninstalled() {
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")));
        let identity = Identity::new("admin", "", Reliability::HTTP).with_kind(IdentityKind::HttpBasic);
        let mut response = MockResponse::default();

        assert!(!chain.install(&identity, &MockRequest::new("GET", "/"), &mut response).unwrap());
        assert!(!chain.uninstall(&identity, &mut response).unwrap());
        assert!(response.cookies.is_empty());
    }

    #[test]
    fn uninstall_cascades_to_every_provider() {
        let chain = ChainIdentityProvider::default()
            .with_provider(Arc::new(StubProvider::new(IdentityKind::Session, "session")))
            .with_provider(Arc::new(StubProvider::new(IdentityKind::RememberMe, "remember")));
        let identity = Identity::new("admin", "", Reliability::SESSION).with_kind(IdentityKind::Session);
        let mut response = MockResponse::default();

        assert!(chain.uninstall(&identity, &mut response).unwrap());
        assert!(response.cookie("session").is_some());
        assert!(response.cookie("remember").is_some());
    }
}
