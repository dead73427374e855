use std::cmp::Reverse;
use std::sync::Arc;

use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityProvider, IdentityStream, PasswordEncoder,
    Reliability, SecurityError,
};

/// Entry point for extracting identities from requests.
#[derive(Clone)]
pub struct IdentityService {
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Identities of one request, pulled from the provider on demand.
    pub fn identities<'a>(&'a self, request: &'a dyn AuthRequest) -> RequestIdentities<'a> {
        RequestIdentities {
            stream: Some(self.provider.yield_identities(request)),
            seen: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_provided(&self, identity: &Identity) -> bool {
        self.provider.is_provided(identity)
    }

    pub fn install(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        self.provider.install(identity, request, response)
    }

    pub fn uninstall(
        &self,
        identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        self.provider.uninstall(identity, response)
    }

    pub fn specific_encoder(&self, identity: &Identity) -> Option<Arc<dyn PasswordEncoder>> {
        self.provider.specific_encoder(identity)
    }
}

/// Memoised view over a provider's identity sequence for a single request.
///
/// The underlying stream is advanced only as far as a query needs and every
/// identity it produced is kept, so repeated queries never re-parse the request.
/// Malformed credentials are set aside in [`failures`](Self::failures).
pub struct RequestIdentities<'a> {
    stream: Option<IdentityStream<'a>>,
    seen: Vec<Identity>,
    failures: Vec<SecurityError>,
}

impl RequestIdentities<'_> {
    fn advance(&mut self) -> bool {
        while let Some(stream) = self.stream.as_mut() {
            match stream.next() {
                Some(Ok(identity)) => {
                    self.seen.push(identity);
                    return true;
                }
                Some(Err(error)) => {
                    tracing::debug!(%error, "Skipping malformed identity");
                    self.failures.push(error);
                }
                None => self.stream = None,
            }
        }
        false
    }

    pub fn first(&mut self) -> Option<&Identity> {
        if self.seen.is_empty() {
            self.advance();
        }
        self.seen.first()
    }

    /// First identity, in provider order, whose reliability is at least `minimum`.
    pub fn with_reliability(&mut self, minimum: Reliability) -> Option<&Identity> {
        let mut index = 0;
        loop {
            if index == self.seen.len() && !self.advance() {
                return None;
            }
            if self.seen[index].reliability() >= minimum {
                return self.seen.get(index);
            }
            index += 1;
        }
    }

    pub fn all(&mut self) -> &[Identity] {
        while self.advance() {}
        &self.seen
    }

    /// Every identity of at least `minimum` reliability, most reliable first.
    pub fn all_with_reliability(&mut self, minimum: Reliability) -> Vec<Identity> {
        let mut identities: Vec<Identity> = self
            .all()
            .iter()
            .filter(|identity| identity.reliability() >= minimum)
            .cloned()
            .collect();
        identities.sort_by_key(|identity| Reverse(identity.reliability()));
        identities
    }

    pub fn failures(&self) -> &[SecurityError] {
        &self.failures
    }
}
