use std::sync::Arc;

use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityOptions, IdentityProvider,
    IdentityStream, PasswordEncoder, Reliability, SecurityError,
};
use regex::Regex;

use super::{clear_logged_out, is_logged_out, mark_logged_out};
use crate::challenge::DigestChallenge;
use crate::encoders::DigestResponseEncoder;

const PARAMETER_PATTERN: &str = r#"(\w+)=(?:"([^"]+)"|([^\s,]+))"#;
const REQUIRED_PARAMETERS: [&str; 8] = [
    "nonce", "nc", "cnonce", "qop", "username", "uri", "response", "opaque",
];

/// Reads RFC 2617 `Authorization: Digest` credentials issued for its challenge.
///
/// Headers answering another nonce or opaque value are ignored.
#[derive(Debug, Clone)]
pub struct DigestIdentityProvider {
    challenge: DigestChallenge,
    parameter: Regex,
    plain_user_credentials: bool,
}

impl DigestIdentityProvider {
    pub fn new(challenge: DigestChallenge) -> Result<Self, SecurityError> {
        let parameter = Regex::new(PARAMETER_PATTERN)
            .map_err(|e| SecurityError::Configuration(e.to_string()))?;
        Ok(Self {
            challenge,
            parameter,
            plain_user_credentials: false,
        })
    }

    /// Whether stored user credentials are plain passwords rather than HA1 hashes.
    pub fn with_plain_user_credentials(mut self, plain: bool) -> Self {
        self.plain_user_credentials = plain;
        self
    }

    pub fn challenge(&self) -> &DigestChallenge {
        &self.challenge
    }

    fn parse(&self, header: &str) -> Option<IdentityOptions> {
        let data: IdentityOptions = self
            .parameter
            .captures_iter(header)
            .filter_map(|captures| {
                let key = captures.get(1)?.as_str().to_string();
                let value = captures.get(2).or_else(|| captures.get(3))?.as_str().to_string();
                Some((key, value))
            })
            .collect();

        REQUIRED_PARAMETERS
            .iter()
            .all(|name| data.contains_key(*name))
            .then_some(data)
    }

    fn identify(&self, request: &dyn AuthRequest) -> Option<Identity> {
        let header = request.header("authorization")?;
        if !header.get(..7)?.eq_ignore_ascii_case("digest ") {
            return None;
        }
        let mut data = self.parse(&header[7..])?;
        if is_logged_out(request) {
            return None;
        }

        let username = data.remove("username")?;
        let response = data.remove("response")?;

        let nonce_matches = data.get("nonce").map(String::as_str) == Some(self.challenge.nonce());
        let opaque_matches = data.get("opaque").map(String::as_str) == Some(self.challenge.opaque());
        if !nonce_matches || !opaque_matches {
            tracing::debug!(username = %username, "Digest answer for a stale or foreign challenge");
            return None;
        }

        data.insert("method".to_string(), request.method().to_string());
        Some(
            Identity::new(username, response, Reliability::HTTP)
                .with_kind(IdentityKind::HttpDigest)
                .with_options(data),
        )
    }
}

impl IdentityProvider for DigestIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::HttpDigest
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
        _identity: &Identity,
        _request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        clear_logged_out(response);
        Ok(true)
    }

    fn uninstall(
        &self,
        _identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        mark_logged_out(response);
        Ok(true)
    }

    fn specific_encoder(&self, identity: &Identity) -> Option<Arc<dyn PasswordEncoder>> {
        Some(Arc::new(
            DigestResponseEncoder::new(self.challenge.realm(), identity.token())
                .with_plain_user_credentials(self.plain_user_credentials),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::testing::MockRequest;
    use secrecy::ExposeSecret;

    const NONCE: &str = "dcd98b7102dd2f0e8b11d0f600bfb0c093";
    const OPAQUE: &str = "5ccc069c403ebaf9f0171e9517f40e41";

    fn provider() -> DigestIdentityProvider {
        let challenge = DigestChallenge::new("testrealm@host.com")
            .with_nonce(NONCE)
            .with_opaque(OPAQUE);
        DigestIdentityProvider::new(challenge)
            .unwrap()
            .with_plain_user_credentials(true)
    }

    fn header(nonce: &str) -> String {
        format!(
            "Digest username=\"Mufasa\", realm=\"testrealm@host.com\", nonce=\"{nonce}\", \
             uri=\"/dir/index.html\", qop=auth, nc=00000001, cnonce=\"0a4f113b\", \
             response=\"6629fae49393a05397450978507c4ef1\", opaque=\"{OPAQUE}\""
        )
    }

    #[test]
    fn parses_the_header_into_an_identity() {
        let provider = provider();
        let request = MockRequest::new("GET", "/dir/index.html").with_header("Authorization", &header(NONCE));

        let identity = provider.yield_identities(&request).next().unwrap().unwrap();
        assert_eq!(identity.token(), "Mufasa");
        assert_eq!(identity.credentials().expose_secret(), "6629fae49393a05397450978507c4ef1");
        assert_eq!(identity.option("qop"), Some("auth"));
        assert_eq!(identity.option("nc"), Some("00000001"));
        assert_eq!(identity.option("method"), Some("GET"));
        assert_eq!(identity.option("username"), None);
        assert!(provider.is_provided(&identity));
    }

    #[test]
    fn specific_encoder_verifies_the_response() {
        let provider = provider();
        let request = MockRequest::new("GET", "/dir/index.html").with_header("Authorization", &header(NONCE));
        let identity = provider.yield_identities(&request).next().unwrap().unwrap();

        let encoder = provider.specific_encoder(&identity).unwrap();
        assert!(encoder.is_valid(
            "Circle Of Life",
            identity.credentials().expose_secret(),
            identity.options()
        ));
    }

    #[test]
    fn foreign_nonce_or_missing_parts_yield_nothing() {
        let provider = provider();
        let stale = MockRequest::new("GET", "/").with_header("Authorization", &header("0000"));
        let partial = MockRequest::new("GET", "/")
            .with_header("Authorization", "Digest username=\"Mufasa\", response=\"abc\"");

        assert!(provider.yield_identities(&stale).next().is_none());
        assert!(provider.yield_identities(&partial).next().is_none());
    }
}
