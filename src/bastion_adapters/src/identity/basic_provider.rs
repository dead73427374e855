use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityProvider, IdentityStream,
    Reliability, SecurityError,
};

use super::{clear_logged_out, is_logged_out, mark_logged_out};
use crate::challenge::{BasicChallenge, DEFAULT_REALM};

/// Reads `Authorization: Basic` credentials.
#[derive(Debug, Clone)]
pub struct BasicIdentityProvider {
    realm: String,
}

impl Default for BasicIdentityProvider {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl From<&BasicChallenge> for BasicIdentityProvider {
    fn from(challenge: &BasicChallenge) -> Self {
        Self::new(challenge.realm())
    }
}

impl BasicIdentityProvider {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    fn identify(&self, request: &dyn AuthRequest) -> Option<Result<Identity, SecurityError>> {
        let header = request.header("authorization")?;
        let scheme = header.get(..6)?;
        if !scheme.eq_ignore_ascii_case("basic ") {
            return None;
        }

        let parsed = parse_credentials(&header[6..]);
        if parsed.is_ok() && is_logged_out(request) {
            return None;
        }
        Some(parsed.map(|(username, password)| {
            Identity::new(username, password, Reliability::HTTP).with_kind(IdentityKind::HttpBasic)
        }))
    }
}

fn parse_credentials(encoded: &str) -> Result<(String, String), SecurityError> {
    let malformed =
        || SecurityError::MalformedCredentials("HTTP Basic: Authorization header could not be parsed".to_string());

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (username, password) = decoded.split_once(':').ok_or_else(malformed)?;
    Ok((username.to_string(), password.to_string()))
}

impl IdentityProvider for BasicIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::HttpBasic
    }

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a> {
        Box::new(std::iter::once_with(move || self.identify(request)).flatten())
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

    /// Browsers keep resending Basic credentials, so logging out leaves a marker cookie.
    fn uninstall(
        &self,
        _identity: &Identity,
        response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        mark_logged_out(response);
        Ok(true)
    }
}
