use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, Secret};

use super::reliability::Reliability;

/// Name of the cookie that marks an explicit logout.
pub const LOGGED_OUT_COOKIE_NAME: &str = "_bastion_logged";

/// Value of [`LOGGED_OUT_COOKIE_NAME`] once the client logged out.
pub const LOGGED_OUT_MARKER: &str = "-";

/// Provider-specific context, e.g. the digest nonce and uri.
pub type IdentityOptions = BTreeMap<String, String>;

/// Which provider family produced an identity.
///
/// Providers use this to recognise their own identities without inspecting
/// the token or the options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IdentityKind {
    Anonymous,
    HttpBasic,
    HttpDigest,
    PostFields,
    Session,
    RememberMe,
    #[default]
    Generic,
    Custom(String),
}

/// A claimed, not yet verified, identity extracted from a request.
pub struct Identity {
    token: String,
    credentials: Secret<String>,
    reliability: Reliability,
    options: IdentityOptions,
    kind: IdentityKind,
}

impl Identity {
    pub fn new(
        token: impl Into<String>,
        credentials: impl Into<String>,
        reliability: Reliability,
    ) -> Self {
        Self {
            token: token.into(),
            credentials: Secret::new(credentials.into()),
            reliability,
            options: IdentityOptions::new(),
            kind: IdentityKind::Generic,
        }
    }

    pub fn with_kind(mut self, kind: IdentityKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_options(mut self, options: IdentityOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn credentials(&self) -> &Secret<String> {
        &self.credentials
    }

    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn kind(&self) -> &IdentityKind {
        &self.kind
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            credentials: Secret::new(self.credentials.expose_secret().clone()),
            reliability: self.reliability,
            options: self.options.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
            && self.credentials.expose_secret() == other.credentials.expose_secret()
            && self.reliability == other.reliability
            && self.options == other.options
            && self.kind == other.kind
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = "•".repeat(self.credentials.expose_secret().chars().count());
        f.debug_struct("Identity")
            .field("token", &self.token)
            .field("credentials", &masked)
            .field("reliability", &self.reliability)
            .field("options", &self.options)
            .field("kind", &self.kind)
            .finish()
    }
}
