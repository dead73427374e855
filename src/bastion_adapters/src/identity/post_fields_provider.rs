use bastion_core::{
    AuthRequest, AuthResponse, Identity, IdentityKind, IdentityProvider, IdentityStream,
    Reliability, SecurityError,
};

pub const DEFAULT_TOKEN_FIELD: &str = "username";
pub const DEFAULT_CREDENTIALS_FIELD: &str = "password";

/// Reads a submitted login form.
#[derive(Debug, Clone)]
pub struct PostFieldsIdentityProvider {
    token_field: String,
    credentials_field: String,
}

impl Default for PostFieldsIdentityProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_FIELD, DEFAULT_CREDENTIALS_FIELD)
    }
}

impl PostFieldsIdentityProvider {
    pub fn new(token_field: impl Into<String>, credentials_field: impl Into<String>) -> Self {
        Self {
            token_field: token_field.into(),
            credentials_field: credentials_field.into(),
        }
    }

    pub fn token_field(&self) -> &str {
        &self.token_field
    }

    pub fn credentials_field(&self) -> &str {
        &self.credentials_field
    }

    fn identify(&self, request: &dyn AuthRequest) -> Option<Identity> {
        let token = request
            .form_field(&self.token_field)
            .filter(|token| !token.is_empty())?;
        let credentials = request.form_field(&self.credentials_field).unwrap_or_default();
        Some(
            Identity::new(token, credentials, Reliability::HTML_FORM)
                .with_kind(IdentityKind::PostFields),
        )
    }
}

impl IdentityProvider for PostFieldsIdentityProvider {
    fn is_provided(&self, identity: &Identity) -> bool {
        identity.kind() == &IdentityKind::PostFields
    }

    fn yield_identities<'a>(&'a self, request: &'a dyn AuthRequest) -> IdentityStream<'a> {
        Box::new(
            std::iter::once_with(move || self.identify(request))
                .flatten()
                .map(Ok),
        )
    }

    // A form is submitted once, there is nothing to persist here
    fn install(
        &self,
        _identity: &Identity,
        _request: &dyn AuthRequest,
        _response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        Ok(true)
    }

    /// A form login is handed to every provider, so the session and
    /// remember-me cookies get written.
    fn accepts_common_install(&self, _identity: &Identity) -> bool {
        true
    }

    fn uninstall(
        &self,
        _identity: &Identity,
        _response: &mut dyn AuthResponse,
    ) -> Result<bool, SecurityError> {
        Ok(true)
    }
}
