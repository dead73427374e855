use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bastion_core::{ROLE_ROOT, SecurityError, SharedUser, User, UserProvider, UserProviderError};
use secrecy::{ExposeSecret, Secret};

/// Bootstrap user whose credentials can be erased after verification.
pub struct InitialUser {
    username: String,
    credentials: ArcSwapOption<Secret<String>>,
    roles: Vec<String>,
}

impl InitialUser {
    pub fn new(username: impl Into<String>, credentials: Secret<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            credentials: ArcSwapOption::from_pointee(credentials),
            roles,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.load().is_some()
    }
}

impl fmt::Debug for InitialUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialUser")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

impl User for InitialUser {
    fn username(&self) -> &str {
        &self.username
    }

    fn credentials(&self) -> Secret<String> {
        match self.credentials.load_full() {
            Some(credentials) => Secret::new(credentials.expose_secret().clone()),
            None => Secret::new(String::new()),
        }
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn erase_credentials(&self) -> bool {
        self.credentials.store(None);
        true
    }
}

/// Provides a single bootstrap user, typically before any real user store exists.
///
/// Every lookup hands out a fresh [`InitialUser`], so erasing the credentials
/// of one authenticated instance does not lock the account.
pub struct InitialUserProvider {
    username: String,
    password: Secret<String>,
    roles: Vec<String>,
}

impl InitialUserProvider {
    /// Fails on an empty username or password.
    pub fn new(username: impl Into<String>, password: Secret<String>) -> Result<Self, SecurityError> {
        let username = username.into();
        if username.is_empty() {
            return Err(SecurityError::Configuration(
                "Can not load initial user without valid username".to_string(),
            ));
        }
        if password.expose_secret().is_empty() {
            return Err(SecurityError::Configuration(
                "Can not load initial user without valid password".to_string(),
            ));
        }
        Ok(Self {
            username,
            password,
            roles: vec![ROLE_ROOT.to_string()],
        })
    }

    pub fn with_roles<R, S>(mut self, roles: R) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait::async_trait]
impl UserProvider for InitialUserProvider {
    async fn load_user(&self, token: &str) -> Result<Option<SharedUser>, UserProviderError> {
        if token != self.username {
            return Ok(None);
        }
        let user = InitialUser::new(
            self.username.clone(),
            Secret::new(self.password.expose_secret().clone()),
            self.roles.clone(),
        );
        Ok(Some(Arc::new(user)))
    }

    async fn usernames(&self) -> Result<Vec<String>, UserProviderError> {
        Ok(vec![self.username.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    #[test]
    fn rejects_empty_username_or_password() {
        assert!(matches!(
            InitialUserProvider::new("", secret("12345")),
            Err(SecurityError::Configuration(_))
        ));
        assert!(matches!(
            InitialUserProvider::new("admin", secret("")),
            Err(SecurityError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn loads_only_its_own_user_with_root_role() {
        let provider = InitialUserProvider::new("admin", secret("12345")).unwrap();

        let user = provider.load_user("admin").await.unwrap().unwrap();
        assert_eq!(user.roles(), [ROLE_ROOT.to_string()]);
        assert_eq!(user.credentials().expose_secret(), "12345");
        assert!(provider.load_user("other").await.unwrap().is_none());
        assert_eq!(provider.usernames().await.unwrap(), vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn erasing_one_instance_keeps_the_account_usable() {
        let provider = InitialUserProvider::new("admin", secret("12345"))
            .unwrap()
            .with_roles(["ROOT", "ROOT.ADMIN"]);

        let first = provider.load_user("admin").await.unwrap().unwrap();
        assert!(first.erase_credentials());
        assert_eq!(first.credentials().expose_secret(), "");

        let second = provider.load_user("admin").await.unwrap().unwrap();
        assert_eq!(second.credentials().expose_secret(), "12345");
        assert_eq!(second.roles().len(), 2);
    }
}
