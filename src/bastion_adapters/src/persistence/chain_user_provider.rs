use std::collections::HashSet;
use std::sync::Arc;

use bastion_core::{SharedUser, UserProvider, UserProviderError};

/// Tries its members in order; the first one that knows the token wins.
#[derive(Default, Clone)]
pub struct ChainUserProvider {
    providers: Vec<Arc<dyn UserProvider>>,
}

impl ChainUserProvider {
    pub fn new(providers: Vec<Arc<dyn UserProvider>>) -> Self {
        Self { providers }
    }

    pub fn with_provider(mut self, provider: Arc<dyn UserProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn add_provider(&mut self, provider: Arc<dyn UserProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn UserProvider>] {
        &self.providers
    }
}

#[async_trait::async_trait]
impl UserProvider for ChainUserProvider {
    async fn load_user(&self, token: &str) -> Result<Option<SharedUser>, UserProviderError> {
        for provider in &self.providers {
            match provider.load_user(token).await {
                Ok(Some(user)) => return Ok(Some(user)),
                Ok(None) | Err(UserProviderError::UserNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn usernames(&self) -> Result<Vec<String>, UserProviderError> {
        let mut seen = HashSet::new();
        let mut usernames = Vec::new();
        for provider in &self.providers {
            for username in provider.usernames().await? {
                if seen.insert(username.clone()) {
                    usernames.push(username);
                }
            }
        }
        Ok(usernames)
    }
}
