use std::sync::Arc;

use bastion_core::{SharedUser, UserProvider, UserProviderError};
use tokio::sync::RwLock;

/// Users held in memory, keyed by username.
///
/// Lookups of unknown tokens fail with [`UserProviderError::UserNotFound`].
#[derive(Default, Clone)]
pub struct InMemoryUserProvider {
    users: Arc<RwLock<Vec<SharedUser>>>,
}

impl InMemoryUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = SharedUser>) -> Self {
        let mut unique: Vec<SharedUser> = Vec::new();
        for user in users {
            unique.retain(|known| known.username() != user.username());
            unique.push(user);
        }
        Self {
            users: Arc::new(RwLock::new(unique)),
        }
    }

    /// Adds `user`, replacing any user of the same name.
    pub async fn add_user(&self, user: SharedUser) {
        let mut users = self.users.write().await;
        users.retain(|known| known.username() != user.username());
        users.push(user);
    }

    pub async fn remove_user(&self, username: &str) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|known| known.username() != username);
        users.len() != before
    }

    pub async fn remove_all_users(&self) {
        self.users.write().await.clear();
    }
}

#[async_trait::async_trait]
impl UserProvider for InMemoryUserProvider {
    async fn load_user(&self, token: &str) -> Result<Option<SharedUser>, UserProviderError> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|user| user.username() == token)
            .cloned()
            .map(Some)
            .ok_or_else(|| UserProviderError::UserNotFound(token.to_string()))
    }

    async fn usernames(&self) -> Result<Vec<String>, UserProviderError> {
        let users = self.users.read().await;
        Ok(users.iter().map(|user| user.username().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::SimpleUser;
    use fake::Fake;
    use fake::faker::internet::en::{Password, Username};

    fn random_user() -> SharedUser {
        let username: String = Username().fake();
        let password: String = Password(8..16).fake();
        Arc::new(SimpleUser::new(username, password, ["USER"]))
    }

    #[tokio::test]
    async fn returns_the_stored_instance() {
        let user = random_user();
        let provider = InMemoryUserProvider::with_users([user.clone()]);

        let loaded = provider.load_user(user.username()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&loaded, &user));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let provider = InMemoryUserProvider::with_users([random_user()]);

        assert_eq!(
            provider.load_user("no such user").await.unwrap_err(),
            UserProviderError::UserNotFound("no such user".to_string())
        );
    }

    #[tokio::test]
    async fn adding_replaces_users_of_the_same_name() {
        let provider = InMemoryUserProvider::new();
        let first: SharedUser = Arc::new(SimpleUser::new("admin", "old", ["ROOT"]));
        let second: SharedUser = Arc::new(SimpleUser::new("admin", "new", ["ROOT"]));

        provider.add_user(first).await;
        provider.add_user(second.clone()).await;

        assert_eq!(provider.usernames().await.unwrap(), vec!["admin".to_string()]);
        let loaded = provider.load_user("admin").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&loaded, &second));
    }

    #[tokio::test]
    async fn removed_users_are_gone() {
        let user = random_user();
        let provider = InMemoryUserProvider::with_users([user.clone(), random_user()]);

        assert!(provider.remove_user(user.username()).await);
        assert!(!provider.remove_user(user.username()).await);
        assert!(provider.load_user(user.username()).await.is_err());

        provider.remove_all_users().await;
        assert!(provider.usernames().await.unwrap().is_empty());
    }
}
