use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::{
    history::LoginHistory,
    repo::{CredentialStore, StoreError},
    repo_types::User,
};

/// Process-local credential store. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(user_name).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.user_name) {
            return Err(StoreError::DuplicateKey(user.user_name.clone()));
        }
        users.insert(user.user_name.clone(), user.clone());
        Ok(())
    }

    async fn update_history(
        &self,
        user_name: &str,
        history: &LoginHistory,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::NotFound(user_name.to_string()))?;
        user.login_history = history.clone();
        Ok(())
    }
}
