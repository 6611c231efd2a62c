use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::auth::{
    dto::{PublicUser, RegisterRequest},
    history::LoginEntry,
    password::Passwords,
    repo::{CredentialStore, StoreError},
    repo_types::User,
};

/// Everything registration and login can fail with.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User Name already taken")]
    DuplicateUser(String),
    #[error("Unable to find user: {0}")]
    NotFound(String),
    #[error("Incorrect Password for user: {0}")]
    InvalidCredentials(String),
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(name) => Self::DuplicateUser(name),
            StoreError::NotFound(name) => Self::NotFound(name),
            StoreError::Backend(cause) => Self::Storage(cause),
        }
    }
}

/// Registers users and verifies logins against a [`CredentialStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    passwords: Passwords,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, passwords: Passwords) -> Self {
        Self { store, passwords }
    }

    #[instrument(skip(self, form), fields(user_name = %form.user_name))]
    pub async fn register_user(&self, form: &RegisterRequest) -> Result<PublicUser, AuthError> {
        if form.password != form.password2 {
            return Err(AuthError::Validation("Passwords do not match".into()));
        }

        // Names are stored exactly as given; only an all-blank name is refused.
        if form.user_name.trim().is_empty() {
            return Err(AuthError::Validation("User Name is required".into()));
        }

        let passwords = self.passwords.clone();
        let plain = form.password.clone();
        let hash = tokio::task::spawn_blocking(move || passwords.hash(&plain))
            .await
            .map_err(|e| AuthError::Storage(e.into()))?
            .map_err(AuthError::Storage)?;

        let user = User::new(form.user_name.clone(), hash, form.email.clone());
        self.store.insert(&user).await?;

        info!(user_name = %user.user_name, "user registered");
        Ok(user.into())
    }

    /// Verifies a login and records it in the user's history.
    ///
    /// The returned history already contains this login. When the history
    /// cannot be written back the login fails as a whole.
    #[instrument(skip(self, password))]
    pub async fn check_user(
        &self,
        user_name: &str,
        password: &str,
        user_agent: &str,
    ) -> Result<PublicUser, AuthError> {
        let mut user = self
            .store
            .find_by_user_name(user_name)
            .await?
            .ok_or_else(|| AuthError::NotFound(user_name.to_string()))?;

        let passwords = self.passwords.clone();
        let plain = password.to_string();
        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || passwords.verify(&plain, &hash))
            .await
            .map_err(|e| AuthError::Storage(e.into()))?
            .map_err(AuthError::Storage)?;

        if !ok {
            warn!(user_name, "login invalid password");
            return Err(AuthError::InvalidCredentials(user_name.to_string()));
        }

        // Concurrent logins for one user race here; the last write wins.
        user.login_history.record(LoginEntry::now(user_agent));
        self.store
            .update_history(&user.user_name, &user.login_history)
            .await?;

        debug!(user_name, entries = user.login_history.len(), "login history updated");
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::auth::{
        history::{LoginHistory, LOGIN_HISTORY_CAPACITY},
        memory::MemoryCredentialStore,
        password::cheap_passwords,
    };

    fn service_with(store: Arc<dyn CredentialStore>) -> AuthService {
        AuthService::new(store, cheap_passwords())
    }

    fn form(user_name: &str, password: &str, password2: &str) -> RegisterRequest {
        RegisterRequest {
            user_name: user_name.into(),
            password: password.into(),
            password2: password2.into(),
            email: format!("{user_name}@example.com"),
        }
    }

    /// Counts every call and delegates to a memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryCredentialStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn find_by_user_name(&self, n: &str) -> Result<Option<User>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_user_name(n).await
        }
        async fn insert(&self, u: &User) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(u).await
        }
        async fn update_history(&self, n: &str, h: &LoginHistory) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update_history(n, h).await
        }
    }

    /// Reads succeed from a memory store; every write fails.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryCredentialStore,
    }

    #[async_trait]
    impl CredentialStore for ReadOnlyStore {
        async fn find_by_user_name(&self, n: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_by_user_name(n).await
        }
        async fn insert(&self, _u: &User) -> Result<(), StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection reset")))
        }
        async fn update_history(&self, _n: &str, _h: &LoginHistory) -> Result<(), StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection reset")))
        }
    }

    #[tokio::test]
    async fn mismatched_passwords_never_touch_storage() {
        let store = Arc::new(CountingStore::default());
        let svc = service_with(store.clone());

        let err = svc.register_user(&form("ada", "one", "two")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m == "Passwords do not match"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_user_name_is_a_validation_error() {
        let store = Arc::new(CountingStore::default());
        let svc = service_with(store.clone());

        let err = svc.register_user(&form("  ", "pw", "pw")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m == "User Name is required"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_email_is_accepted_and_stored_verbatim() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());

        for (name, email) in [("ada", "ada@localhost"), ("bob", "not-an-email"), ("cy", "")] {
            let mut f = form(name, "pw", "pw");
            f.email = email.into();
            let public = svc.register_user(&f).await.unwrap();
            assert_eq!(public.email, email);
        }
        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert_eq!(stored.email, "ada@localhost");
    }

    #[tokio::test]
    async fn user_name_is_stored_untrimmed() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());

        svc.register_user(&form("ada", "pw", "pw")).await.unwrap();
        svc.register_user(&form(" ada", "other", "other")).await.unwrap();

        assert!(store.find_by_user_name(" ada").await.unwrap().is_some());
        let err = svc.check_user("ada", "other", "agent").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn second_registration_is_a_duplicate_and_keeps_first_record() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());

        svc.register_user(&form("ada", "first", "first")).await.unwrap();
        let err = svc
            .register_user(&form("ada", "second", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser(ref n) if n == "ada"));

        // The original password still works, the second one does not.
        svc.check_user("ada", "first", "test").await.unwrap();
        let err = svc.check_user("ada", "second", "test").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn registration_stores_hash_and_empty_history() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());

        let public = svc.register_user(&form("ada", "s3cret", "s3cret")).await.unwrap();
        assert!(public.login_history.is_empty());

        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert!(stored.login_history.is_empty());
        assert_ne!(stored.password_hash, "s3cret");
        assert!(!stored.password_hash.contains("s3cret"));
        assert!(cheap_passwords().verify("s3cret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn first_login_records_only_itself() {
        let svc = service_with(Arc::new(MemoryCredentialStore::new()));
        svc.register_user(&form("ada", "pw", "pw")).await.unwrap();

        let user = svc.check_user("ada", "pw", "Firefox").await.unwrap();
        assert_eq!(user.user_name, "ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.login_history.len(), 1);
        assert_eq!(user.login_history.first().unwrap().user_agent, "Firefox");
    }

    #[tokio::test]
    async fn nine_logins_keep_eight_newest_first() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());
        svc.register_user(&form("ada", "pw", "pw")).await.unwrap();

        let mut last = None;
        for i in 1..=9 {
            last = Some(svc.check_user("ada", "pw", &format!("agent-{i}")).await.unwrap());
        }
        let user = last.unwrap();

        let agents: Vec<_> = user
            .login_history
            .iter()
            .map(|e| e.user_agent.clone())
            .collect();
        let expected: Vec<_> = (2..=9).rev().map(|i| format!("agent-{i}")).collect();
        assert_eq!(user.login_history.len(), LOGIN_HISTORY_CAPACITY);
        assert_eq!(agents, expected);

        let times: Vec<_> = user.login_history.iter().map(|e| e.date_time).collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));

        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert_eq!(stored.login_history, user.login_history);
    }

    #[tokio::test]
    async fn wrong_password_leaves_history_untouched() {
        let store = Arc::new(MemoryCredentialStore::new());
        let svc = service_with(store.clone());
        svc.register_user(&form("ada", "pw", "pw")).await.unwrap();
        svc.check_user("ada", "pw", "first").await.unwrap();

        let err = svc.check_user("ada", "nope", "intruder").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(ref n) if n == "ada"));

        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert_eq!(stored.login_history.len(), 1);
        assert_eq!(stored.login_history.first().unwrap().user_agent, "first");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let svc = service_with(Arc::new(MemoryCredentialStore::new()));
        let err = svc.check_user("nobody", "pw", "agent").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(ref n) if n == "nobody"));
        assert_eq!(err.to_string(), "Unable to find user: nobody");
    }

    #[tokio::test]
    async fn failed_insert_is_a_storage_error() {
        let svc = service_with(Arc::new(ReadOnlyStore::default()));
        let err = svc.register_user(&form("ada", "pw", "pw")).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn failed_history_write_fails_the_login() {
        let store = Arc::new(ReadOnlyStore::default());
        let hash = cheap_passwords().hash("pw").unwrap();
        store
            .inner
            .insert(&User::new("ada".into(), hash, "".into()))
            .await
            .unwrap();

        let svc = service_with(store.clone());
        let err = svc.check_user("ada", "pw", "agent").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));

        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert!(stored.login_history.is_empty());
    }

    #[tokio::test]
    async fn unreadable_stored_hash_is_a_storage_error() {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .insert(&User::new("ada".into(), "garbage".into(), "".into()))
            .await
            .unwrap();

        let svc = service_with(store.clone());
        let err = svc.check_user("ada", "pw", "agent").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));

        let stored = store.find_by_user_name("ada").await.unwrap().unwrap();
        assert!(stored.login_history.is_empty());
    }
}
