use anyhow::Context;

/// Where user accounts live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStoreKind {
    Postgres,
    Memory,
}

impl UserStoreKind {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE value: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Absolute session lifetime.
    pub duration_minutes: i64,
    /// Idle window, slid forward on every authenticated request.
    pub active_minutes: i64,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub users_database_url: String,
    pub user_store: UserStoreKind,
    pub session: SessionConfig,
}

fn env_minutes(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let users_database_url =
            std::env::var("USERS_DATABASE_URL").unwrap_or_else(|_| database_url.clone());
        let user_store = match std::env::var("USER_STORE") {
            Ok(raw) => UserStoreKind::parse(&raw)?,
            Err(_) => UserStoreKind::Postgres,
        };

        let duration_minutes = env_minutes("SESSION_DURATION_MINUTES", 120);
        let active_minutes = env_minutes("SESSION_ACTIVE_MINUTES", 20).min(duration_minutes);
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE").unwrap_or_else(|_| "session".into()),
            duration_minutes,
            active_minutes,
            secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        Ok(Self {
            database_url,
            users_database_url,
            user_store,
            session,
        })
    }
}
