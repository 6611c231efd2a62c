use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use time::{Duration, OffsetDateTime};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, Session, SessionManagerLayer};
use tracing::{debug, error, warn};

use crate::{auth::dto::PublicUser, config::SessionConfig, state::AppState};

const USER_KEY: &str = "user";
const STARTED_AT_KEY: &str = "started_at";
const LAST_SEEN_KEY: &str = "last_seen";

/// Server-side sessions keyed by the cookie id. The store expires a session
/// once it has been idle for the active window.
pub fn session_layer(cfg: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(cfg.cookie_name.clone())
        .with_secure(cfg.secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(cfg.active_minutes)))
}

/// Absolute session lifetime, counted from login.
#[derive(Debug, Clone, Copy)]
pub struct SessionLifetime(pub Duration);

impl FromRef<AppState> for SessionLifetime {
    fn from_ref(state: &AppState) -> Self {
        SessionLifetime(Duration::minutes(state.config.session.duration_minutes))
    }
}

impl SessionLifetime {
    pub fn has_ended(&self, started_at: i64, now: OffsetDateTime) -> bool {
        now.unix_timestamp() - started_at >= self.0.whole_seconds()
    }
}

/// Puts `user` into a session with a fresh id.
pub async fn start(session: &Session, user: &PublicUser) -> anyhow::Result<()> {
    session.cycle_id().await?;
    session.insert(USER_KEY, user).await?;
    session
        .insert(STARTED_AT_KEY, OffsetDateTime::now_utc().unix_timestamp())
        .await?;
    debug!(user_name = %user.user_name, "session started");
    Ok(())
}

/// Marks logged-in sessions as active so the store saves them with a new
/// idle deadline and the cookie is sent again.
pub async fn keep_alive(session: Session, request: Request, next: Next) -> Response {
    if let Ok(Some(_)) = session.get::<i64>(STARTED_AT_KEY).await {
        if let Err(e) = session.insert(LAST_SEEN_KEY, OffsetDateTime::now_utc()).await {
            warn!(error = %e, "session activity not recorded");
        }
    }
    next.run(request).await
}

/// The logged-in user of the current session.
pub struct SessionUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionLifetime: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| (status, msg.to_string()))?;

        let user = session.get::<PublicUser>(USER_KEY).await.map_err(session_failure)?;
        let started_at = session.get::<i64>(STARTED_AT_KEY).await.map_err(session_failure)?;
        let (Some(user), Some(started_at)) = (user, started_at) else {
            return Err((StatusCode::UNAUTHORIZED, "Login required".to_string()));
        };

        if SessionLifetime::from_ref(state).has_ended(started_at, OffsetDateTime::now_utc()) {
            warn!(user_name = %user.user_name, "session reached its absolute lifetime");
            if let Err(e) = session.flush().await {
                warn!(error = %e, "expired session not removed");
            }
            return Err((StatusCode::UNAUTHORIZED, "Session expired, please log in".to_string()));
        }

        Ok(SessionUser(user))
    }
}

fn session_failure(e: tower_sessions::session::Error) -> (StatusCode, String) {
    error!(error = %e, "session store failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "There was an error processing the request".to_string(),
    )
}
