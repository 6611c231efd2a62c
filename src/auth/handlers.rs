use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        history::LoginHistory,
        services::AuthError,
        session::{self, SessionUser},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/history", get(get_history))
}

/// Maps a service error onto the status and message shown to the user.
fn reject(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        AuthError::DuplicateUser(_) => (StatusCode::CONFLICT, e.to_string()),
        AuthError::NotFound(_) | AuthError::InvalidCredentials(_) => {
            (StatusCode::UNAUTHORIZED, e.to_string())
        }
        AuthError::Storage(ref cause) => {
            error!(error = %cause, "credential store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "There was an error processing the request".into(),
            )
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    match state.auth.register_user(&payload).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(e) => {
            warn!(user_name = %payload.user_name, error = %e, "registration rejected");
            Err(reject(e))
        }
    }
}

#[instrument(skip(state, session, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let user = state
        .auth
        .check_user(&payload.user_name, &payload.password, user_agent)
        .await
        .map_err(|e| {
            warn!(user_name = %payload.user_name, error = %e, "login rejected");
            reject(e)
        })?;

    session::start(&session, &user).await.map_err(|e| {
        error!(error = %e, "session start failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "There was an error processing the request".to_string(),
        )
    })?;

    info!(user_name = %user.user_name, "user logged in");
    Ok(Json(user))
}

pub async fn logout(session: Session) -> StatusCode {
    if let Err(e) = session.flush().await {
        warn!(error = %e, "session flush failed");
    }
    StatusCode::NO_CONTENT
}

#[instrument(skip_all)]
pub async fn get_me(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(user)
}

#[instrument(skip_all)]
pub async fn get_history(SessionUser(user): SessionUser) -> Json<LoginHistory> {
    Json(user.login_history)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::DuplicateUser("a".into()), StatusCode::CONFLICT),
            (AuthError::NotFound("a".into()), StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials("a".into()), StatusCode::UNAUTHORIZED),
            (
                AuthError::Storage(anyhow::anyhow!("down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(reject(err).0, status);
        }
    }

    #[test]
    fn storage_cause_is_not_leaked() {
        let (_, body) = reject(AuthError::Storage(anyhow::anyhow!("password=hunter2")));
        assert!(!body.contains("hunter2"));
    }
}
