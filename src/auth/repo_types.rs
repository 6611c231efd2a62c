use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use crate::auth::history::LoginHistory;

/// User record as the credential store keeps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_name: String,             // unique key, immutable
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 PHC string, not exposed in JSON
    pub email: String,
    pub login_history: LoginHistory,   // newest first
}

impl User {
    pub fn new(user_name: String, password_hash: String, email: String) -> Self {
        Self {
            user_name,
            password_hash,
            email,
            login_history: LoginHistory::new(),
        }
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub user_name: String,
    pub password_hash: String,
    pub email: String,
    pub login_history: Json<LoginHistory>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            user_name: r.user_name,
            password_hash: r.password_hash,
            email: r.email,
            login_history: r.login_history.0,
        }
    }
}
