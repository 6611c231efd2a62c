use serde::{Deserialize, Serialize};

use crate::auth::{history::LoginHistory, repo_types::User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub email: String,
}

/// Request body for login. The user agent comes from the request headers.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Public part of the user: what the session carries and handlers return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub user_name: String,
    pub email: String,
    pub login_history: LoginHistory,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            user_name: u.user_name,
            email: u.email,
            login_history: u.login_history,
        }
    }
}
