use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// The signed-in user as returned by the backend's `user/` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SessionUser {
    /// Name to greet the user with, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{first} {last}"),
            (Some(first), _) if !first.is_empty() => first.to_owned(),
            _ => self.username.clone(),
        }
    }
}

/// Access/refresh pair issued by the token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
