use serde::{Deserialize, Serialize};

/// Who the local user is, as far as the sync layer cares. Votes and
/// owner-gated mutations need the email; presence needs the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub username: String,
    pub email: Option<String>,
}

impl SessionContext {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: Some(email.into()),
        }
    }

    /// A guest can read and chat but cannot vote or edit room settings.
    pub fn guest(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}
