//! Authentication types

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Signed-in user. Owned by the session shell for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            signed_in_at: Utc::now(),
        }
    }

    /// String shown in the dashboard header
    pub fn display_name(&self) -> &str {
        &self.email
    }
}

/// Outcome of the CLI availability check as shown on the login screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrerequisiteStatus {
    /// Check not finished yet
    Unknown,
    Available,
    Missing { download_url: String },
}

impl PrerequisiteStatus {
    pub fn is_definite(&self) -> bool {
        !matches!(self, PrerequisiteStatus::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password is required")]
    EmptyPassword,

    #[error("A sign-in is already in progress")]
    Pending,

    #[error("Sign-in was cancelled")]
    Cancelled,
}

impl serde::Serialize for AuthError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Basic `local@domain.tld` shape check
pub fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.starts_with('.'),
        None => false,
    }
}
