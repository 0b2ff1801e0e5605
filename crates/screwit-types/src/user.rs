//! User profiles and sign-in identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported provider: {0}")]
pub struct UnsupportedProvider(pub String);

impl FromStr for AuthProvider {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(AuthProvider::Google),
            _ => Err(UnsupportedProvider(s.to_string())),
        }
    }
}

/// Identity returned by the identity provider after sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-assigned id; also the key of the user profile.
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Stored user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl User {
    /// Profile registered on first sign-in.
    pub fn from_identity(identity: &AuthUser, provider: AuthProvider, now: DateTime<Utc>) -> Self {
        Self {
            id: identity.uid.clone(),
            name: identity
                .display_name
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
            email: identity
                .email
                .clone()
                .unwrap_or_else(|| "No Email".to_string()),
            provider: provider.to_string(),
            created_at: now,
            updated_at: now,
            profile_picture: identity.photo_url.clone(),
            organization: None,
        }
    }
}
