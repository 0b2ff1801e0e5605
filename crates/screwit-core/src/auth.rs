//! Identity port and first-sign-in registration.

use crate::users::UserClient;
use crate::{Result, ScrewitError};
use async_trait::async_trait;
use chrono::Utc;
use screwit_types::{AuthProvider, AuthUser, User};
use tokio::sync::watch;
use tracing::{info, warn};

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, provider: AuthProvider) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;

    /// Current identity, updated on every sign-in and sign-out.
    fn watch(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// In-process provider that signs in a preconfigured identity.
pub struct LocalIdentityProvider {
    identity: AuthUser,
    current: watch::Sender<Option<AuthUser>>,
}

impl LocalIdentityProvider {
    pub fn new(identity: AuthUser) -> Self {
        let (current, _) = watch::channel(None);
        Self { identity, current }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, provider: AuthProvider) -> Result<AuthUser> {
        info!(target: "screwit::auth", "Signed in {} via {}", self.identity.uid, provider);
        self.current.send_replace(Some(self.identity.clone()));
        Ok(self.identity.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(previous) = self.current.send_replace(None) {
            info!(target: "screwit::auth", "Signed out {}", previous.uid);
        }
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }
}

/// Sign in and return the stored profile, registering it on first sign-in.
pub async fn sign_in_or_register(
    provider: &str,
    identity: &dyn IdentityProvider,
    users: &UserClient,
) -> Result<User> {
    let provider: AuthProvider = provider.parse().map_err(|e: screwit_types::UnsupportedProvider| {
        warn!(target: "screwit::auth", "Rejected sign-in: {}", e);
        ScrewitError::UnsupportedProvider(e.0)
    })?;

    let auth_user = identity.sign_in(provider).await?;
    register_identity(&auth_user, provider, users).await
}

/// Return the profile for an already-authenticated identity, creating it if
/// this is the first time it is seen.
pub async fn register_identity(
    auth_user: &AuthUser,
    provider: AuthProvider,
    users: &UserClient,
) -> Result<User> {
    if let Some(existing) = users.get(&auth_user.uid).await? {
        return Ok(existing);
    }
    users
        .create(User::from_identity(auth_user, provider, Utc::now()))
        .await
}
