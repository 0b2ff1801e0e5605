//! User profile store client.

use crate::store::DocumentStore;
use crate::Result;
use screwit_types::User;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct UserClient {
    store: Arc<dyn DocumentStore>,
}

impl UserClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, user: User) -> Result<User> {
        self.store.insert_user(&user).await.map_err(|e| {
            error!(target: "screwit::auth", "Error creating user {}: {}", user.id, e);
            e
        })?;
        info!(target: "screwit::auth", "Registered user {} ({})", user.id, user.provider);
        Ok(user)
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        self.store.get_user(id).await.map_err(|e| {
            error!(target: "screwit::auth", "Error getting user {}: {}", id, e);
            e
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.find_user_by_email(email).await.map_err(|e| {
            error!(target: "screwit::auth", "Error looking up user by email: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use chrono::Utc;
    use screwit_types::{AuthProvider, AuthUser};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let users = UserClient::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
        let identity = AuthUser {
            uid: "g-123".to_string(),
            display_name: Some("Keggy".to_string()),
            email: Some("keggy@dartmouth.edu".to_string()),
            photo_url: None,
        };
        let user = User::from_identity(&identity, AuthProvider::Google, Utc::now());

        users.create(user.clone()).await.unwrap();

        let by_id = users.get("g-123").await.unwrap().unwrap();
        assert_eq!(by_id.name, "Keggy");
        let by_email = users.find_by_email("keggy@dartmouth.edu").await.unwrap().unwrap();
        assert_eq!(by_email.id, "g-123");
        assert!(users.get("missing").await.unwrap().is_none());
    }
}
