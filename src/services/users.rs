use std::sync::Arc;

use crate::models::{RecordId, User, UserCreate};
use crate::repository::{Page, UserRepository};
use crate::storage::StorageBackend;
use crate::Result;

pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: UserRepository::new(storage),
        }
    }

    pub async fn create(&self, payload: UserCreate) -> Result<User> {
        let payload = payload.normalize().map_err(|e| {
            tracing::debug!(error = %e, "Rejected user payload");
            e
        })?;

        let user = self.repo.create(payload).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to create user");
            e
        })?;
        tracing::info!(user_id = user.id, "User created");
        Ok(user)
    }

    pub async fn get(&self, id: RecordId) -> Result<User> {
        self.repo.get(id).await.map_err(|e| {
            if e.is_not_found() {
                tracing::debug!(user_id = id, "User not found");
            } else {
                tracing::error!(user_id = id, error = %e, "Failed to load user");
            }
            e
        })
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>> {
        self.repo.list(page).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            e
        })
    }
}
