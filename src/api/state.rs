//! API server state

use std::sync::Arc;

use crate::config::Settings;
use crate::repository::Page;
use crate::services::{DataLogService, UserService};
use crate::storage::StorageBackend;

use super::error::ApiError;

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub users: Arc<UserService>,
    pub logs: Arc<DataLogService>,
}

impl AppState {
    pub fn new(settings: Settings, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            settings: Arc::new(settings),
            users: Arc::new(UserService::new(storage.clone())),
            logs: Arc::new(DataLogService::new(storage)),
        }
    }

    /// Build a page from query parameters using the configured limits
    pub fn page(&self, offset: Option<usize>, limit: Option<usize>) -> Result<Page, ApiError> {
        let limit = self
            .settings
            .pagination
            .resolve_limit(limit)
            .ok_or_else(|| ApiError::unprocessable("limit must be greater than zero"))?;

        Ok(Page {
            offset: offset.unwrap_or(0),
            limit,
        })
    }
}
