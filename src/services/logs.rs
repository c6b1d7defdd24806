use std::sync::Arc;

use crate::models::{DataLog, DataLogCreate, LogLevel, RecordId};
use crate::repository::{DataLogRepository, Page};
use crate::storage::StorageBackend;
use crate::Result;

pub struct DataLogService {
    repo: DataLogRepository,
}

impl DataLogService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: DataLogRepository::new(storage),
        }
    }

    pub async fn create(&self, payload: DataLogCreate) -> Result<DataLog> {
        let payload = payload.normalize().map_err(|e| {
            tracing::debug!(error = %e, "Rejected data log payload");
            e
        })?;

        let log = self.repo.create(payload).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to store data log");
            e
        })?;
        tracing::debug!(log_id = log.id, level = ?log.level, "Data log stored");
        Ok(log)
    }

    pub async fn get(&self, id: RecordId) -> Result<DataLog> {
        self.repo.get(id).await.map_err(|e| {
            if !e.is_not_found() {
                tracing::error!(log_id = id, error = %e, "Failed to load data log");
            }
            e
        })
    }

    pub async fn list(&self, level: Option<LogLevel>, page: Page) -> Result<Vec<DataLog>> {
        self.repo.list(level, page).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list data logs");
            e
        })
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        self.repo.delete(id).await.map_err(|e| {
            if !e.is_not_found() {
                tracing::error!(log_id = id, error = %e, "Failed to delete data log");
            }
            e
        })?;
        tracing::info!(log_id = id, "Data log deleted");
        Ok(())
    }
}
