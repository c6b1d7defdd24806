//! Repositories over the record tables

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::DataError;
use crate::models::{DataLog, DataLogCreate, LogLevel, RecordId, User, UserCreate};
use crate::storage::StorageBackend;
use crate::Result;

pub mod table;

pub use table::{create_table, drop_table, Table, TableMeta};

/// Pagination window applied to list queries
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

pub struct UserRepository {
    table: Table<User>,
    // Held across the email check and the insert.
    create_lock: Mutex<()>,
}

impl UserRepository {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            table: Table::new(storage),
            create_lock: Mutex::new(()),
        }
    }

    /// Insert a validated payload, rejecting a duplicate email.
    pub async fn create(&self, payload: UserCreate) -> Result<User> {
        let _guard = self.create_lock.lock().await;
        if self.find_by_email(&payload.email).await?.is_some() {
            return Err(DataError::Conflict {
                entity: "User",
                field: "email",
                value: payload.email,
            }
            .into());
        }
        self.table.insert(|id| payload.into_user(id)).await
    }

    pub async fn get(&self, id: RecordId) -> Result<User> {
        self.table.get(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut found = self
            .table
            .scan(0, 1, |user| user.email.eq_ignore_ascii_case(email))
            .await?;
        Ok(found.pop())
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>> {
        self.table.list(page.offset, page.limit).await
    }
}

pub struct DataLogRepository {
    table: Table<DataLog>,
}

impl DataLogRepository {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            table: Table::new(storage),
        }
    }

    pub async fn create(&self, payload: DataLogCreate) -> Result<DataLog> {
        self.table.insert(|id| payload.into_log(id)).await
    }

    pub async fn get(&self, id: RecordId) -> Result<DataLog> {
        self.table.get(id).await
    }

    pub async fn list(&self, level: Option<LogLevel>, page: Page) -> Result<Vec<DataLog>> {
        self.table
            .scan(page.offset, page.limit, |log| {
                level.map_or(true, |level| log.level == level)
            })
            .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        self.table.delete(id).await
    }
}
