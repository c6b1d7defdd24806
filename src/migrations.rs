//! Schema migrations
//!
//! Migrations are an ordered list of table operations. The applied revision
//! is stored in `_schema/version.json` alongside the data, so upgrading is
//! idempotent and a downgrade knows exactly what to revert.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{DataLog, Record, User};
use crate::repository::{create_table, drop_table};
use crate::storage::StorageBackend;
use crate::{Error, Result};

const STATE_KEY: &str = "_schema/version.json";

/// Change applied by a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateTable(&'static str),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub operations: Vec<Operation>,
}

impl Migration {
    pub fn new(version: u32, name: &'static str, operations: Vec<Operation>) -> Self {
        Self {
            version,
            name,
            operations,
        }
    }

    async fn apply(&self, storage: &dyn StorageBackend) -> Result<()> {
        for op in &self.operations {
            match op {
                Operation::CreateTable(table) => {
                    create_table(storage, table).await?;
                }
            }
        }
        Ok(())
    }

    async fn revert(&self, storage: &dyn StorageBackend) -> Result<()> {
        for op in self.operations.iter().rev() {
            match op {
                Operation::CreateTable(table) => {
                    drop_table(storage, table).await?;
                }
            }
        }
        Ok(())
    }
}

/// Migrations shipped with the application, oldest first
pub fn builtin() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_users", vec![Operation::CreateTable(User::TABLE)]),
        Migration::new(
            2,
            "create_data_logs",
            vec![Operation::CreateTable(DataLog::TABLE)],
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Persisted schema revision
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaState {
    pub version: u32,
    #[serde(default)]
    pub applied: Vec<AppliedMigration>,
}

pub struct Migrator {
    storage: Arc<dyn StorageBackend>,
    migrations: Vec<Migration>,
}

impl Migrator {
    /// Migrator over the built-in migrations
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            migrations: builtin(),
        }
    }

    /// Migrator over a custom list; versions must be non-zero and strictly
    /// increasing.
    pub fn with_migrations(
        storage: Arc<dyn StorageBackend>,
        migrations: Vec<Migration>,
    ) -> Result<Self> {
        let mut previous = 0;
        for migration in &migrations {
            if migration.version <= previous {
                return Err(Error::migration(format!(
                    "migration {} ({}) is out of order; versions must be strictly increasing and start above 0",
                    migration.version, migration.name
                )));
            }
            previous = migration.version;
        }
        Ok(Self {
            storage,
            migrations,
        })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn head(&self) -> u32 {
        self.migrations.last().map_or(0, |m| m.version)
    }

    pub async fn state(&self) -> Result<SchemaState> {
        if !self.storage.exists(STATE_KEY).await? {
            return Ok(SchemaState::default());
        }
        let data = self.storage.get(STATE_KEY).await?;
        let state: SchemaState = serde_json::from_slice(&data)?;

        if let Some(unknown) = state
            .applied
            .iter()
            .find(|a| !self.migrations.iter().any(|m| m.version == a.version))
        {
            return Err(Error::migration(format!(
                "database is at unknown revision {} ({})",
                unknown.version, unknown.name
            )));
        }
        Ok(state)
    }

    async fn save_state(&self, state: &SchemaState) -> Result<()> {
        let data = serde_json::to_vec_pretty(state)?;
        self.storage.put(STATE_KEY, Bytes::from(data)).await
    }

    pub async fn current_version(&self) -> Result<u32> {
        Ok(self.state().await?.version)
    }

    /// Migrations not yet applied, in ascending order
    pub async fn pending(&self) -> Result<Vec<&Migration>> {
        let state = self.state().await?;
        Ok(self
            .migrations
            .iter()
            .filter(|m| !state.applied.iter().any(|a| a.version == m.version))
            .collect())
    }

    /// Apply every pending migration. Returns the versions applied.
    pub async fn upgrade_head(&self) -> Result<Vec<u32>> {
        let mut state = self.state().await?;
        let mut applied = Vec::new();

        for migration in &self.migrations {
            if state.applied.iter().any(|a| a.version == migration.version) {
                continue;
            }

            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            migration.apply(self.storage.as_ref()).await.map_err(|e| {
                tracing::error!(version = migration.version, error = %e, "Migration failed");
                e
            })?;

            state.applied.push(AppliedMigration {
                version: migration.version,
                name: migration.name.to_string(),
                applied_at: Utc::now(),
            });
            state.version = migration.version;
            self.save_state(&state).await?;
            applied.push(migration.version);
        }

        if applied.is_empty() {
            tracing::debug!(version = state.version, "Schema already at head");
        }
        Ok(applied)
    }

    /// Revert applied migrations newer than `target`, newest first. Returns
    /// the versions reverted.
    pub async fn downgrade(&self, target: u32) -> Result<Vec<u32>> {
        let mut state = self.state().await?;
        if target > state.version {
            return Err(Error::migration(format!(
                "cannot downgrade to {} from current revision {}",
                target, state.version
            )));
        }

        let mut reverted = Vec::new();
        for migration in self.migrations.iter().rev() {
            if migration.version <= target {
                break;
            }
            if !state.applied.iter().any(|a| a.version == migration.version) {
                continue;
            }

            tracing::warn!(
                version = migration.version,
                name = migration.name,
                "Reverting migration"
            );
            migration.revert(self.storage.as_ref()).await?;

            state.applied.retain(|a| a.version != migration.version);
            state.version = state.applied.last().map_or(0, |a| a.version);
            self.save_state(&state).await?;
            reverted.push(migration.version);
        }
        Ok(reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn memory() -> Arc<dyn StorageBackend> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn builtin_migrations_are_ordered() {
        let migrator = Migrator::with_migrations(memory(), builtin()).unwrap();
        assert_eq!(migrator.head(), 2);
    }

    #[test]
    fn rejects_out_of_order_versions() {
        let migrations = vec![
            Migration::new(2, "b", vec![]),
            Migration::new(1, "a", vec![]),
        ];
        assert!(Migrator::with_migrations(memory(), migrations).is_err());

        let zero = vec![Migration::new(0, "zero", vec![])];
        assert!(Migrator::with_migrations(memory(), zero).is_err());
    }

    #[tokio::test]
    async fn upgrade_is_idempotent() {
        let migrator = Migrator::new(memory());
        assert_eq!(migrator.current_version().await.unwrap(), 0);
        assert_eq!(migrator.pending().await.unwrap().len(), 2);

        assert_eq!(migrator.upgrade_head().await.unwrap(), vec![1, 2]);
        assert_eq!(migrator.current_version().await.unwrap(), 2);
        assert!(migrator.pending().await.unwrap().is_empty());

        assert!(migrator.upgrade_head().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn downgrade_reverts_newer_migrations() {
        let storage = memory();
        let migrator = Migrator::new(storage.clone());
        migrator.upgrade_head().await.unwrap();

        assert_eq!(migrator.downgrade(1).await.unwrap(), vec![2]);
        assert_eq!(migrator.current_version().await.unwrap(), 1);
        assert!(storage.exists("users/_table.json").await.unwrap());
        assert!(!storage.exists("data_logs/_table.json").await.unwrap());

        assert!(migrator.downgrade(5).await.is_err());
        assert_eq!(migrator.downgrade(0).await.unwrap(), vec![1]);
        assert_eq!(migrator.current_version().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_revision_is_reported() {
        let storage = memory();
        Migrator::new(storage.clone()).upgrade_head().await.unwrap();

        let older = Migrator::with_migrations(
            storage,
            vec![Migration::new(1, "create_users", vec![])],
        )
        .unwrap();
        assert!(matches!(older.state().await, Err(Error::Migration(_))));
    }
}
