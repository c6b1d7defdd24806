//! Resource models exposed by the API
//!
//! Each resource has a stored shape (`User`, `DataLog`) and a create payload
//! (`UserCreate`, `DataLogCreate`) that is validated before it reaches a
//! repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Identifier assigned by a table on insert
pub type RecordId = u64;

pub const MAX_LOG_MESSAGE_LEN: usize = 4096;

/// A record persisted in a table
pub trait Record: Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// Table the record lives in
    const TABLE: &'static str;
    /// Name used in error messages
    const ENTITY: &'static str;

    fn id(&self) -> RecordId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const ENTITY: &'static str = "User";

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
}

impl UserCreate {
    /// Trim fields, lowercase the email and check required values.
    pub fn normalize(self) -> Result<Self, DataError> {
        let email = self.email.trim().to_ascii_lowercase();
        let full_name = self.full_name.trim().to_string();

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(DataError::Invalid(format!(
                    "email '{}' is not a valid address",
                    email
                )))
            }
        }
        if full_name.is_empty() {
            return Err(DataError::Invalid("full_name must not be empty".into()));
        }

        Ok(Self { email, full_name })
    }

    pub fn into_user(self, id: RecordId) -> User {
        User {
            id,
            email: self.email,
            full_name: self.full_name,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(DataError::Invalid(format!("unknown log level '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLog {
    pub id: RecordId,
    pub level: LogLevel,
    pub message: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Record for DataLog {
    const TABLE: &'static str = "data_logs";
    const ENTITY: &'static str = "DataLog";

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataLogCreate {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    pub message: String,
    pub source: String,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl DataLogCreate {
    pub fn normalize(self) -> Result<Self, DataError> {
        let source = self.source.trim().to_string();

        if self.message.trim().is_empty() {
            return Err(DataError::Invalid("message must not be empty".into()));
        }
        if self.message.chars().count() > MAX_LOG_MESSAGE_LEN {
            return Err(DataError::Invalid(format!(
                "message must be at most {} characters",
                MAX_LOG_MESSAGE_LEN
            )));
        }
        if source.is_empty() {
            return Err(DataError::Invalid("source must not be empty".into()));
        }

        Ok(Self {
            level: self.level,
            message: self.message,
            source,
        })
    }

    pub fn into_log(self, id: RecordId) -> DataLog {
        DataLog {
            id,
            level: self.level,
            message: self.message,
            source: self.source,
            created_at: Utc::now(),
        }
    }
}
