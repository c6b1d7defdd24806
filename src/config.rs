use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::storage::StorageConfig;

const ENV_PREFIX: &str = "APISEED";

/// Top-level application settings loaded from file + environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub environment: Environment,
    pub server: ServerSection,
    pub api: ApiSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub pagination: PaginationSection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "apiseed".to_string(),
            environment: Environment::default(),
            server: ServerSection::default(),
            api: ApiSection::default(),
            database: DatabaseSection::default(),
            logging: LoggingSection::default(),
            pagination: PaginationSection::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk and environment, then validate them.
    ///
    /// The file is named by `APISEED_CONFIG` (default `config.toml`) and is
    /// optional. Environment variables use the `APISEED_` prefix and `__` to
    /// descend into sections, e.g. `APISEED_SERVER__PORT=9000`.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("APISEED_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let settings = Self::load_from(&config_path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the given file (if it exists) and the environment
    /// without validating.
    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let mut builder = config::Config::builder();

        // Container platforms commonly inject a bare PORT; it ranks below the
        // file and the prefixed variables.
        if let Ok(port) = env::var("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT value '{port}'"))?;
            builder = builder.set_default("server.port", i64::from(port))?;
        }

        if config_path.exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("api.cors_origins")
                .try_parsing(true),
        );

        let raw = builder
            .build()
            .with_context(|| format!("failed to read settings from {}", config_path.display()))?;
        let mut settings: Self = raw.try_deserialize()?;

        if settings.logging.level.trim().is_empty() {
            settings.logging.level = "info".to_string();
        }

        Ok(settings)
    }

    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be greater than zero");
        }

        let prefix = &self.api.v1_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            bail!(
                "api.v1_prefix must start with '/' and must not end with '/', got '{}'",
                prefix
            );
        }

        if self.pagination.default_limit == 0 {
            bail!("pagination.default_limit must be greater than zero");
        }
        if self.pagination.default_limit > self.pagination.max_limit {
            bail!(
                "pagination.default_limit ({}) exceeds pagination.max_limit ({})",
                self.pagination.default_limit,
                self.pagination.max_limit
            );
        }

        if self.environment == Environment::Production
            && matches!(self.database.backend, StorageBackendKind::Memory)
        {
            bail!("the memory database backend is not allowed in production");
        }

        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn storage_config(&self) -> StorageConfig {
        self.database.to_runtime()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub v1_prefix: String,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            v1_prefix: "/api/v1".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: StorageBackendKind,
    pub root_path: String,
    /// Apply pending migrations when the server starts.
    pub auto_migrate: bool,
}

impl DatabaseSection {
    pub fn to_runtime(&self) -> StorageConfig {
        match self.backend {
            StorageBackendKind::Local => StorageConfig::Local {
                root_path: self.root_path.clone(),
            },
            StorageBackendKind::Memory => StorageConfig::Memory,
        }
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            root_path: "./data".to_string(),
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Local,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSection {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PaginationSection {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

impl PaginationSection {
    /// Resolve a requested page size against the configured bounds.
    pub fn resolve_limit(&self, requested: Option<usize>) -> Option<usize> {
        match requested {
            Some(0) => None,
            Some(limit) => Some(limit.min(self.max_limit)),
            None => Some(self.default_limit),
        }
    }
}
