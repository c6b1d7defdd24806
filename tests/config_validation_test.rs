use std::io::Write;

use apiseed::config::{Environment, LogFormat, Settings, StorageBackendKind};
use apiseed::storage::StorageConfig;

#[test]
fn production_rejects_memory_backend() {
    let mut settings = Settings {
        environment: Environment::Production,
        ..Default::default()
    };
    settings.database.backend = StorageBackendKind::Memory;

    assert!(
        settings.validate().is_err(),
        "Expected production + memory storage to fail validation"
    );

    settings.environment = Environment::Development;
    settings.validate().unwrap();
}

#[test]
fn prefix_must_be_absolute_without_trailing_slash() {
    for prefix in ["api/v1", "/api/v1/", "/", ""] {
        let mut settings = Settings::default();
        settings.api.v1_prefix = prefix.to_string();
        assert!(settings.validate().is_err(), "prefix {prefix:?} accepted");
    }
}

#[test]
fn pagination_bounds_are_checked() {
    let mut settings = Settings::default();
    settings.pagination.default_limit = 0;
    assert!(settings.validate().is_err());

    settings.pagination.default_limit = 600;
    settings.pagination.max_limit = 500;
    assert!(settings.validate().is_err());
}

#[test]
fn loads_settings_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
app_name = "inventory"
environment = "staging"

[server]
port = 9100

[database]
backend = "memory"

[logging]
level = "debug"
format = "text"
"#
    )
    .unwrap();

    let settings = Settings::load_from(file.path()).unwrap();
    settings.validate().unwrap();

    assert_eq!(settings.app_name, "inventory");
    assert_eq!(settings.environment, Environment::Staging);
    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.api.v1_prefix, "/api/v1");
    assert!(matches!(settings.logging.format, LogFormat::Text));
    assert!(matches!(settings.storage_config(), StorageConfig::Memory));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load_from("/nonexistent/apiseed.toml").unwrap();
    assert_eq!(settings.database.root_path, "./data");
    assert!(settings.database.auto_migrate);
}
