//! Environment overlay for settings. These tests mutate process environment,
//! so every test holds `ENV_LOCK`.

use std::env;
use std::io::Write;
use std::sync::Mutex;

use apiseed::config::Settings;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "PORT",
    "APISEED_SERVER__PORT",
    "APISEED_SERVER__HOST",
    "APISEED_API__CORS_ORIGINS",
    "APISEED_API__V1_PREFIX",
];

/// Sets the given variables for the duration of `f`, clearing the rest.
fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for name in VARS {
        env::remove_var(name);
    }
    for (name, value) in vars {
        env::set_var(name, value);
    }
    let result = f();
    for name in VARS {
        env::remove_var(name);
    }
    result
}

fn settings_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

const NO_FILE: &str = "/nonexistent/apiseed.toml";

#[test]
fn prefixed_variables_override_sections() {
    let settings = with_env(
        &[
            ("APISEED_SERVER__PORT", "9000"),
            ("APISEED_SERVER__HOST", "127.0.0.1"),
            ("APISEED_API__V1_PREFIX", "/v2"),
        ],
        || Settings::load_from(NO_FILE).unwrap(),
    );

    assert_eq!(settings.bind_addr(), "127.0.0.1:9000");
    assert_eq!(settings.api.v1_prefix, "/v2");
}

#[test]
fn cors_origins_parse_as_comma_list() {
    let settings = with_env(
        &[("APISEED_API__CORS_ORIGINS", "https://a.example,https://b.example")],
        || Settings::load_from(NO_FILE).unwrap(),
    );

    assert_eq!(
        settings.api.cors_origins,
        vec!["https://a.example", "https://b.example"]
    );
}

#[test]
fn bare_port_applies_when_nothing_else_sets_it() {
    let settings = with_env(&[("PORT", "9100")], || Settings::load_from(NO_FILE).unwrap());
    assert_eq!(settings.server.port, 9100);
}

#[test]
fn bare_port_ranks_below_file_and_prefixed_variable() {
    let file = settings_file("[server]\nport = 9200\n");

    let from_file = with_env(&[("PORT", "9100")], || {
        Settings::load_from(file.path()).unwrap()
    });
    assert_eq!(from_file.server.port, 9200);

    let from_prefixed = with_env(
        &[("PORT", "9100"), ("APISEED_SERVER__PORT", "9300")],
        || Settings::load_from(file.path()).unwrap(),
    );
    assert_eq!(from_prefixed.server.port, 9300);
}

#[test]
fn invalid_bare_port_is_an_error() {
    let result = with_env(&[("PORT", "eighty")], || Settings::load_from(NO_FILE));
    let err = result.unwrap_err();
    assert!(
        err.to_string().contains("invalid PORT value"),
        "unexpected error: {err:#}"
    );
}
