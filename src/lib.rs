//! apiseed - a layered REST API scaffold
//!
//! The crate provides:
//! - Settings loaded from `config.toml` plus `APISEED_*` environment variables
//! - Pluggable resource routers composed under a versioned prefix
//! - A two-tier error taxonomy mapped onto HTTP statuses
//! - JSON record tables on local disk or in memory, with schema migrations

pub mod api;
pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;

pub use error::{DataError, Error, Result};
