//! Service layer between HTTP handlers and repositories
//!
//! Services validate payloads, call repositories and log failures before
//! handing them back to the caller.

pub mod logs;
pub mod users;

pub use logs::DataLogService;
pub use users::UserService;
