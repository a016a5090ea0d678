//! Core data access for userstore.
//! This crate owns the user/product schema and every query that touches it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{connect, open_db, open_db_in_memory, DbConfig, DbError, DbResult, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::{Product, User, UserId};
pub use repo::user_query::{SortOrder, UserField, UserFilter, UserPatch, UserQuery};
pub use repo::user_repo::{
    OptionalRecord, RepoError, RepoResult, SqliteUserRepository, UserRepository,
};
pub use service::user_service::UserService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
