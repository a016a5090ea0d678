//! Connection string parsing.
//!
//! Format: `<target>[?key=value&key=value...]` where `target` is a file path
//! (optionally prefixed with `sqlite://`) or `:memory:`.

use super::{DbError, DbResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const SQLITE_SCHEME: &str = "sqlite://";
const MEMORY_TARGET: &str = ":memory:";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// SQLite takes the busy timeout as a C `int` of milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Where a connection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    File(PathBuf),
    Memory,
}

/// Options parsed from one connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub target: DbTarget,
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
    /// Ensure the `users` and `products` tables on connect.
    pub auto_migrate: bool,
}

impl DbConfig {
    /// Config for a file database with default options.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_target(DbTarget::File(path.into()))
    }

    /// Config for a private in-memory database with default options.
    pub fn memory() -> Self {
        Self::with_target(DbTarget::Memory)
    }

    fn with_target(target: DbTarget) -> Self {
        Self {
            target,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            foreign_keys: true,
            auto_migrate: false,
        }
    }

    /// Parses a connection string.
    ///
    /// # Errors
    /// - Empty target, unknown keys, malformed values, non-UTF-8 charsets and
    ///   `parse_time=false` all return `DbError::InvalidConfig`.
    pub fn parse(dsn: &str) -> DbResult<Self> {
        let trimmed = dsn.trim();
        let without_scheme = trimmed.strip_prefix(SQLITE_SCHEME).unwrap_or(trimmed);
        let (target_text, options) = match without_scheme.split_once('?') {
            Some((target, options)) => (target, Some(options)),
            None => (without_scheme, None),
        };

        let target = match target_text.trim() {
            "" => return Err(DbError::InvalidConfig("target cannot be empty".to_string())),
            MEMORY_TARGET => DbTarget::Memory,
            path => DbTarget::File(PathBuf::from(path)),
        };

        let mut config = Self::with_target(target);
        let Some(options) = options else {
            return Ok(config);
        };

        for pair in options.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                DbError::InvalidConfig(format!("option `{pair}` is missing a value"))
            })?;

            match key {
                "charset" => check_charset(value)?,
                "busy_timeout_ms" => {
                    let millis = value
                        .parse::<u64>()
                        .ok()
                        .filter(|millis| *millis <= MAX_BUSY_TIMEOUT_MS)
                        .ok_or_else(|| {
                            DbError::InvalidConfig(format!(
                                "busy_timeout_ms must be an integer in 0..={MAX_BUSY_TIMEOUT_MS}, got `{value}`"
                            ))
                        })?;
                    config.busy_timeout = Duration::from_millis(millis);
                }
                "foreign_keys" => config.foreign_keys = parse_flag(key, value)?,
                "auto_migrate" => config.auto_migrate = parse_flag(key, value)?,
                "parse_time" | "parseTime" => {
                    if !parse_flag(key, value)? {
                        return Err(DbError::InvalidConfig(
                            "timestamps are always decoded natively; parse_time=false is unsupported"
                                .to_string(),
                        ));
                    }
                }
                other => {
                    return Err(DbError::InvalidConfig(format!("unknown option `{other}`")));
                }
            }
        }

        Ok(config)
    }
}

impl FromStr for DbConfig {
    type Err = DbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn check_charset(value: &str) -> DbResult<()> {
    match value.to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" | "utf8mb4" => Ok(()),
        other => Err(DbError::InvalidConfig(format!(
            "unsupported charset `{other}`; expected utf8|utf-8|utf8mb4"
        ))),
    }
}

fn parse_flag(key: &str, value: &str) -> DbResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(DbError::InvalidConfig(format!(
            "option `{key}` expects true|false, got `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{DbConfig, DbTarget};
    use crate::db::DbError;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn parse_plain_path_uses_defaults() {
        let config = DbConfig::parse("data/users.db").unwrap();
        assert_eq!(config.target, DbTarget::File(PathBuf::from("data/users.db")));
        assert_eq!(config.busy_timeout, Duration::from_millis(5_000));
        assert!(config.foreign_keys);
        assert!(!config.auto_migrate);
    }

    #[test]
    fn parse_memory_with_options() {
        let config = DbConfig::parse(
            "sqlite://:memory:?charset=utf8mb4&parseTime=true&busy_timeout_ms=250&auto_migrate=true",
        )
        .unwrap();
        assert_eq!(config.target, DbTarget::Memory);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.auto_migrate);
    }

    #[test]
    fn parse_rejects_empty_target() {
        let err = DbConfig::parse("?charset=utf8").unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(message) if message.contains("empty")));
    }

    #[test]
    fn parse_rejects_unknown_option_and_bad_values() {
        assert!(matches!(
            DbConfig::parse("a.db?host=127.0.0.1"),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            DbConfig::parse("a.db?charset=latin1"),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            DbConfig::parse("a.db?busy_timeout_ms=-1"),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            DbConfig::parse("a.db?busy_timeout_ms=3000000000"),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            DbConfig::parse("a.db?foreign_keys=maybe"),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            DbConfig::parse("a.db?charset"),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn busy_timeout_accepts_largest_sqlite_value() {
        let config = DbConfig::parse("a.db?busy_timeout_ms=2147483647").unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(2_147_483_647));
    }

    #[test]
    fn parse_time_false_is_rejected() {
        let err = DbConfig::parse("a.db?parse_time=false").unwrap_err();
        assert!(err.to_string().contains("parse_time"));
    }

    #[test]
    fn from_str_matches_parse() {
        let parsed: DbConfig = "users.db?foreign_keys=false".parse().unwrap();
        assert!(!parsed.foreign_keys);
    }
}
