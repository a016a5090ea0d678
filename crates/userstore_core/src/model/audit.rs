//! Audit columns shared by every entity table.
//!
//! All timestamps are Unix epoch milliseconds.

use crate::db::schema::{ColumnDef, IndexDef};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ID: ColumnDef = ColumnDef::primary_key("id");
pub const CREATED_AT: ColumnDef = ColumnDef::new("created_at", "INTEGER")
    .not_null()
    .default_value("0");
pub const UPDATED_AT: ColumnDef = ColumnDef::new("updated_at", "INTEGER")
    .not_null()
    .default_value("0");
/// Soft-delete marker. `NULL` means the row is live.
pub const DELETED_AT: ColumnDef = ColumnDef::new("deleted_at", "INTEGER");

/// Builds the conventional `idx_<table>_deleted_at` index declaration.
pub const fn deleted_at_index(name: &'static str) -> IndexDef {
    IndexDef {
        name,
        columns: &["deleted_at"],
    }
}

/// Current wall-clock time in epoch milliseconds.
///
/// Clocks set before 1970 collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::now_epoch_ms;

    #[test]
    fn now_is_after_2020() {
        assert!(now_epoch_ms() > 1_577_836_800_000);
    }
}
