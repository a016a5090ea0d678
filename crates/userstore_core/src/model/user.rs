//! User entity.
//!
//! # Invariants
//! - `id == 0` means the record has not been persisted yet.
//! - `created_at` is written once at insert; `updated_at` on every mutation.
//! - `deleted_at.is_some()` marks a soft-deleted row.

use super::audit;
use crate::db::schema::{ColumnDef, TableSchema};
use serde::{Deserialize, Serialize};

/// Backend-assigned surrogate key of a user row.
pub type UserId = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// No range is enforced.
    pub age: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl User {
    pub const TABLE: &'static str = "users";

    pub const SCHEMA: TableSchema = TableSchema {
        table: Self::TABLE,
        columns: &[
            audit::ID,
            audit::CREATED_AT,
            audit::UPDATED_AT,
            audit::DELETED_AT,
            ColumnDef::new("name", "TEXT").not_null().default_value("''"),
            ColumnDef::new("age", "INTEGER").not_null().default_value("0"),
            ColumnDef::new("is_active", "INTEGER")
                .not_null()
                .default_value("0"),
        ],
        indexes: &[audit::deleted_at_index("idx_users_deleted_at")],
    };

    /// Creates an unsaved, inactive user.
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            age,
            ..Self::default()
        }
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Whether the backend has assigned an id to this record.
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
