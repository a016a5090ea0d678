//! Product entity. Declared for schema creation only.

use super::audit;
use crate::db::schema::{ColumnDef, TableSchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub price: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Product {
    pub const TABLE: &'static str = "products";

    pub const SCHEMA: TableSchema = TableSchema {
        table: Self::TABLE,
        columns: &[
            audit::ID,
            audit::CREATED_AT,
            audit::UPDATED_AT,
            audit::DELETED_AT,
            ColumnDef::new("code", "TEXT").not_null().default_value("''"),
            ColumnDef::new("price", "INTEGER").not_null().default_value("0"),
        ],
        indexes: &[audit::deleted_at_index("idx_products_deleted_at")],
    };
}
