//! Declarative table schemas and the "ensure table for entity" executor.
//!
//! # Responsibility
//! - Describe entity tables as static column/index declarations.
//! - Create missing tables, add missing columns and indexes.
//!
//! # Invariants
//! - `auto_migrate` is idempotent: a second run reports no changes.
//! - Existing columns are never dropped or retyped.
//! - Each `auto_migrate` call applies its changes atomically.

use super::{DbError, DbResult};
use crate::model::{Product, User};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// One column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub not_null: bool,
    /// Raw SQL default expression.
    pub default: Option<&'static str>,
}

impl ColumnDef {
    /// Nullable column of the given SQL type.
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            not_null: false,
            default: None,
        }
    }

    /// Auto-incrementing integer surrogate key.
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            sql_type: "INTEGER",
            primary_key: true,
            not_null: true,
            default: None,
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    pub const fn default_value(self, expression: &'static str) -> Self {
        Self {
            default: Some(expression),
            ..self
        }
    }

    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        } else if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }

    fn addable_reason(&self) -> Option<&'static str> {
        if self.primary_key {
            return Some("primary key columns cannot be added to an existing table");
        }
        if self.not_null && self.default.is_none() {
            return Some("NOT NULL columns need a default to be added to an existing table");
        }
        None
    }
}

/// Secondary index over one or more columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Declared shape of one entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
    pub indexes: &'static [IndexDef],
}

impl TableSchema {
    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }

    fn validate_identifiers(&self) -> DbResult<()> {
        let names = std::iter::once(self.table)
            .chain(self.column_names())
            .chain(self.indexes.iter().map(|index| index.name))
            .chain(
                self.indexes
                    .iter()
                    .flat_map(|index| index.columns.iter().copied()),
            );
        for name in names {
            if !IDENTIFIER_RE.is_match(name) {
                return Err(DbError::InvalidIdentifier(name.to_string()));
            }
        }
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ColumnDef::definition)
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n);", self.table, columns)
    }
}

/// What one `auto_migrate` run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created_table: bool,
    pub added_columns: Vec<&'static str>,
    pub created_indexes: Vec<&'static str>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        !self.created_table && self.added_columns.is_empty() && self.created_indexes.is_empty()
    }
}

/// Ensures the table described by `schema` exists with every declared
/// column and index.
///
/// # Errors
/// - `DbError::InvalidIdentifier` when a declared name is not a plain identifier.
/// - `DbError::SchemaConflict` when a missing column cannot be added in place.
pub fn auto_migrate(conn: &Connection, schema: &TableSchema) -> DbResult<MigrationReport> {
    schema.validate_identifiers()?;
    let started_at = Instant::now();

    match migrate_in_tx(conn, schema) {
        Ok(report) => {
            info!(
                "event=schema_migrate module=db status=ok table={} created_table={} added_columns={} created_indexes={} duration_ms={}",
                schema.table,
                report.created_table,
                report.added_columns.len(),
                report.created_indexes.len(),
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=schema_migrate module=db status=error table={} duration_ms={} error={}",
                schema.table,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Ensures every entity table known to core.
pub fn ensure_all(conn: &Connection) -> DbResult<()> {
    auto_migrate(conn, &User::SCHEMA)?;
    auto_migrate(conn, &Product::SCHEMA)?;
    Ok(())
}

fn migrate_in_tx(conn: &Connection, schema: &TableSchema) -> DbResult<MigrationReport> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut report = MigrationReport::default();

    if table_exists(&tx, schema.table)? {
        let existing = table_columns(&tx, schema.table)?;
        for column in schema.columns {
            if existing.iter().any(|name| name == column.name) {
                continue;
            }
            if let Some(reason) = column.addable_reason() {
                return Err(DbError::SchemaConflict {
                    table: schema.table,
                    column: column.name,
                    reason,
                });
            }
            tx.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {};",
                schema.table,
                column.definition()
            ))?;
            report.added_columns.push(column.name);
        }
    } else {
        tx.execute_batch(&schema.create_table_sql())?;
        report.created_table = true;
    }

    for index in schema.indexes {
        if index_exists(&tx, index.name)? {
            continue;
        }
        tx.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
            index.name,
            schema.table,
            index.columns.join(", ")
        ))?;
        report.created_indexes.push(index.name);
    }

    tx.commit()?;
    Ok(report)
}

/// Returns whether a table named `table` exists.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    schema_object_exists(conn, "table", table)
}

fn index_exists(conn: &Connection, index: &str) -> DbResult<bool> {
    schema_object_exists(conn, "index", index)
}

fn schema_object_exists(conn: &Connection, kind: &str, name: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = ?1 AND name = ?2
        );",
        [kind, name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns the column names of `table` in storage order.
///
/// `table` must already be a validated identifier.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
