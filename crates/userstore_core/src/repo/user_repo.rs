//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over canonical `users` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every read and write path excludes soft-deleted rows unless the caller
//!   asks for them through `UserQuery::include_deleted`.
//! - Bulk mutations refuse an unconstrained filter.
//! - Entities are only updated in memory after the write has succeeded.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::schema::{table_columns, table_exists};
use crate::db::DbError;
use crate::model::audit::now_epoch_ms;
use crate::model::user::{User, UserId};
use crate::repo::user_query::{
    push_visibility, SortOrder, UserField, UserFilter, UserPatch, UserQuery,
};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    age,
    is_active,
    created_at,
    updated_at,
    deleted_at
FROM users";

const USER_INSERT_SQL: &str = "INSERT INTO users (
    id,
    name,
    age,
    is_active,
    created_at,
    updated_at,
    deleted_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?5, NULL);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// No visible row matched a single-result query.
    NotFound(String),
    /// Backend failure: connectivity, constraint or SQL error.
    Db(DbError),
    /// Caller input was rejected before reaching the backend.
    Validation(String),
    /// Bulk update/delete without conditions and without `UserFilter::all()`.
    MissingFilter,
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(lookup) => write!(f, "user not found: {lookup}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "invalid request: {message}"),
            Self::MissingFilter => write!(
                f,
                "refusing to update or delete every user without an explicit all-rows filter"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column missing: {table}.{column}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::Validation(_)
            | Self::MissingFilter
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Turns `RepoError::NotFound` into `Ok(None)` for callers that treat a
/// missing row as a normal outcome.
pub trait OptionalRecord<T> {
    fn optional(self) -> RepoResult<Option<T>>;
}

impl<T> OptionalRecord<T> for RepoResult<T> {
    fn optional(self) -> RepoResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    /// Inserts one user and writes the assigned id and timestamps back.
    /// Returns the number of inserted rows.
    fn create(&self, user: &mut User) -> RepoResult<usize>;
    /// Inserts every user in one transaction; nothing is written on failure.
    fn create_many(&self, users: &mut [User]) -> RepoResult<usize>;
    fn find_by_id(&self, id: UserId) -> RepoResult<User>;
    /// First visible user by id in the given direction.
    fn find_first(&self, order: SortOrder) -> RepoResult<User>;
    /// Any one visible user, no ordering guarantee.
    fn take(&self) -> RepoResult<User>;
    /// All visible users by ascending id. Empty when nothing matches.
    fn find_all(&self) -> RepoResult<Vec<User>>;
    fn find(&self, query: &UserQuery) -> RepoResult<Vec<User>>;
    /// First match of `query`; `NotFound` when empty.
    fn find_one(&self, query: &UserQuery) -> RepoResult<User>;
    fn count(&self, query: &UserQuery) -> RepoResult<u64>;
    /// Creates unsaved users, otherwise rewrites name/age/is_active of the
    /// matching visible row. Returns 0 when that row is gone.
    fn save(&self, user: &mut User) -> RepoResult<usize>;
    fn update_field(&self, filter: &UserFilter, field: UserField) -> RepoResult<usize>;
    /// Writes only the fields present in `patch`.
    fn update_partial(&self, filter: &UserFilter, patch: &UserPatch) -> RepoResult<usize>;
    /// Marks matching visible rows as deleted. Matching nothing is not an error.
    fn soft_delete(&self, filter: &UserFilter) -> RepoResult<usize>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a connection whose `users` schema has
    /// been ensured.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_user_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_users(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_columns(
        &self,
        event: &str,
        filter: &UserFilter,
        fields: &[UserField],
    ) -> RepoResult<usize> {
        if !filter.permits_mutation() {
            return Err(RepoError::MissingFilter);
        }

        let mut sql = String::from("UPDATE users SET ");
        let mut bind_values = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            sql.push_str(field.column());
            sql.push_str(" = ?, ");
            bind_values.push(field.to_value());
        }
        sql.push_str("updated_at = ? WHERE 1 = 1");
        bind_values.push(Value::Integer(now_epoch_ms()));
        push_visibility(&mut sql, false);
        filter.push_conditions(&mut sql, &mut bind_values);

        let changed = self.execute_logged(event, &sql, bind_values)?;
        debug!(
            "event={event} module=repo status=ok columns={} rows={changed}",
            fields.len()
        );
        Ok(changed)
    }

    fn execute_logged(&self, event: &str, sql: &str, bind_values: Vec<Value>) -> RepoResult<usize> {
        self.conn
            .execute(sql, params_from_iter(bind_values))
            .map_err(|err| {
                error!("event={event} module=repo status=error error={err}");
                RepoError::from(err)
            })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, user: &mut User) -> RepoResult<usize> {
        let now = now_epoch_ms();
        let id = insert_user(self.conn, user, now).map_err(|err| {
            error!("event=user_create module=repo status=error error={err}");
            err
        })?;

        user.id = id;
        user.created_at = now;
        user.updated_at = now;
        user.deleted_at = None;
        debug!("event=user_create module=repo status=ok id={id}");
        Ok(1)
    }

    fn create_many(&self, users: &mut [User]) -> RepoResult<usize> {
        if users.is_empty() {
            return Ok(0);
        }

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(users.len());
        for user in users.iter() {
            match insert_user(&tx, user, now) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    error!(
                        "event=user_create_many module=repo status=error inserted_before_failure={} error={err}",
                        ids.len()
                    );
                    return Err(err);
                }
            }
        }
        tx.commit()?;

        for (user, id) in users.iter_mut().zip(ids) {
            user.id = id;
            user.created_at = now;
            user.updated_at = now;
            user.deleted_at = None;
        }
        debug!(
            "event=user_create_many module=repo status=ok rows={}",
            users.len()
        );
        Ok(users.len())
    }

    fn find_by_id(&self, id: UserId) -> RepoResult<User> {
        self.find_one(&UserQuery::new(UserFilter::by_id(id)))
            .map_err(|err| match err {
                RepoError::NotFound(_) => RepoError::NotFound(format!("id={id}")),
                other => other,
            })
    }

    fn find_first(&self, order: SortOrder) -> RepoResult<User> {
        self.find_one(&UserQuery::default().ordered(order))
    }

    fn take(&self) -> RepoResult<User> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        push_visibility(&mut sql, false);
        sql.push_str(" LIMIT 1");

        self.query_users(&sql, Vec::new())?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound("no visible users".to_string()))
    }

    fn find_all(&self) -> RepoResult<Vec<User>> {
        self.find(&UserQuery::default())
    }

    fn find(&self, query: &UserQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        query.push_where(&mut sql, &mut bind_values);
        query.push_order_and_page(&mut sql, &mut bind_values);
        self.query_users(&sql, bind_values)
    }

    fn find_one(&self, query: &UserQuery) -> RepoResult<User> {
        let single = UserQuery {
            limit: Some(1),
            ..query.clone()
        };
        self.find(&single)?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound("no user matched query".to_string()))
    }

    fn count(&self, query: &UserQuery) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM users WHERE 1 = 1");
        let mut bind_values = Vec::new();
        query.push_where(&mut sql, &mut bind_values);

        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn save(&self, user: &mut User) -> RepoResult<usize> {
        if !user.has_identity() {
            return self.create(user);
        }

        let now = now_epoch_ms();
        let mut sql = String::from(
            "UPDATE users
             SET
                name = ?,
                age = ?,
                is_active = ?,
                updated_at = ?
             WHERE id = ?",
        );
        push_visibility(&mut sql, false);
        let bind_values = vec![
            Value::Text(user.name.clone()),
            Value::Integer(user.age),
            Value::Integer(i64::from(user.is_active)),
            Value::Integer(now),
            Value::Integer(user.id),
        ];

        let changed = self.execute_logged("user_save", &sql, bind_values)?;
        if changed > 0 {
            user.updated_at = now;
        }
        debug!(
            "event=user_save module=repo status=ok id={} rows={changed}",
            user.id
        );
        Ok(changed)
    }

    fn update_field(&self, filter: &UserFilter, field: UserField) -> RepoResult<usize> {
        self.update_columns("user_update_field", filter, &[field])
    }

    fn update_partial(&self, filter: &UserFilter, patch: &UserPatch) -> RepoResult<usize> {
        if patch.is_empty() {
            return Err(RepoError::Validation(
                "partial update needs at least one field".to_string(),
            ));
        }
        self.update_columns("user_update_partial", filter, &patch.fields())
    }

    fn soft_delete(&self, filter: &UserFilter) -> RepoResult<usize> {
        if !filter.permits_mutation() {
            return Err(RepoError::MissingFilter);
        }

        let mut sql = String::from("UPDATE users SET deleted_at = ? WHERE 1 = 1");
        let mut bind_values = vec![Value::Integer(now_epoch_ms())];
        push_visibility(&mut sql, false);
        filter.push_conditions(&mut sql, &mut bind_values);

        let changed = self.execute_logged("user_soft_delete", &sql, bind_values)?;
        debug!("event=user_soft_delete module=repo status=ok rows={changed}");
        Ok(changed)
    }
}

/// Inserts one row and returns its id. An id already set on `user` is kept,
/// so inserting a duplicate id fails with a constraint error.
fn insert_user(conn: &Connection, user: &User, now: i64) -> RepoResult<UserId> {
    let mut stmt = conn.prepare_cached(USER_INSERT_SQL)?;
    stmt.execute(params![
        user.has_identity().then_some(user.id),
        user.name.as_str(),
        user.age,
        user.is_active,
        now,
    ])?;
    Ok(conn.last_insert_rowid())
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in users.is_active"
            )));
        }
    };

    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        age: row.get("age")?,
        is_active,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn ensure_user_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, User::TABLE)? {
        return Err(RepoError::MissingRequiredTable(User::TABLE));
    }

    let existing = table_columns(conn, User::TABLE)?;
    for column in User::SCHEMA.column_names() {
        if !existing.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: User::TABLE,
                column,
            });
        }
    }

    Ok(())
}
