//! Filter, query and patch inputs for user repository calls.
//!
//! # Invariants
//! - Every value reaches SQL as a bound parameter; only fixed column names are
//!   interpolated.
//! - The soft-delete predicate is produced by `push_visibility` and nowhere else.

use crate::model::user::{User, UserId};
use rusqlite::types::Value;

/// Row ordering by primary key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Row selection for reads and bulk mutations.
///
/// Conditions are AND-ed. A filter with no conditions matches every row, but
/// mutations only accept it when built with [`UserFilter::all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// `Some(vec![])` matches nothing.
    pub ids: Option<Vec<UserId>>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    /// Explicit opt-in for mutating every row.
    pub all: bool,
}

impl UserFilter {
    pub fn by_id(id: UserId) -> Self {
        Self::by_ids([id])
    }

    pub fn by_ids(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Matches every row and permits global updates/deletes.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn has_conditions(&self) -> bool {
        self.ids.is_some() || self.name.is_some() || self.is_active.is_some()
    }

    /// Whether a bulk mutation may run with this filter.
    pub(crate) fn permits_mutation(&self) -> bool {
        self.all || self.has_conditions()
    }

    /// Appends ` AND ...` conditions and their bind values.
    pub(crate) fn push_conditions(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(ids) = &self.ids {
            if ids.is_empty() {
                sql.push_str(" AND 0 = 1");
            } else {
                let placeholders = vec!["?"; ids.len()].join(", ");
                sql.push_str(&format!(" AND id IN ({placeholders})"));
                bind_values.extend(ids.iter().copied().map(Value::Integer));
            }
        }

        if let Some(name) = &self.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        if let Some(is_active) = self.is_active {
            sql.push_str(" AND is_active = ?");
            bind_values.push(Value::Integer(i64::from(is_active)));
        }
    }
}

/// Listing options for multi-row reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub filter: UserFilter,
    /// Also return soft-deleted rows.
    pub include_deleted: bool,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl UserQuery {
    pub fn new(filter: UserFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Appends the WHERE tail (after `WHERE 1 = 1`) for this query.
    pub(crate) fn push_where(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        push_visibility(sql, self.include_deleted);
        self.filter.push_conditions(sql, bind_values);
    }

    /// Appends ORDER BY and pagination.
    pub(crate) fn push_order_and_page(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        sql.push_str(&format!(" ORDER BY id {}", self.order.sql()));

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Appends the soft-delete predicate unless deleted rows were requested.
pub(crate) fn push_visibility(sql: &mut String, include_deleted: bool) {
    if !include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
}

/// One assignable user column with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserField {
    Name(String),
    Age(i64),
    IsActive(bool),
}

impl UserField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Age(_) => "age",
            Self::IsActive(_) => "is_active",
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            Self::Name(name) => Value::Text(name.clone()),
            Self::Age(age) => Value::Integer(*age),
            Self::IsActive(is_active) => Value::Integer(i64::from(*is_active)),
        }
    }
}

/// Partial update. `None` leaves a column untouched; `Some` is always
/// written, including zero values such as `age = 0` or `is_active = false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Builds a patch from the non-zero fields of `user`.
    ///
    /// Empty names, `age == 0` and `is_active == false` are left out, so this
    /// form cannot reset a column to its zero value. Build the patch field by
    /// field when that is needed.
    pub fn non_zero_fields_of(user: &User) -> Self {
        Self {
            name: (!user.name.is_empty()).then(|| user.name.clone()),
            age: (user.age != 0).then_some(user.age),
            is_active: user.is_active.then_some(true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.is_active.is_none()
    }

    /// Fields to write, in column order.
    pub fn fields(&self) -> Vec<UserField> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(UserField::Name(name.clone()));
        }
        if let Some(age) = self.age {
            fields.push(UserField::Age(age));
        }
        if let Some(is_active) = self.is_active {
            fields.push(UserField::IsActive(is_active));
        }
        fields
    }
}
