//! User use-case service.
//!
//! # Responsibility
//! - Provide single-user entry points on top of the repository contract.
//! - Decide which repository outcomes are normal results (missing rows)
//!   and which are failures.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::user::{User, UserId};
use crate::repo::user_query::{SortOrder, UserField, UserFilter, UserPatch};
use crate::repo::user_repo::{OptionalRecord, RepoResult, UserRepository};

/// Use-case service wrapper for user operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates an inactive user and returns the stored record.
    pub fn register(&self, name: impl Into<String>, age: i64) -> RepoResult<User> {
        let mut user = User::new(name, age);
        self.repo.create(&mut user)?;
        Ok(user)
    }

    /// Creates all users atomically and returns them with assigned ids.
    pub fn register_many(&self, mut users: Vec<User>) -> RepoResult<Vec<User>> {
        self.repo.create_many(&mut users)?;
        Ok(users)
    }

    /// Gets one visible user; a missing or deleted row yields `None`.
    pub fn lookup(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.find_by_id(id).optional()
    }

    /// Lowest and highest id among visible users, or `None` when there are none.
    pub fn first_and_last(&self) -> RepoResult<Option<(User, User)>> {
        let Some(first) = self.repo.find_first(SortOrder::Ascending).optional()? else {
            return Ok(None);
        };
        let last = self.repo.find_first(SortOrder::Descending)?;
        Ok(Some((first, last)))
    }

    pub fn list_active(&self) -> RepoResult<Vec<User>> {
        self.repo.find_all()
    }

    /// Persists every column of `user`. Returns `false` when the row is gone.
    pub fn store(&self, user: &mut User) -> RepoResult<bool> {
        Ok(self.repo.save(user)? > 0)
    }

    /// Returns `false` when no visible user has this id.
    pub fn rename(&self, id: UserId, name: impl Into<String>) -> RepoResult<bool> {
        let changed = self
            .repo
            .update_field(&UserFilter::by_id(id), UserField::Name(name.into()))?;
        Ok(changed > 0)
    }

    /// Sets the flag explicitly, including `false`.
    pub fn set_active(&self, id: UserId, is_active: bool) -> RepoResult<bool> {
        let changed = self
            .repo
            .update_field(&UserFilter::by_id(id), UserField::IsActive(is_active))?;
        Ok(changed > 0)
    }

    pub fn apply_patch(&self, id: UserId, patch: &UserPatch) -> RepoResult<bool> {
        Ok(self.repo.update_partial(&UserFilter::by_id(id), patch)? > 0)
    }

    /// Soft-deletes one user. Returns `false` when it was already gone.
    pub fn remove(&self, id: UserId) -> RepoResult<bool> {
        Ok(self.repo.soft_delete(&UserFilter::by_id(id))? > 0)
    }
}
