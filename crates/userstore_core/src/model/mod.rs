//! Entity model for user/product records.
//!
//! # Responsibility
//! - Define the records persisted by core and their table schemas.
//! - Share audit columns (`id`, timestamps, soft-delete marker) across entities.
//!
//! # Invariants
//! - Every entity is identified by a backend-assigned integer id; `0` means unsaved.
//! - Deletion is represented by a `deleted_at` marker, not a physical delete.

pub mod audit;
pub mod product;
pub mod user;

pub use product::Product;
pub use user::{User, UserId};
