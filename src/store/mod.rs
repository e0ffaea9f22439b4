//! The record store contract the directory service depends on.

use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
mod types;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use types::{NewUser, User, UserStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Durable keyed storage for user records.
///
/// Email uniqueness is enforced here, atomically with the write; callers
/// must not pre-check and rely on it.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All records in (created_at, id) order.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new record; the store assigns the id.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Replace the record with the same id. `NotFound` if it was deleted.
    async fn update(&self, user: User) -> Result<User, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
