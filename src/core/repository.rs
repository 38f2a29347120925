//! Storage contracts the matcher and the HTTP layer depend on.
//!
//! The matcher only needs [`SkillRepository`] and [`MatchRepository`];
//! [`UserRepository`] exists for registration. [`Store`] bundles all three
//! for the application state.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    MatchRecord, MatchingSnapshot, NewMatchRecord, NewSkillListing, NewUser, SkillDirection, SkillListing, User,
    UserId, UserPair,
};

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Read and write access to skill listings
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Whether `user_id` resolves to a registered user
    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Listings of one direction, in creation order
    async fn list_skills(
        &self,
        user_id: UserId,
        direction: SkillDirection,
    ) -> Result<Vec<SkillListing>, StoreError>;

    /// Every registered user except `excluding`
    async fn list_all_users(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError>;

    /// Profiles of `user_id` and every other user from one consistent read
    ///
    /// Returns `Ok(None)` when `user_id` is not registered.
    async fn load_snapshot(&self, user_id: UserId) -> Result<Option<MatchingSnapshot>, StoreError>;

    async fn insert_skill(&self, skill: NewSkillListing) -> Result<SkillListing, StoreError>;

    /// Delete a listing owned by `owner`
    ///
    /// Returns `Ok(false)` when the skill does not exist and
    /// `Err(StoreError::Conflict)` when it belongs to someone else.
    async fn delete_skill(&self, skill_id: i64, owner: UserId) -> Result<bool, StoreError>;
}

/// Dedup lookups and inserts for match records
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn find_by_unordered_pair(
        &self,
        pair: UserPair,
    ) -> Result<Option<MatchRecord>, StoreError>;

    /// Insert unless a record already exists for the pair
    ///
    /// Returns `Ok(None)` when another writer got there first.
    async fn insert(&self, record: NewMatchRecord) -> Result<Option<MatchRecord>, StoreError>;

    /// Records involving `user_id`, highest percentage first
    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MatchRecord>, StoreError>;
}

/// User registration
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::Conflict` on a taken username or email
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Everything the service needs from a backend
pub trait Store: SkillRepository + MatchRepository + UserRepository {}

impl<T> Store for T where T: SkillRepository + MatchRepository + UserRepository {}
