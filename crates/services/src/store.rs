//! Persistence seams of the invitation workflow.
//!
//! Every service talks to storage through these traits so the same
//! business rules run against MongoDB in production and against
//! [`MemoryStore`](crate::memory::MemoryStore) in tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{DateTime, oid::ObjectId};
use invitely_db::models::{Invitation, InvitationStats, User};
use mongodb::Database;

use crate::dao::{
    base::DaoResult, invitation::InvitationDao, invitation_stats::InvitationStatsDao,
    user::UserDao,
};
use crate::memory::MemoryStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateKey` when the email or username is taken.
    async fn insert(&self, user: User) -> DaoResult<User>;

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User>;

    async fn find_by_email(&self, email: &str) -> DaoResult<User>;

    async fn find_by_username(&self, username: &str) -> DaoResult<User>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Fails with `DuplicateKey` when the key is already in use.
    async fn insert(&self, invitation: Invitation) -> DaoResult<Invitation>;

    async fn find_by_key(&self, key: &str) -> DaoResult<Option<Invitation>>;

    /// Most recently issued invitation from `user_id` to `email`.
    async fn find_latest(&self, user_id: ObjectId, email: &str) -> DaoResult<Option<Invitation>>;

    /// Invitations sent by `user_id`, newest first.
    async fn list_by_user(&self, user_id: ObjectId) -> DaoResult<Vec<Invitation>>;

    async fn delete(&self, id: ObjectId) -> DaoResult<bool>;

    /// Deletes every invitation issued at or before `cutoff`.
    async fn delete_issued_before(&self, cutoff: DateTime) -> DaoResult<u64>;
}

/// Ledger storage. Each mutation is a single atomic check-and-apply.
///
/// Guarded mutations return `Ok(None)` when the guard rejected the change
/// and `Err(DaoError::NotFound)` when the user has no ledger.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn get_or_create(&self, user_id: ObjectId, available: i64) -> DaoResult<InvitationStats>;

    async fn find_by_user(&self, user_id: ObjectId) -> DaoResult<InvitationStats>;

    /// All ledgers, or the single ledger of `user_id`.
    async fn list(&self, user_id: Option<ObjectId>) -> DaoResult<Vec<InvitationStats>>;

    async fn add_available(&self, user_id: ObjectId, count: i64) -> DaoResult<InvitationStats>;

    /// Adds `count` to `sent`. With `consume_available` the change only
    /// applies when `available >= count` and `available` is decremented too.
    async fn use_invitations(
        &self,
        user_id: ObjectId,
        count: i64,
        consume_available: bool,
    ) -> DaoResult<Option<InvitationStats>>;

    /// Adds `count` to `accepted` unless that would exceed `sent`.
    async fn mark_accepted(
        &self,
        user_id: ObjectId,
        count: i64,
    ) -> DaoResult<Option<InvitationStats>>;

    /// Reverts a previous `use_invitations` whose invitation was never stored.
    async fn revert_use(
        &self,
        user_id: ObjectId,
        count: i64,
        restore_available: bool,
    ) -> DaoResult<InvitationStats>;
}

/// The three stores handed to the services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub stats: Arc<dyn StatsStore>,
}

impl Stores {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(UserDao::new(db)),
            invitations: Arc::new(InvitationDao::new(db)),
            stats: Arc::new(InvitationStatsDao::new(db)),
        }
    }

    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            invitations: store.clone(),
            stats: store,
        }
    }
}
