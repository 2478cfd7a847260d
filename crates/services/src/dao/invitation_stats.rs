use async_trait::async_trait;
use bson::{DateTime, Document, doc, oid::ObjectId};
use invitely_db::models::InvitationStats;
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};
use crate::store::StatsStore;

/// Ledger collection. Counter changes are `$inc` updates whose guard is
/// part of the filter, so the check and the write happen in one
/// server-side operation.
pub struct InvitationStatsDao {
    pub base: BaseDao<InvitationStats>,
}

impl InvitationStatsDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, InvitationStats::COLLECTION),
        }
    }

    async fn increment(
        &self,
        filter: Document,
        inc: Document,
    ) -> DaoResult<Option<InvitationStats>> {
        self.base
            .find_one_and_update(
                filter,
                doc! {
                    "$inc": inc,
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await
    }

    /// Distinguishes a rejected guard from a missing ledger.
    async fn guarded(
        &self,
        user_id: ObjectId,
        updated: Option<InvitationStats>,
    ) -> DaoResult<Option<InvitationStats>> {
        match updated {
            Some(stats) => Ok(Some(stats)),
            None => self.find_by_user(user_id).await.map(|_| None),
        }
    }
}

#[async_trait]
impl StatsStore for InvitationStatsDao {
    async fn get_or_create(&self, user_id: ObjectId, available: i64) -> DaoResult<InvitationStats> {
        let now = DateTime::now();
        self.base
            .upsert_one(
                doc! { "user_id": user_id },
                doc! {
                    "$setOnInsert": {
                        "available": available,
                        "sent": 0_i64,
                        "accepted": 0_i64,
                        "created_at": now,
                        "updated_at": now,
                    }
                },
            )
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn find_by_user(&self, user_id: ObjectId) -> DaoResult<InvitationStats> {
        self.base
            .find_one(doc! { "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn list(&self, user_id: Option<ObjectId>) -> DaoResult<Vec<InvitationStats>> {
        let filter = match user_id {
            Some(user_id) => doc! { "user_id": user_id },
            None => doc! {},
        };
        self.base.find_many(filter, Some(doc! { "user_id": -1 })).await
    }

    async fn add_available(&self, user_id: ObjectId, count: i64) -> DaoResult<InvitationStats> {
        self.increment(doc! { "user_id": user_id }, doc! { "available": count })
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn use_invitations(
        &self,
        user_id: ObjectId,
        count: i64,
        consume_available: bool,
    ) -> DaoResult<Option<InvitationStats>> {
        let updated = if consume_available {
            self.increment(
                doc! { "user_id": user_id, "available": { "$gte": count } },
                doc! { "available": -count, "sent": count },
            )
            .await?
        } else {
            self.increment(doc! { "user_id": user_id }, doc! { "sent": count })
                .await?
        };
        self.guarded(user_id, updated).await
    }

    async fn mark_accepted(
        &self,
        user_id: ObjectId,
        count: i64,
    ) -> DaoResult<Option<InvitationStats>> {
        let updated = self
            .increment(
                doc! {
                    "user_id": user_id,
                    "$expr": { "$lte": [ { "$add": ["$accepted", count] }, "$sent" ] },
                },
                doc! { "accepted": count },
            )
            .await?;
        self.guarded(user_id, updated).await
    }

    async fn revert_use(
        &self,
        user_id: ObjectId,
        count: i64,
        restore_available: bool,
    ) -> DaoResult<InvitationStats> {
        let inc = if restore_available {
            doc! { "available": count, "sent": -count }
        } else {
            doc! { "sent": -count }
        };
        self.increment(doc! { "user_id": user_id }, inc)
            .await?
            .ok_or(DaoError::NotFound)
    }
}
