use async_trait::async_trait;
use bson::{DateTime, doc, oid::ObjectId};
use invitely_db::models::Invitation;
use mongodb::Database;
use tracing::debug;

use super::base::{BaseDao, DaoResult};
use crate::store::InvitationStore;

pub struct InvitationDao {
    pub base: BaseDao<Invitation>,
}

impl InvitationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Invitation::COLLECTION),
        }
    }
}

#[async_trait]
impl InvitationStore for InvitationDao {
    async fn insert(&self, invitation: Invitation) -> DaoResult<Invitation> {
        let id = self.base.insert_one(&invitation).await?;
        Ok(Invitation {
            id: Some(id),
            ..invitation
        })
    }

    async fn find_by_key(&self, key: &str) -> DaoResult<Option<Invitation>> {
        self.base.find_one(doc! { "key": key }).await
    }

    async fn find_latest(&self, user_id: ObjectId, email: &str) -> DaoResult<Option<Invitation>> {
        self.base
            .find_first(
                doc! { "user_id": user_id, "email": email },
                doc! { "date_invited": -1 },
            )
            .await
    }

    async fn list_by_user(&self, user_id: ObjectId) -> DaoResult<Vec<Invitation>> {
        self.base
            .find_many(
                doc! { "user_id": user_id },
                Some(doc! { "date_invited": -1 }),
            )
            .await
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<bool> {
        self.base.delete_by_id(id).await
    }

    async fn delete_issued_before(&self, cutoff: DateTime) -> DaoResult<u64> {
        let deleted = self
            .base
            .hard_delete(doc! { "date_invited": { "$lte": cutoff } })
            .await?;
        debug!(deleted, %cutoff, "Purged expired invitations");
        Ok(deleted)
    }
}
