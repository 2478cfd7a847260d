use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use invitely_db::models::User;
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};
use crate::store::UserStore;

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }
}

#[async_trait]
impl UserStore for UserDao {
    async fn insert(&self, user: User) -> DaoResult<User> {
        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.base
            .find_one(doc! { "_id": id, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "username": username, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }
}
