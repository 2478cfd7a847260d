use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn new(
        email: String,
        username: String,
        display_name: String,
        password_hash: Option<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            email,
            username,
            display_name,
            password_hash,
            is_staff: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}
