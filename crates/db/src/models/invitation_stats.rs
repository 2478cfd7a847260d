use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Per-user invitation quota and usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationStats {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub available: i64,
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub accepted: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl InvitationStats {
    pub const COLLECTION: &'static str = "invitation_stats";

    pub fn new(user_id: ObjectId, available: i64) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            user_id,
            available,
            sent: 0,
            accepted: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
