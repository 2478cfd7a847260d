use bson::{DateTime, oid::ObjectId};
use chrono::{NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// An invitation sent by `user_id` to `email`.
///
/// Records are written once and never updated. Validity is derived from
/// `date_invited` and the configured expiry window, there is no stored
/// status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub email: String,
    pub key: String,
    pub date_invited: DateTime,
}

impl Invitation {
    pub const COLLECTION: &'static str = "invitations";
    pub const KEY_LENGTH: usize = 40;

    pub fn new(user_id: ObjectId, email: String, key: String) -> Self {
        Self {
            id: None,
            user_id,
            email,
            key,
            date_invited: DateTime::now(),
        }
    }

    pub fn expires_at(&self, expire_days: i64) -> chrono::DateTime<Utc> {
        let issued = self.date_invited.to_chrono();
        TimeDelta::try_days(expire_days)
            .and_then(|window| issued.checked_add_signed(window))
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_valid_at(&self, now: chrono::DateTime<Utc>, expire_days: i64) -> bool {
        now < self.expires_at(expire_days)
    }

    pub fn is_valid(&self, expire_days: i64) -> bool {
        self.is_valid_at(Utc::now(), expire_days)
    }

    pub fn expiration_date(&self, expire_days: i64) -> NaiveDate {
        self.expires_at(expire_days).date_naive()
    }
}

/// Invitations issued at or before the returned instant are expired at `now`.
pub fn expiry_cutoff(now: chrono::DateTime<Utc>, expire_days: i64) -> chrono::DateTime<Utc> {
    TimeDelta::try_days(expire_days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC)
}
