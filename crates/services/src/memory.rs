//! In-memory implementation of every store.
//!
//! Suitable for tests and single-process development runs. All state sits
//! behind one mutex, so each trait call is atomic with respect to the
//! others, mirroring the single-document atomicity of the Mongo DAOs.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{DateTime, oid::ObjectId};
use invitely_db::models::{Invitation, InvitationStats, User};
use parking_lot::Mutex;

use crate::dao::base::{DaoError, DaoResult};
use crate::store::{InvitationStore, StatsStore, UserStore};

#[derive(Default)]
struct State {
    users: HashMap<ObjectId, User>,
    invitations: HashMap<ObjectId, Invitation>,
    stats: HashMap<ObjectId, InvitationStats>,
}

impl State {
    fn stats_mut(&mut self, user_id: ObjectId) -> DaoResult<&mut InvitationStats> {
        self.stats.get_mut(&user_id).ok_or(DaoError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an invitation verbatim, keeping its `date_invited`.
    pub fn put_invitation(&self, invitation: Invitation) -> Invitation {
        let id = invitation.id.unwrap_or_else(ObjectId::new);
        let invitation = Invitation {
            id: Some(id),
            ..invitation
        };
        self.state.lock().invitations.insert(id, invitation.clone());
        invitation
    }

    pub fn invitation_count(&self) -> usize {
        self.state.lock().invitations.len()
    }
}

fn touch(stats: &mut InvitationStats) -> InvitationStats {
    stats.updated_at = DateTime::now();
    stats.clone()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> DaoResult<User> {
        let mut state = self.state.lock();
        if state.users.values().any(|u| u.email == user.email) {
            return Err(DaoError::DuplicateKey(format!("email {}", user.email)));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DaoError::DuplicateKey(format!("username {}", user.username)));
        }
        let id = ObjectId::new();
        let user = User {
            id: Some(id),
            ..user
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.state
            .lock()
            .users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.username == username && u.deleted_at.is_none())
            .cloned()
            .ok_or(DaoError::NotFound)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn insert(&self, invitation: Invitation) -> DaoResult<Invitation> {
        let mut state = self.state.lock();
        if state.invitations.values().any(|i| i.key == invitation.key) {
            return Err(DaoError::DuplicateKey(format!("key {}", invitation.key)));
        }
        let id = invitation.id.unwrap_or_else(ObjectId::new);
        let invitation = Invitation {
            id: Some(id),
            ..invitation
        };
        state.invitations.insert(id, invitation.clone());
        Ok(invitation)
    }

    async fn find_by_key(&self, key: &str) -> DaoResult<Option<Invitation>> {
        Ok(self
            .state
            .lock()
            .invitations
            .values()
            .find(|i| i.key == key)
            .cloned())
    }

    async fn find_latest(&self, user_id: ObjectId, email: &str) -> DaoResult<Option<Invitation>> {
        Ok(self
            .state
            .lock()
            .invitations
            .values()
            .filter(|i| i.user_id == user_id && i.email == email)
            .max_by_key(|i| i.date_invited)
            .cloned())
    }

    async fn list_by_user(&self, user_id: ObjectId) -> DaoResult<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .state
            .lock()
            .invitations
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.date_invited.cmp(&a.date_invited));
        Ok(invitations)
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<bool> {
        Ok(self.state.lock().invitations.remove(&id).is_some())
    }

    async fn delete_issued_before(&self, cutoff: DateTime) -> DaoResult<u64> {
        let mut state = self.state.lock();
        let before = state.invitations.len();
        state.invitations.retain(|_, i| i.date_invited > cutoff);
        Ok((before - state.invitations.len()) as u64)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn get_or_create(&self, user_id: ObjectId, available: i64) -> DaoResult<InvitationStats> {
        let mut state = self.state.lock();
        let stats = state.stats.entry(user_id).or_insert_with(|| InvitationStats {
            id: Some(ObjectId::new()),
            ..InvitationStats::new(user_id, available)
        });
        Ok(stats.clone())
    }

    async fn find_by_user(&self, user_id: ObjectId) -> DaoResult<InvitationStats> {
        self.state
            .lock()
            .stats
            .get(&user_id)
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn list(&self, user_id: Option<ObjectId>) -> DaoResult<Vec<InvitationStats>> {
        let state = self.state.lock();
        let mut stats: Vec<InvitationStats> = state
            .stats
            .values()
            .filter(|s| user_id.is_none_or(|id| s.user_id == id))
            .cloned()
            .collect();
        stats.sort_by(|a, b| b.user_id.cmp(&a.user_id));
        Ok(stats)
    }

    async fn add_available(&self, user_id: ObjectId, count: i64) -> DaoResult<InvitationStats> {
        let mut state = self.state.lock();
        let stats = state.stats_mut(user_id)?;
        stats.available += count;
        Ok(touch(stats))
    }

    async fn use_invitations(
        &self,
        user_id: ObjectId,
        count: i64,
        consume_available: bool,
    ) -> DaoResult<Option<InvitationStats>> {
        let mut state = self.state.lock();
        let stats = state.stats_mut(user_id)?;
        if consume_available {
            if stats.available < count {
                return Ok(None);
            }
            stats.available -= count;
        }
        stats.sent += count;
        Ok(Some(touch(stats)))
    }

    async fn mark_accepted(
        &self,
        user_id: ObjectId,
        count: i64,
    ) -> DaoResult<Option<InvitationStats>> {
        let mut state = self.state.lock();
        let stats = state.stats_mut(user_id)?;
        if stats.accepted + count > stats.sent {
            return Ok(None);
        }
        stats.accepted += count;
        Ok(Some(touch(stats)))
    }

    async fn revert_use(
        &self,
        user_id: ObjectId,
        count: i64,
        restore_available: bool,
    ) -> DaoResult<InvitationStats> {
        let mut state = self.state.lock();
        let stats = state.stats_mut(user_id)?;
        if restore_available {
            stats.available += count;
        }
        stats.sent -= count;
        Ok(touch(stats))
    }
}
