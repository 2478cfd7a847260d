use std::sync::Arc;

use bson::oid::ObjectId;
use invitely_config::InvitationSettings;
use invitely_db::models::InvitationStats;
use tracing::debug;

use crate::error::{InvitationError, InvitationResult};
use crate::events::{EventBus, InvitationEvent};
use crate::performance::{PerformanceCalculator, StatsSnapshot};
use crate::store::StatsStore;

/// Quota ledger: the only writer of a user's available/sent/accepted counters.
#[derive(Clone)]
pub struct LedgerService {
    stats: Arc<dyn StatsStore>,
    settings: InvitationSettings,
    performance: PerformanceCalculator,
    events: EventBus,
}

fn ensure_positive(count: i64) -> InvitationResult<()> {
    if count < 1 {
        return Err(InvitationError::InvalidArgument(format!(
            "count must be at least 1, got {count}"
        )));
    }
    Ok(())
}

impl LedgerService {
    pub fn new(
        stats: Arc<dyn StatsStore>,
        settings: InvitationSettings,
        performance: PerformanceCalculator,
        events: EventBus,
    ) -> Self {
        Self {
            stats,
            settings,
            performance,
            events,
        }
    }

    pub fn invite_only(&self) -> bool {
        self.settings.invite_only
    }

    /// Creates the ledger of a new user with the initial quota. Existing
    /// ledgers are returned untouched.
    pub async fn open(&self, user_id: ObjectId) -> InvitationResult<InvitationStats> {
        Ok(self
            .stats
            .get_or_create(user_id, self.settings.initial_invitations)
            .await?)
    }

    pub async fn stats(&self, user_id: ObjectId) -> InvitationResult<InvitationStats> {
        Ok(self.stats.find_by_user(user_id).await?)
    }

    pub async fn credit(&self, user_id: ObjectId, count: i64) -> InvitationResult<InvitationStats> {
        ensure_positive(count)?;
        let stats = self.stats.add_available(user_id, count).await?;
        debug!(%user_id, count, available = stats.available, "Invitations added");
        self.events
            .publish(InvitationEvent::InvitationAdded { user_id, count });
        Ok(stats)
    }

    /// Records `count` sent invitations and returns the new `sent` total.
    ///
    /// In invite-only mode the invitations come out of `available` and the
    /// call fails with [`InvitationError::QuotaExceeded`] when there are not
    /// enough left.
    pub async fn debit_on_send(&self, user_id: ObjectId, count: i64) -> InvitationResult<i64> {
        ensure_positive(count)?;
        let stats = self
            .stats
            .use_invitations(user_id, count, self.invite_only())
            .await?
            .ok_or(InvitationError::QuotaExceeded)?;
        Ok(stats.sent)
    }

    /// Records `count` accepted invitations and returns the new `accepted` total.
    pub async fn credit_on_accept(&self, user_id: ObjectId, count: i64) -> InvitationResult<i64> {
        ensure_positive(count)?;
        let stats = self
            .stats
            .mark_accepted(user_id, count)
            .await?
            .ok_or(InvitationError::AcceptanceExceedsSent)?;
        Ok(stats.accepted)
    }

    /// Undoes a `debit_on_send` whose invitation could not be stored.
    pub(crate) async fn refund_send(&self, user_id: ObjectId, count: i64) -> InvitationResult<()> {
        self.stats
            .revert_use(user_id, count, self.invite_only())
            .await?;
        Ok(())
    }

    pub fn score(&self, stats: &InvitationStats) -> f64 {
        self.performance.score(&StatsSnapshot::from(stats))
    }

    pub async fn performance(&self, user_id: ObjectId) -> InvitationResult<f64> {
        let stats = self.stats(user_id).await?;
        Ok(self.score(&stats))
    }
}
