use std::fmt;
use std::sync::Arc;

use bson::oid::ObjectId;
use invitely_db::models::InvitationStats;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{InvitationError, InvitationResult};
use crate::ledger::LedgerService;
use crate::store::StatsStore;

/// Which ledgers a grant runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardScope {
    All,
    User(ObjectId),
}

impl RewardScope {
    fn user_id(self) -> Option<ObjectId> {
        match self {
            RewardScope::All => None,
            RewardScope::User(id) => Some(id),
        }
    }
}

impl From<Option<ObjectId>> for RewardScope {
    fn from(user_id: Option<ObjectId>) -> Self {
        user_id.map_or(RewardScope::All, RewardScope::User)
    }
}

pub type GrantFn = Arc<dyn Fn(&InvitationStats) -> i64 + Send + Sync>;

/// How many invitations each ledger in scope receives.
#[derive(Clone)]
pub enum Grant {
    Fixed(i64),
    /// Resolved per ledger. Amounts `<= 0` skip that ledger.
    PerUser(GrantFn),
}

impl Grant {
    pub fn per_user<F>(f: F) -> Self
    where
        F: Fn(&InvitationStats) -> i64 + Send + Sync + 'static,
    {
        Grant::PerUser(Arc::new(f))
    }

    fn amount(&self, stats: &InvitationStats) -> i64 {
        match self {
            Grant::Fixed(count) => *count,
            Grant::PerUser(f) => f(stats),
        }
    }
}

impl From<i64> for Grant {
    fn from(count: i64) -> Self {
        Grant::Fixed(count)
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::Fixed(count) => f.debug_tuple("Fixed").field(count).finish(),
            Grant::PerUser(_) => f.write_str("PerUser(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewardSummary {
    pub rewarded_users: u64,
    pub invitations_given: i64,
}

impl fmt::Display for RewardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invitations given to {} users",
            self.invitations_given, self.rewarded_users
        )
    }
}

#[derive(Clone)]
pub struct RewardService {
    stats: Arc<dyn StatsStore>,
    ledger: LedgerService,
    threshold: f64,
    default_bonus: i64,
}

impl RewardService {
    pub fn new(
        stats: Arc<dyn StatsStore>,
        ledger: LedgerService,
        threshold: f64,
        default_bonus: i64,
    ) -> Self {
        Self {
            stats,
            ledger,
            threshold,
            default_bonus,
        }
    }

    /// Credits every ledger in `scope` with the amount `grant` resolves to.
    pub async fn give_invitations(
        &self,
        scope: RewardScope,
        grant: Grant,
    ) -> InvitationResult<RewardSummary> {
        if let Grant::Fixed(count) = grant {
            if count < 0 {
                return Err(InvitationError::InvalidArgument(format!(
                    "grant must not be negative, got {count}"
                )));
            }
        }

        let ledgers = self.stats.list(scope.user_id()).await?;
        if ledgers.is_empty() {
            if let RewardScope::User(_) = scope {
                return Err(InvitationError::NotFound);
            }
        }

        let mut summary = RewardSummary::default();
        for stats in &ledgers {
            let amount = grant.amount(stats);
            if amount <= 0 {
                continue;
            }
            self.ledger.credit(stats.user_id, amount).await?;
            summary.rewarded_users += 1;
            summary.invitations_given += amount;
        }
        info!(
            scope = ?scope,
            rewarded_users = summary.rewarded_users,
            invitations_given = summary.invitations_given,
            "Invitations given"
        );
        Ok(summary)
    }

    /// Gives `bonus` invitations (the initial quota when `None`) to every
    /// ledger in `scope` whose performance reaches the threshold.
    pub async fn reward(
        &self,
        scope: RewardScope,
        bonus: Option<i64>,
    ) -> InvitationResult<RewardSummary> {
        let bonus = bonus.unwrap_or(self.default_bonus);
        if bonus < 0 {
            return Err(InvitationError::InvalidArgument(format!(
                "bonus must not be negative, got {bonus}"
            )));
        }
        let ledger = self.ledger.clone();
        let threshold = self.threshold;
        let grant = Grant::per_user(move |stats| {
            let score = ledger.score(stats);
            debug!(user_id = %stats.user_id, score, "Reward candidate");
            if score >= threshold { bonus } else { 0 }
        });
        self.give_invitations(scope, grant).await
    }
}
