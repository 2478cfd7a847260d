//! Performance scores in `[0.0, 1.0]` measuring how well a sender's
//! invitations convert into registrations.

use std::fmt;
use std::sync::Arc;

use invitely_db::models::InvitationStats;

/// The counters a score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub available: i64,
    pub sent: i64,
    pub accepted: i64,
}

impl StatsSnapshot {
    pub fn new(available: i64, sent: i64, accepted: i64) -> Self {
        Self {
            available,
            sent,
            accepted,
        }
    }
}

impl From<&InvitationStats> for StatsSnapshot {
    fn from(stats: &InvitationStats) -> Self {
        Self::new(stats.available, stats.sent, stats.accepted)
    }
}

pub type PerformanceFn = Arc<dyn Fn(&StatsSnapshot) -> f64 + Send + Sync>;

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Default score when registration is invite-only: rewards both using
/// the quota and getting invitations accepted.
pub fn invite_only_score(stats: &StatsSnapshot) -> f64 {
    let send_ratio = ratio(stats.sent, stats.available + stats.sent);
    let accept_ratio = open_score(stats);
    ((send_ratio + accept_ratio) * 0.6).min(1.0)
}

/// Default score under open registration: the acceptance ratio.
pub fn open_score(stats: &StatsSnapshot) -> f64 {
    ratio(stats.accepted, stats.sent).min(1.0)
}

/// Picks the scoring strategy once, at construction.
#[derive(Clone)]
pub struct PerformanceCalculator {
    invite_only: bool,
    custom: Option<PerformanceFn>,
}

impl PerformanceCalculator {
    pub fn new(invite_only: bool) -> Self {
        Self {
            invite_only,
            custom: None,
        }
    }

    /// Replaces the built-in score in both modes.
    pub fn with_override(mut self, func: PerformanceFn) -> Self {
        self.custom = Some(func);
        self
    }

    pub fn score(&self, stats: &StatsSnapshot) -> f64 {
        match &self.custom {
            Some(func) => func(stats),
            None if self.invite_only => invite_only_score(stats),
            None => open_score(stats),
        }
    }
}

impl fmt::Debug for PerformanceCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceCalculator")
            .field("invite_only", &self.invite_only)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}
