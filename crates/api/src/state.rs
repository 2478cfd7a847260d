use std::sync::Arc;

use invitely_config::Settings;
use invitely_services::{
    AuthService, EventBus, InvitationService, LedgerService, LogMailer, Mailer,
    PerformanceCalculator, RegistrationService, RewardService, Stores, store::UserStore,
};
use mongodb::Database;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<dyn UserStore>,
    pub events: EventBus,
    pub ledger: LedgerService,
    pub invitations: InvitationService,
    pub rewards: RewardService,
    pub registration: RegistrationService,
}

impl AppState {
    /// MongoDB-backed state. Mail goes to the log.
    pub fn new(db: Database, settings: Settings) -> Self {
        Self::with_stores(Stores::mongo(&db), Arc::new(LogMailer), settings)
    }

    pub fn with_stores(stores: Stores, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        let performance = PerformanceCalculator::new(settings.invitation.invite_only);
        Self::with_performance(stores, mailer, settings, performance)
    }

    pub fn with_performance(
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        settings: Settings,
        performance: PerformanceCalculator,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let events = EventBus::new();
        let ledger = LedgerService::new(
            stores.stats.clone(),
            settings.invitation.clone(),
            performance,
            events.clone(),
        );
        let invitations = InvitationService::new(
            stores.invitations.clone(),
            ledger.clone(),
            mailer,
            events.clone(),
            settings.invitation.clone(),
            settings.mail.clone(),
        );
        let rewards = RewardService::new(
            stores.stats.clone(),
            ledger.clone(),
            settings.invitation.reward_threshold,
            settings.invitation.initial_invitations,
        );
        let registration =
            RegistrationService::new(stores.users.clone(), ledger.clone(), invitations.clone());

        Self {
            settings,
            auth,
            users: stores.users,
            events,
            ledger,
            invitations,
            rewards,
            registration,
        }
    }
}
