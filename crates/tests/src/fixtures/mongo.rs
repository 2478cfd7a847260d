use std::sync::Arc;

use invitely_config::Settings;
use invitely_db::{connect, indexes::ensure_indexes};
use invitely_services::{
    EventBus, InvitationService, LedgerService, OutboxMailer, PerformanceCalculator, Stores,
};
use mongodb::Database;

use super::test_app::test_settings;

/// A MongoDB database of its own for one test, dropped afterwards.
///
/// Requires a running MongoDB at localhost:27017.
/// Set INVITELY__DATABASE__URL to override the connection string.
pub struct TestDb {
    pub db: Database,
    pub settings: Settings,
    pub stores: Stores,
}

impl TestDb {
    pub async fn spawn() -> Self {
        let mut settings = test_settings();
        if let Ok(url) = std::env::var("INVITELY__DATABASE__URL") {
            settings.database.url = url;
        }
        settings.database.name = format!("invitely_test_{}", uuid::Uuid::new_v4().simple());

        let db = connect(&settings.database)
            .await
            .expect("Failed to connect to MongoDB");
        ensure_indexes(&db).await.expect("Failed to create indexes");
        let stores = Stores::mongo(&db);

        Self {
            db,
            settings,
            stores,
        }
    }

    /// Ledger and invitation services over the Mongo stores.
    pub fn services(&self, invite_only: bool) -> (LedgerService, InvitationService) {
        let mut settings = self.settings.invitation.clone();
        settings.invite_only = invite_only;
        let events = EventBus::new();
        let ledger = LedgerService::new(
            self.stores.stats.clone(),
            settings.clone(),
            PerformanceCalculator::new(invite_only),
            events.clone(),
        );
        let invitations = InvitationService::new(
            self.stores.invitations.clone(),
            ledger.clone(),
            Arc::new(OutboxMailer::new()),
            events,
            settings,
            self.settings.mail.clone(),
        );
        (ledger, invitations)
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}
