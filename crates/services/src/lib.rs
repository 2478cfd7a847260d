pub mod auth;
pub mod dao;
pub mod error;
pub mod events;
pub mod invitation;
pub mod ledger;
pub mod mail;
pub mod memory;
pub mod performance;
pub mod registration;
pub mod reward;
pub mod store;

pub use auth::AuthService;
pub use error::{InvitationError, InvitationResult};
pub use events::{EventBus, InvitationEvent};
pub use invitation::InvitationService;
pub use ledger::LedgerService;
pub use mail::{LogMailer, Mailer, OutboxMailer};
pub use memory::MemoryStore;
pub use performance::{PerformanceCalculator, StatsSnapshot};
pub use registration::RegistrationService;
pub use reward::{Grant, RewardScope, RewardService, RewardSummary};
pub use store::Stores;
