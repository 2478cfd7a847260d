pub mod invitation;
pub mod invitation_stats;
pub mod user;

pub use invitation::Invitation;
pub use invitation_stats::InvitationStats;
pub use user::User;
