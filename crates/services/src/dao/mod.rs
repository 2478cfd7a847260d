pub mod base;
pub mod invitation;
pub mod invitation_stats;
pub mod user;

pub use base::BaseDao;
