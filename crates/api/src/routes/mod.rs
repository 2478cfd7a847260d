pub mod auth;
pub mod invitation;
