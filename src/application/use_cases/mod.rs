pub mod auth;
pub mod credits;
pub mod sso;
