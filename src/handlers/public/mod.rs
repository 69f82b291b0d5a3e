// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service descriptor, health probe and the session endpoints that hand out tokens.
pub mod auth;
pub mod health;
pub mod root;

pub use health::health;
pub use root::root;
