// handlers/protected/mod.rs - Handlers for any signed-in user
pub mod me;

pub use me::me_get;
