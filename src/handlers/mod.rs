// handlers/mod.rs - Route handlers grouped by who may call them
//
// Public (no auth) → Protected (any signed-in user) → Admin / Distributor (role-gated)
pub mod admin;
pub mod distributor;
pub mod extract;
pub mod protected;
pub mod public;
pub mod query;
