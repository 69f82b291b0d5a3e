// handlers/distributor/mod.rs - Distributor-only handlers (behind require_auth + require_distributor)
//
// Every handler scopes its work to the caller's own distributor profile.
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod profile;
