// handlers/admin/mod.rs - Admin-only handlers (behind require_auth + require_admin)
pub mod activity;
pub mod distributors;
pub mod orders;
pub mod payments;
pub mod products;
