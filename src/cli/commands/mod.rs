pub mod admin;
pub mod catalog;
pub mod health;
pub mod migrate;
