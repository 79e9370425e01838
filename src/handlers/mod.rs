pub mod auth;
pub mod setup;
pub mod tenants;
pub mod users;
