// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus the service banner and health check.

pub mod auth;
mod health;
mod root;

pub use health::health;
pub use root::root;
