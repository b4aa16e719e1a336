// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth): service info, health, register and login.
// Protected (JWT auth): the caller's account, logs and passcode changes.
pub mod protected;
pub mod public;
