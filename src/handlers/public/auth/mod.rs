// handlers/public/auth/mod.rs - Token acquisition endpoints

use serde::Serialize;

use crate::database::models::User;

mod login;    // POST /api/auth/login
mod register; // POST /api/auth/register

pub use login::login;
pub use register::register;

/// Body returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}
