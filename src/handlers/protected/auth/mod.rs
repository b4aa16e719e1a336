// handlers/protected/auth/mod.rs - Account endpoints for authenticated users

mod me; // GET /api/auth/me

pub use me::me;
