// handlers/protected/passphrase/mod.rs - Passcode change and migration status

mod change; // PUT /api/passphrase
mod status; // GET /api/passphrase/status

pub use change::change;
pub use status::status;
