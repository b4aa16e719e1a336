pub mod database;
pub mod passphrase;
pub mod token;
