//! Log encryption services: the record codec, the background re-encryption
//! engine, its job ledger and per-user lease, and the passcode-change flow
//! that ties them together. Anchors live here too.

pub mod anchors;
pub mod lease;
pub mod ledger;
pub mod log_codec;
pub mod migration;
pub mod passphrase;

pub use anchors::{AnchorError, AnchorService};
pub use lease::{MigrationLease, MigrationLocks};
pub use ledger::JobLedger;
pub use migration::{KeyChange, MigrationEngine, MigrationError};
pub use passphrase::{PasscodeChange, PassphraseError, PassphraseService};
