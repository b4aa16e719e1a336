pub mod anchor;
pub mod job;
pub mod log;
pub mod user;

pub use anchor::{Anchor, MAX_FAVORITES};
pub use job::{JobState, PassphraseJob, LAST_ERROR_MAX_CHARS};
pub use log::{LogDocument, LogPlaintext, LogView, MoodPoint, DEFAULT_INTENSITY};
pub use user::{NewUser, User};
