//! Persistence for the platform store.
//!
//! # File Layout
//!
//! ```text
//! <state_dir>/
//!   store.json   # users, projects, issues, notes, protected branches
//!   events.log   # push events (JSON Lines)
//! ```
//!
//! # Crash Safety
//!
//! - Event log: every append is fsynced; a torn final line is truncated on
//!   open
//! - Snapshot: written atomically using write-to-temp-then-rename
//! - Directory entries are fsynced after create and rename

pub mod fsync;
pub mod log;
pub mod snapshot;
pub mod store;

pub use fsync::{fsync_dir, fsync_file, write_atomic};
pub use log::{EventLog, EventLogError, LoggedEvent};
pub use snapshot::{SCHEMA_VERSION, StoreSnapshot, load_snapshot, save_snapshot, try_load_snapshot};
pub use store::{LocalStore, StoreError};
