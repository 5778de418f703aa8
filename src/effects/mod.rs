//! Effects-as-data for history, platform and remote tracker operations.
//!
//! This module defines effect types that describe operations without executing
//! them. This enables:
//! - Pure pipeline stages that decide which effects to issue
//! - Testability via recording interpreters
//! - Logging/tracing of intended operations

pub mod history;
pub mod interpreter;
pub mod platform;
pub mod remote;

pub use history::{HistoryEffect, HistoryResponse};
pub use interpreter::{HistoryInterpreter, PlatformInterpreter, RemoteInterpreter};
pub use platform::{CrossReferenceNote, PlatformEffect, PlatformResponse};
pub use remote::{RemoteEffect, RemoteResponse};
