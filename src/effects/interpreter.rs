//! Effect interpreter traits.
//!
//! These traits define how effects are executed. The trait-based design
//! enables:
//! - Recording interpreters for testing (see `crate::test_utils`)
//! - Git, file-store and HTTP interpreters in production
//! - Swapping the external tracker backend without touching the pipeline

use std::fmt;
use std::future::Future;

use super::history::{HistoryEffect, HistoryResponse};
use super::platform::{PlatformEffect, PlatformResponse};
use super::remote::{RemoteEffect, RemoteResponse};

/// Interprets history queries against one repository.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct FixedHistory(Vec<Commit>);
///
/// impl HistoryInterpreter for FixedHistory {
///     type Error = std::convert::Infallible;
///
///     async fn interpret(&self, effect: HistoryEffect) -> Result<HistoryResponse, Self::Error> {
///         match effect {
///             HistoryEffect::HeadBranch => Ok(HistoryResponse::Branch(None)),
///             _ => Ok(HistoryResponse::Commits(self.0.clone())),
///         }
///     }
/// }
/// ```
pub trait HistoryInterpreter {
    /// The error type returned by this interpreter.
    type Error: fmt::Display + Send;

    /// Execute a history effect and return its response.
    fn interpret(
        &self,
        effect: HistoryEffect,
    ) -> impl Future<Output = Result<HistoryResponse, Self::Error>> + Send;
}

/// Interprets platform effects (event log, webhooks, users, issues, notes).
///
/// Implementations own uniqueness: `CreateCrossReference` and
/// `ProtectBranch` must answer `AlreadyExists` rather than creating a second
/// record, even under concurrent calls.
pub trait PlatformInterpreter {
    /// The error type returned by this interpreter.
    type Error: fmt::Display + Send;

    /// Execute a platform effect and return its response.
    fn interpret(
        &self,
        effect: PlatformEffect,
    ) -> impl Future<Output = Result<PlatformResponse, Self::Error>> + Send;
}

/// Interprets remote tracker effects.
///
/// Implementations are constructed with the tracker's API location and
/// credentials, so effects only carry issue keys.
pub trait RemoteInterpreter {
    /// The error type returned by this interpreter.
    type Error: fmt::Display + Send;

    /// Execute a remote effect and return its response.
    fn interpret(
        &self,
        effect: RemoteEffect,
    ) -> impl Future<Output = Result<RemoteResponse, Self::Error>> + Send;
}
