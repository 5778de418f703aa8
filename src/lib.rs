//! Push Hooks - post-receive processing for a git hosting service.
//!
//! For every ref update this library builds the push payload, records it,
//! delivers it to webhooks, protects a freshly pushed default branch and
//! links commits to the issues their messages reference.

pub mod closer;
pub mod config;
pub mod dispatch;
pub mod effects;
pub mod history;
pub mod notify;
pub mod payload;
pub mod persistence;
pub mod pipeline;
pub mod refs;
pub mod scanner;
pub mod server;
pub mod trackers;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;
