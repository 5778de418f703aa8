//! HTTP server.
//!
//! # Endpoints
//!
//! - `POST /push` - Accepts a signed push notification, runs the pipeline and
//!   returns the outcome as JSON
//! - `GET /health` - Returns 200 if server is running

use std::path::PathBuf;
use std::sync::Arc;

pub mod health;
pub mod push;

pub use health::health_handler;
pub use push::{PushError, PushNotification, push_handler};

use crate::persistence::LocalStore;
use crate::pipeline::PushPipeline;
use crate::trackers::{AnyTracker, JiraClient};

/// The tracker type the server runs with.
pub type Tracker = AnyTracker<LocalStore, JiraClient>;

/// The pipeline type the server runs with.
pub type Pipeline = PushPipeline<LocalStore, Tracker>;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Pipeline,
    /// Bare repositories live at `<repos_dir>/<path_with_namespace>.git`.
    repos_dir: PathBuf,
    /// Secret for verifying push notification signatures.
    push_secret: Vec<u8>,
}

impl AppState {
    pub fn new(
        pipeline: Pipeline,
        repos_dir: impl Into<PathBuf>,
        push_secret: impl Into<Vec<u8>>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                pipeline,
                repos_dir: repos_dir.into(),
                push_secret: push_secret.into(),
            }),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn store(&self) -> &LocalStore {
        self.inner.pipeline.platform()
    }

    pub fn push_secret(&self) -> &[u8] {
        &self.inner.push_secret
    }

    /// Path of the bare repository for a project.
    pub fn repository_path(&self, path_with_namespace: &str) -> PathBuf {
        self.inner
            .repos_dir
            .join(format!("{path_with_namespace}.git"))
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/push", post(push_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
