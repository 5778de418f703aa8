//! Push notification endpoint.
//!
//! The git boundary (a post-receive hook) reports each ref update as a
//! signed JSON body. The handler verifies the signature before parsing,
//! looks up the project and pusher, runs the pipeline against the project's
//! bare repository and answers with the [`PushOutcome`].

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::history::GitHistory;
use crate::pipeline::{PipelineError, PushOutcome, PushRequest};
use crate::types::{ProjectId, UserId};
use crate::webhooks::{SIGNATURE_HEADER, verify_signature};

/// Body of `POST /push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(flatten)]
    pub push: PushRequest,
    pub project_id: ProjectId,
    pub user_id: UserId,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unknown project {0}")]
    UnknownProject(ProjectId),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        let status = match &self {
            PushError::MissingHeader(_) | PushError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            PushError::InvalidSignature => StatusCode::UNAUTHORIZED,
            PushError::UnknownProject(_) | PushError::UnknownUser(_) | PushError::Pipeline(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn push_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PushOutcome>, PushError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(PushError::MissingHeader(SIGNATURE_HEADER))?;

    // Authenticate before parsing anything.
    if !verify_signature(&body, signature, app_state.push_secret()) {
        warn!("invalid push signature");
        return Err(PushError::InvalidSignature);
    }

    let notification: PushNotification = serde_json::from_slice(&body)?;
    debug!(
        project_id = %notification.project_id,
        user_id = %notification.user_id,
        ref_name = %notification.push.ref_name,
        "received push"
    );

    let store = app_state.store();
    let project = store
        .project(notification.project_id)
        .await
        .ok_or(PushError::UnknownProject(notification.project_id))?;
    let user = store
        .user(notification.user_id)
        .await
        .ok_or(PushError::UnknownUser(notification.user_id))?;

    let history = GitHistory::new(app_state.repository_path(&project.path_with_namespace));
    let outcome = app_state
        .pipeline()
        .process(&history, &notification.push, &project, &user)
        .await?;

    Ok(Json(outcome))
}
