//! Webhook delivery and first-push default branch setup.
//!
//! Planning is pure: [`plan_dispatch`] decides which platform effects a push
//! warrants, and [`dispatch`] executes them. Neither step ever fails the push.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::effects::{PlatformEffect, PlatformInterpreter, PlatformResponse};
use crate::payload::PushEvent;
use crate::refs::{RefChange, RefKind, branch_name};
use crate::types::Project;

/// What [`dispatch`] achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// True once the transport accepted the payload.
    pub webhook_delivered: bool,
    /// The branch protected by this push, if any. Also set when the record
    /// already existed.
    pub protected_branch: Option<String>,
}

/// The effects a push warrants, in execution order.
///
/// Non-branch refs get nothing. Branch refs get a webhook delivery. When the
/// push creates the effective default branch, a protection record precedes
/// the delivery unless the project opted out of protection. A project with no
/// default branch yet has the created branch recorded as its default first.
pub fn plan_dispatch(
    project: &Project,
    change: &RefChange,
    event: &PushEvent,
) -> Vec<PlatformEffect> {
    if !change.is_branch() {
        return Vec::new();
    }

    let mut effects = Vec::with_capacity(3);
    if change.kind == RefKind::BranchCreated
        && change.is_default_branch
        && let Some(branch) = branch_name(&event.ref_name)
    {
        if project.default_branch.is_none() {
            effects.push(PlatformEffect::SetDefaultBranch {
                project_id: project.id,
                branch: branch.to_string(),
            });
        }
        if let Some(developers_can_push) = project.branch_protection.developers_can_push() {
            effects.push(PlatformEffect::ProtectBranch {
                project_id: project.id,
                branch: branch.to_string(),
                developers_can_push,
            });
        }
    }
    effects.push(PlatformEffect::DeliverWebhook {
        event: event.clone(),
        default_branch: change.is_default_branch,
    });
    effects
}

/// Executes a dispatch plan. Failures are logged and skipped.
pub async fn dispatch<P: PlatformInterpreter>(
    platform: &P,
    effects: Vec<PlatformEffect>,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();
    for effect in effects {
        match effect {
            PlatformEffect::SetDefaultBranch { ref branch, .. } => {
                let branch = branch.clone();
                match platform.interpret(effect).await {
                    Ok(PlatformResponse::Created) => info!(%branch, "default branch set"),
                    Ok(response) => debug!(%branch, ?response, "default branch already set"),
                    Err(e) => warn!(%branch, error = %e, "failed to set default branch"),
                }
            }
            PlatformEffect::ProtectBranch { ref branch, .. } => {
                let branch = branch.clone();
                match platform.interpret(effect).await {
                    Ok(PlatformResponse::Created) => {
                        info!(%branch, "protected default branch");
                        outcome.protected_branch = Some(branch);
                    }
                    Ok(PlatformResponse::AlreadyExists) => {
                        debug!(%branch, "branch already protected");
                        outcome.protected_branch = Some(branch);
                    }
                    Ok(other) => {
                        warn!(%branch, response = ?other, "unexpected response to ProtectBranch")
                    }
                    Err(e) => warn!(%branch, error = %e, "failed to protect branch"),
                }
            }
            PlatformEffect::DeliverWebhook { .. } => match platform.interpret(effect).await {
                Ok(_) => outcome.webhook_delivered = true,
                Err(e) => warn!(error = %e, "webhook delivery failed"),
            },
            other => {
                if let Err(e) = platform.interpret(other).await {
                    warn!(error = %e, "dispatch effect failed");
                }
            }
        }
    }
    outcome
}
