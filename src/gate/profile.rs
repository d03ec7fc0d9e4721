//! The profile gate: folds the resolved session and the profile record into a
//! single tri-state answer the route gate and the board act on.
//!
//! `checkingAuth → {unauthenticated, unverified, verified}`; terminal states
//! are re-entered whenever the session changes. A failed profile fetch is not
//! fatal: the user stays verified with `role = None`, which hides role-gated
//! actions instead of crashing, and a toast reports the failure.

use tracing::warn;

use crate::api::ApiClient;
use crate::api::models::Role;
use crate::gate::capabilities::Capabilities;
use crate::identity::SessionState;
use crate::ui::toast::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    CheckingAuth,
    Unauthenticated,
    Unverified,
    Verified {
        name: String,
        role: Option<Role>,
        profile_id: Option<i64>,
    },
}

impl GateState {
    pub fn is_verified(&self) -> bool {
        matches!(self, GateState::Verified { .. })
    }

    pub fn verified_name(&self) -> Option<&str> {
        match self {
            GateState::Verified { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            GateState::Verified { role, .. } => *role,
            _ => None,
        }
    }

    pub fn profile_id(&self) -> Option<i64> {
        match self {
            GateState::Verified { profile_id, .. } => *profile_id,
            _ => None,
        }
    }

    /// Capability set for the gate's role, computed once per evaluation.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role())
    }
}

/// Evaluate the gate for the current session.
///
/// `id_token` is the freshly refreshed token for the session's principal, or
/// `None` when one could not be obtained — in which case the profile is
/// treated as unavailable rather than blocking.
pub async fn evaluate(
    api: &ApiClient,
    session: &SessionState,
    id_token: Option<&str>,
    notifier: &dyn Notifier,
) -> GateState {
    if session.loading {
        return GateState::CheckingAuth;
    }
    let principal = match &session.principal {
        Some(principal) => principal,
        None => return GateState::Unauthenticated,
    };
    if !principal.email_verified {
        return GateState::Unverified;
    }

    let fallback_name = principal.email_local_part().to_string();
    let token = match id_token {
        Some(token) => token,
        None => {
            notifier.error("Failed to verify user or load profile");
            return GateState::Verified {
                name: fallback_name,
                role: None,
                profile_id: None,
            };
        }
    };

    match api.get_profile(token).await {
        Ok(profile) => {
            let name = if profile.name.trim().is_empty() {
                fallback_name
            } else {
                profile.name
            };
            GateState::Verified {
                name,
                role: profile.role,
                profile_id: Some(profile.id),
            }
        }
        Err(err) => {
            warn!(error = %err, "profile fetch failed; continuing without role");
            notifier.error("Failed to verify user or load profile");
            GateState::Verified {
                name: fallback_name,
                role: None,
                profile_id: None,
            }
        }
    }
}
