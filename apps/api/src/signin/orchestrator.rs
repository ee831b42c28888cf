//! Sign-in orchestrator: request a credential, verify it, then make sure the
//! verified identity has exactly one profile before handing out the session.
//!
//! ```text
//! Idle ──request──▶ AwaitingCredential ──submit──▶ (verifying) ──▶ (bootstrapping) ──▶ Ready
//!   ▲                 │  ▲                                              │
//!   └─ IssueFailed ───┘  └── InvalidCode                                └──▶ BootstrapFailed ──retry──▶ Ready
//!   └──────────── ContextLost ──────────────────────────────────────────────────────────┘
//! ```
//!
//! The pending verification is owned by the orchestrator value. Callers that
//! persist it between requests (the HTTP layer hands it to the client) pass it
//! back in with [`SignInOrchestrator::with_pending`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::identity::{
    Channel, ConfirmationHandle, ContactAddress, CredentialMaterial, IdentityProvider,
    IssueRequest, ProviderError, VerifiedIdentity, VerifyRequest,
};
use crate::models::profile::{Profile, Role};
use crate::profiles::store::{ProfileStore, StoreError};

/// Client-held state between issuing and verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub contact: ContactAddress,
    pub channel: Channel,
    pub role: Role,
    /// Present for the code channel only.
    pub confirmation_handle: Option<ConfirmationHandle>,
}

#[derive(Debug, Clone)]
pub enum SignInState {
    Idle,
    AwaitingCredential(PendingVerification),
    /// Identity verified, profile not materialized. Only bootstrap may be retried.
    BootstrapFailed {
        verified: VerifiedIdentity,
        role: Role,
    },
    Ready(Profile),
}

/// What the caller should offer the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    Retry,
    StartOver,
    RetryBootstrap,
}

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("could not send a sign-in credential: {0}")]
    IssueFailed(#[source] ProviderError),

    #[error("the sign-in credential was not accepted: {0}")]
    InvalidCode(#[source] ProviderError),

    #[error("sign-in details were not found on this device, please start again")]
    ContextLost,

    #[error("signed in, but the profile could not be created, please try again")]
    BootstrapFailed {
        verified: VerifiedIdentity,
        role: Role,
        #[source]
        source: StoreError,
    },
}

impl SignInError {
    pub fn recovery(&self) -> Recovery {
        match self {
            SignInError::IssueFailed(_) | SignInError::InvalidCode(_) => Recovery::Retry,
            SignInError::ContextLost => Recovery::StartOver,
            SignInError::BootstrapFailed { .. } => Recovery::RetryBootstrap,
        }
    }
}

/// Established session: a verified identity that is guaranteed a profile.
#[derive(Debug, Clone)]
pub struct Ready {
    pub profile: Profile,
    pub session: VerifiedIdentity,
    /// True when this sign-in created the profile.
    pub created: bool,
}

pub struct SignInOrchestrator {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    continuation_target: String,
    state: SignInState,
}

impl SignInOrchestrator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        continuation_target: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            profiles,
            continuation_target: continuation_target.into(),
            state: SignInState::Idle,
        }
    }

    /// Restores a pending verification the caller kept since the last request.
    pub fn with_pending(mut self, pending: Option<PendingVerification>) -> Self {
        self.state = match pending {
            Some(pending) => SignInState::AwaitingCredential(pending),
            None => SignInState::Idle,
        };
        self
    }

    /// Restores an identity whose profile bootstrap failed earlier, so that
    /// only `retry_bootstrap` is needed to finish.
    pub fn with_failed_bootstrap(mut self, verified: VerifiedIdentity, role: Role) -> Self {
        self.state = SignInState::BootstrapFailed { verified, role };
        self
    }

    /// Idle → AwaitingCredential. Replaces any earlier pending attempt.
    pub async fn request_credential(
        &mut self,
        contact: &str,
        role: Role,
        app_verification: Option<&str>,
    ) -> Result<PendingVerification, SignInError> {
        // Only one attempt at a time: the previous one is gone whatever happens next.
        self.state = SignInState::Idle;

        let contact = ContactAddress::parse(contact)
            .map_err(|e| SignInError::IssueFailed(ProviderError::Malformed(e.to_string())))?;

        let receipt = self
            .identity
            .issue_credential(IssueRequest {
                contact: &contact,
                continuation_target: &self.continuation_target,
                app_verification,
            })
            .await
            .map_err(|e| {
                warn!(contact = %contact.masked(), "credential issue failed: {e}");
                SignInError::IssueFailed(e)
            })?;

        let channel = contact.channel();
        if channel == Channel::Code && receipt.confirmation_handle.is_none() {
            return Err(SignInError::IssueFailed(ProviderError::Unavailable(
                "no confirmation handle was returned".to_string(),
            )));
        }

        info!(
            contact = %contact.masked(),
            ?channel,
            role = role.as_str(),
            "sign-in credential issued"
        );

        let pending = PendingVerification {
            contact,
            channel,
            role,
            confirmation_handle: receipt.confirmation_handle,
        };
        self.state = SignInState::AwaitingCredential(pending.clone());
        Ok(pending)
    }

    /// AwaitingCredential → Verifying → Bootstrapping → Ready.
    pub async fn submit_credential(
        &mut self,
        material: &CredentialMaterial,
    ) -> Result<Ready, SignInError> {
        let pending = match &self.state {
            SignInState::AwaitingCredential(pending) => pending.clone(),
            _ => {
                warn!("credential submitted with no pending sign-in");
                self.state = SignInState::Idle;
                return Err(SignInError::ContextLost);
            }
        };

        let request = match (material, &pending.channel, &pending.confirmation_handle) {
            (CredentialMaterial::Link { link }, Channel::ContinuationLink, _) => {
                VerifyRequest::Link {
                    link,
                    contact: &pending.contact,
                }
            }
            (CredentialMaterial::Code { code }, Channel::Code, Some(handle)) => {
                VerifyRequest::Code {
                    handle,
                    code: code.trim(),
                }
            }
            _ => {
                warn!(
                    contact = %pending.contact.masked(),
                    "credential does not match the pending sign-in channel"
                );
                self.state = SignInState::Idle;
                return Err(SignInError::ContextLost);
            }
        };

        let verified = match self.identity.verify_credential(request).await {
            Ok(verified) => verified,
            Err(ProviderError::ContextLost(msg)) => {
                warn!("provider lost the verification context: {msg}");
                self.state = SignInState::Idle;
                return Err(SignInError::ContextLost);
            }
            Err(e) => {
                // Stay in AwaitingCredential with the same pending context.
                debug!(contact = %pending.contact.masked(), "credential rejected: {e}");
                return Err(SignInError::InvalidCode(e));
            }
        };

        info!(identity = %verified.identity, "identity verified");
        self.bootstrap(verified, pending.role).await
    }

    /// Retries only the bootstrap step after `BootstrapFailed`.
    pub async fn retry_bootstrap(&mut self) -> Result<Ready, SignInError> {
        let SignInState::BootstrapFailed { verified, role } = &self.state else {
            return Err(SignInError::ContextLost);
        };
        let (verified, role) = (verified.clone(), *role);
        self.bootstrap(verified, role).await
    }

    /// Bootstrapping → Ready | BootstrapFailed. Idempotent per identity.
    pub async fn bootstrap(
        &mut self,
        verified: VerifiedIdentity,
        role: Role,
    ) -> Result<Ready, SignInError> {
        match ensure_profile(self.profiles.as_ref(), &verified, role).await {
            Ok((profile, created)) => {
                self.state = SignInState::Ready(profile.clone());
                Ok(Ready {
                    profile,
                    session: verified,
                    created,
                })
            }
            Err(source) => {
                warn!(identity = %verified.identity, "profile bootstrap failed: {source}");
                self.state = SignInState::BootstrapFailed {
                    verified: verified.clone(),
                    role,
                };
                Err(SignInError::BootstrapFailed {
                    verified,
                    role,
                    source,
                })
            }
        }
    }
}

/// Returns the identity's profile, creating the role default when absent.
///
/// An existing profile is returned untouched, including its role. At most one
/// read and one create-or-merge write.
pub async fn ensure_profile(
    store: &dyn ProfileStore,
    verified: &VerifiedIdentity,
    role: Role,
) -> Result<(Profile, bool), StoreError> {
    if let Some(existing) = store.read_profile(&verified.identity).await? {
        if existing.role() != role {
            debug!(
                identity = %verified.identity,
                stored = existing.role().as_str(),
                requested = role.as_str(),
                "keeping stored role"
            );
        }
        return Ok((existing, false));
    }

    let profile = Profile::bootstrap(verified.identity.clone(), verified.contact.clone(), role);
    let stored = store.write_profile(&profile).await?;
    info!(identity = %stored.id, role = stored.role().as_str(), "profile bootstrapped");
    Ok((stored, true))
}
