//! Scripted identity provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ConfirmationHandle, ContactAddress, Identity, IdentityProvider, IssueReceipt, IssueRequest,
    ProviderError, VerifiedIdentity, VerifyRequest,
};

pub const VALID_CODE: &str = "123456";
pub const VALID_LINK: &str = "https://app.example.com/auth/complete?mode=signIn&oobCode=GOOD";

/// Accepts `VALID_CODE` / `VALID_LINK` and issues one identity per contact
/// address (`uid-<address>`). Session tokens are `token-<uid>`.
#[derive(Default)]
pub struct FakeIdentityProvider {
    pub issue_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub fail_issue: Mutex<Option<ProviderError>>,
    pub fail_lookup: Mutex<Option<ProviderError>>,
}

impl FakeIdentityProvider {
    pub fn failing_issue(error: ProviderError) -> Self {
        let provider = Self::default();
        *provider.fail_issue.lock().unwrap() = Some(error);
        provider
    }

    pub fn issue_count(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn identity_for(contact: &ContactAddress) -> Identity {
        Identity::new(format!("uid-{}", contact.as_str()))
    }

    fn verified(contact: &ContactAddress) -> VerifiedIdentity {
        let identity = Self::identity_for(contact);
        VerifiedIdentity {
            session_token: format!("token-{identity}"),
            identity,
            contact: contact.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn issue_credential(
        &self,
        request: IssueRequest<'_>,
    ) -> Result<IssueReceipt, ProviderError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.fail_issue.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        let confirmation_handle = match request.contact {
            ContactAddress::Email(_) => None,
            ContactAddress::Phone(phone) => Some(ConfirmationHandle::new(format!("handle-{phone}"))),
        };
        Ok(IssueReceipt {
            confirmation_handle,
        })
    }

    async fn verify_credential(
        &self,
        request: VerifyRequest<'_>,
    ) -> Result<VerifiedIdentity, ProviderError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match request {
            VerifyRequest::Link { link, contact } if link == VALID_LINK => {
                Ok(Self::verified(contact))
            }
            VerifyRequest::Link { .. } => Err(ProviderError::Invalid("INVALID_OOB_CODE".into())),
            VerifyRequest::Code { handle, code } => {
                let phone = handle
                    .as_str()
                    .strip_prefix("handle-")
                    .ok_or_else(|| ProviderError::ContextLost("INVALID_SESSION_INFO".into()))?;
                if code != VALID_CODE {
                    return Err(ProviderError::Invalid("INVALID_CODE".into()));
                }
                Ok(Self::verified(&ContactAddress::Phone(phone.to_string())))
            }
        }
    }

    async fn lookup_session(&self, session_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        let failure = self.fail_lookup.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        let uid = session_token
            .strip_prefix("token-")
            .ok_or_else(|| ProviderError::Invalid("INVALID_ID_TOKEN".into()))?;
        let address = uid
            .strip_prefix("uid-")
            .ok_or_else(|| ProviderError::Invalid("INVALID_ID_TOKEN".into()))?;
        let contact = ContactAddress::parse(address)
            .map_err(|e| ProviderError::Invalid(e.to_string()))?;
        Ok(Self::verified(&contact))
    }
}
