//! Hosted identity toolkit adapter.
//!
//! Speaks the identity toolkit REST API (`accounts:*` methods):
//! email sign-in links via `sendOobCode` / `signInWithEmailLink`, SMS codes via
//! `sendVerificationCode` / `signInWithPhoneNumber`, and session lookup via `lookup`.
//! No retries: a resent SMS or email is a user-visible side effect.
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    Channel, ConfirmationHandle, ContactAddress, Identity, IdentityProvider, IssueReceipt,
    IssueRequest, ProviderError, VerifiedIdentity, VerifyRequest,
};

pub const DEFAULT_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOobCodeRequest<'a> {
    request_type: &'a str,
    email: &'a str,
    continue_url: &'a str,
    can_handle_code_in_app: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeRequest<'a> {
    phone_number: &'a str,
    recaptcha_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeResponse {
    session_info: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailLinkSignInRequest<'a> {
    email: &'a str,
    oob_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhoneSignInRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolkitError {
    error: ToolkitErrorBody,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorBody {
    message: String,
}

/// REST client for the hosted identity toolkit.
#[derive(Clone)]
pub struct IdentityToolkit {
    client: Client,
    api_key: String,
    base_url: String,
}

impl IdentityToolkit {
    pub fn new(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/accounts:{method}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ToolkitError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("identity toolkit {method} returned {status}: {message}");
            return Err(classify_error(status.as_u16(), &message));
        }

        debug!("identity toolkit {method} succeeded");
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("unreadable {method} response: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    async fn issue_credential(
        &self,
        request: IssueRequest<'_>,
    ) -> Result<IssueReceipt, ProviderError> {
        match request.contact {
            ContactAddress::Email(email) => {
                let body = SendOobCodeRequest {
                    request_type: "EMAIL_SIGNIN",
                    email,
                    continue_url: request.continuation_target,
                    can_handle_code_in_app: true,
                };
                self.post::<_, serde_json::Value>("sendOobCode", &body)
                    .await?;
                Ok(IssueReceipt::default())
            }
            ContactAddress::Phone(phone) => {
                let recaptcha_token = request.app_verification.ok_or_else(|| {
                    ProviderError::Malformed(
                        "phone sign-in requires an app verification token".to_string(),
                    )
                })?;
                let body = SendVerificationCodeRequest {
                    phone_number: phone,
                    recaptcha_token,
                };
                let response: SendVerificationCodeResponse =
                    self.post("sendVerificationCode", &body).await?;
                Ok(IssueReceipt {
                    confirmation_handle: Some(ConfirmationHandle::new(response.session_info)),
                })
            }
        }
    }

    async fn verify_credential(
        &self,
        request: VerifyRequest<'_>,
    ) -> Result<VerifiedIdentity, ProviderError> {
        match request {
            VerifyRequest::Link { link, contact } => {
                let oob_code = extract_oob_code(link).ok_or_else(|| {
                    ProviderError::Invalid("the link is not a sign-in link".to_string())
                })?;
                let body = EmailLinkSignInRequest {
                    email: contact.as_str(),
                    oob_code: &oob_code,
                };
                let response: SignInResponse = self.post("signInWithEmailLink", &body).await?;
                into_verified(
                    response.local_id,
                    response.id_token,
                    response.email,
                    response.phone_number,
                    Channel::ContinuationLink,
                )
            }
            VerifyRequest::Code { handle, code } => {
                let body = PhoneSignInRequest {
                    session_info: handle.as_str(),
                    code,
                };
                let response: SignInResponse = self.post("signInWithPhoneNumber", &body).await?;
                into_verified(
                    response.local_id,
                    response.id_token,
                    response.email,
                    response.phone_number,
                    Channel::Code,
                )
            }
        }
    }

    async fn lookup_session(&self, session_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        let body = LookupRequest {
            id_token: session_token,
        };
        let response: LookupResponse = self.post("lookup", &body).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Invalid("unknown session".to_string()))?;
        // Email users are the common case; phone-only accounts carry no email.
        let preferred = if user.email.is_some() {
            Channel::ContinuationLink
        } else {
            Channel::Code
        };
        into_verified(
            user.local_id,
            session_token.to_string(),
            user.email,
            user.phone_number,
            preferred,
        )
    }
}

/// Picks the verified contact field matching the channel used, falling back
/// to whichever one the provider returned.
fn into_verified(
    local_id: String,
    session_token: String,
    email: Option<String>,
    phone_number: Option<String>,
    preferred: Channel,
) -> Result<VerifiedIdentity, ProviderError> {
    let email = email.filter(|e| !e.is_empty()).map(ContactAddress::Email);
    let phone = phone_number
        .filter(|p| !p.is_empty())
        .map(ContactAddress::Phone);
    let contact = match preferred {
        Channel::ContinuationLink => email.or(phone),
        Channel::Code => phone.or(email),
    }
    .ok_or_else(|| ProviderError::Invalid("account has no verified contact".to_string()))?;

    Ok(VerifiedIdentity {
        identity: Identity::new(local_id),
        contact,
        session_token,
    })
}

/// Extracts the one-time code from a sign-in link.
///
/// Accepts the code on the link itself or inside a nested `link` parameter
/// (links rewritten by a redirect service). The URL carrying the code must
/// also be marked `mode=signIn`.
pub fn extract_oob_code(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let carrier = if query_param(&url, "oobCode").is_some() {
        url
    } else {
        Url::parse(&query_param(&url, "link")?).ok()?
    };
    if query_param(&carrier, "mode").as_deref() != Some("signIn") {
        return None;
    }
    query_param(&carrier, "oobCode").filter(|c| !c.is_empty())
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Maps a toolkit error message (e.g. `TOO_MANY_ATTEMPTS_TRY_LATER : ...`) to
/// a provider error kind.
pub fn classify_error(status: u16, message: &str) -> ProviderError {
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or_default();
    let message = message.to_string();

    match code {
        "INVALID_EMAIL"
        | "MISSING_EMAIL"
        | "INVALID_PHONE_NUMBER"
        | "MISSING_PHONE_NUMBER"
        | "INVALID_CONTINUE_URI"
        | "MISSING_CONTINUE_URI"
        | "UNAUTHORIZED_DOMAIN"
        | "CAPTCHA_CHECK_FAILED"
        | "INVALID_RECAPTCHA_TOKEN"
        | "MISSING_RECAPTCHA_TOKEN" => ProviderError::Malformed(message),
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => ProviderError::RateLimited(message),
        "INVALID_OOB_CODE"
        | "INVALID_CODE"
        | "MISSING_CODE"
        | "INVALID_ID_TOKEN"
        | "USER_DISABLED"
        | "USER_NOT_FOUND" => ProviderError::Invalid(message),
        "EXPIRED_OOB_CODE" | "SESSION_EXPIRED" | "TOKEN_EXPIRED" | "CODE_EXPIRED" => {
            ProviderError::Expired(message)
        }
        "INVALID_SESSION_INFO" | "MISSING_SESSION_INFO" => ProviderError::ContextLost(message),
        _ if status == 429 => ProviderError::RateLimited(message),
        _ if (400..500).contains(&status) => ProviderError::Malformed(message),
        _ => ProviderError::Unavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_oob_code_from_direct_link() {
        let link = "https://app.example.com/auth/complete?apiKey=k&mode=signIn&oobCode=ABC123&lang=en";
        assert_eq!(extract_oob_code(link).as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_extract_oob_code_from_nested_link() {
        let outer = "https://links.example.com/?link=https%3A%2F%2Fproj.firebaseapp.com%2F__%2Fauth%2Faction%3Fmode%3DsignIn%26oobCode%3DXYZ";
        assert_eq!(extract_oob_code(outer).as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_extract_oob_code_requires_sign_in_mode() {
        let link = "https://app.example.com/?mode=resetPassword&oobCode=ABC";
        assert_eq!(extract_oob_code(link), None);
    }

    #[test]
    fn test_extract_oob_code_rejects_garbage() {
        assert_eq!(extract_oob_code("not a url"), None);
        assert_eq!(extract_oob_code("https://app.example.com/dashboard"), None);
    }

    #[test]
    fn test_classify_known_codes() {
        assert!(matches!(
            classify_error(400, "INVALID_EMAIL"),
            ProviderError::Malformed(_)
        ));
        assert!(matches!(
            classify_error(400, "TOO_MANY_ATTEMPTS_TRY_LATER : Try again later."),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_error(400, "INVALID_CODE"),
            ProviderError::Invalid(_)
        ));
        assert!(matches!(
            classify_error(400, "EXPIRED_OOB_CODE"),
            ProviderError::Expired(_)
        ));
        assert!(matches!(
            classify_error(400, "INVALID_SESSION_INFO"),
            ProviderError::ContextLost(_)
        ));
    }

    #[test]
    fn test_classify_unknown_codes_by_status() {
        assert!(matches!(
            classify_error(429, "SOMETHING_NEW"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_error(400, "SOMETHING_NEW"),
            ProviderError::Malformed(_)
        ));
        assert!(matches!(
            classify_error(503, "backend error"),
            ProviderError::Unavailable(_)
        ));
    }

    #[test]
    fn test_into_verified_prefers_channel_contact() {
        let verified = into_verified(
            "uid".to_string(),
            "tok".to_string(),
            Some("a@example.com".to_string()),
            Some("+15551234567".to_string()),
            Channel::Code,
        )
        .unwrap();
        assert_eq!(
            verified.contact,
            ContactAddress::Phone("+15551234567".to_string())
        );
    }

    #[test]
    fn test_into_verified_falls_back_to_other_contact() {
        let verified = into_verified(
            "uid".to_string(),
            "tok".to_string(),
            None,
            Some("+15551234567".to_string()),
            Channel::ContinuationLink,
        )
        .unwrap();
        assert_eq!(verified.contact.channel(), Channel::Code);
        assert!(into_verified("uid".into(), "tok".into(), None, None, Channel::Code).is_err());
    }
}
