// Identity Provider seam: issues one-time sign-in credentials and verifies them.
// `toolkit` is the hosted REST adapter used in production; tests swap in `fake`.

#[cfg(test)]
pub mod fake;
pub mod toolkit;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Identity and contact addresses
// ────────────────────────────────────────────────────────────────────────────

/// Opaque, immutable user identifier issued once by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading five characters, used for placeholder display names.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(5)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential delivery mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Single-use link mailed to an email address.
    #[serde(rename = "link")]
    ContinuationLink,
    /// Numeric code sent by SMS.
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("contact address cannot be empty")]
    Empty,

    #[error("email must be at most {max} characters")]
    TooLong { max: usize },

    #[error("email must contain exactly one @ symbol")]
    MissingAtSymbol,

    #[error("email local part cannot be empty")]
    EmptyLocalPart,

    #[error("email domain cannot be empty")]
    EmptyDomain,

    #[error("phone number must be in international format, e.g. +15551234567")]
    InvalidPhone,
}

/// A verified-or-to-be-verified contact address. The variant decides the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactAddress {
    Email(String),
    Phone(String),
}

impl ContactAddress {
    pub const MAX_EMAIL_LENGTH: usize = 254;
    const MIN_PHONE_DIGITS: usize = 8;
    const MAX_PHONE_DIGITS: usize = 15;

    /// Parses user input as an email (contains `@`) or an E.164 phone number
    /// (leading `+`). Anything else is treated as a malformed email.
    pub fn parse(input: &str) -> Result<Self, ContactError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ContactError::Empty);
        }
        if input.starts_with('+') && !input.contains('@') {
            Self::parse_phone(input)
        } else {
            Self::parse_email(input)
        }
    }

    pub fn parse_email(input: &str) -> Result<Self, ContactError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ContactError::Empty);
        }
        if input.len() > Self::MAX_EMAIL_LENGTH {
            return Err(ContactError::TooLong {
                max: Self::MAX_EMAIL_LENGTH,
            });
        }
        let (local, domain) = input
            .split_once('@')
            .ok_or(ContactError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(ContactError::MissingAtSymbol);
        }
        if local.is_empty() {
            return Err(ContactError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(ContactError::EmptyDomain);
        }
        Ok(Self::Email(input.to_string()))
    }

    /// Accepts `+` followed by 8–15 digits. Spaces, dashes and parentheses are dropped.
    pub fn parse_phone(input: &str) -> Result<Self, ContactError> {
        let compact: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        if compact.is_empty() {
            return Err(ContactError::Empty);
        }
        let digits = compact
            .strip_prefix('+')
            .ok_or(ContactError::InvalidPhone)?;
        let valid = (Self::MIN_PHONE_DIGITS..=Self::MAX_PHONE_DIGITS).contains(&digits.len())
            && digits.chars().all(|c| c.is_ascii_digit())
            && !digits.starts_with('0');
        if !valid {
            return Err(ContactError::InvalidPhone);
        }
        Ok(Self::Phone(compact))
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::Email(_) => Channel::ContinuationLink,
            Self::Phone(_) => Channel::Code,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Phone(s) => s,
        }
    }

    /// Log-safe rendering: `a***@example.com`, `+*******4567`.
    pub fn masked(&self) -> String {
        match self {
            Self::Email(email) => match email.split_once('@') {
                Some((local, domain)) => {
                    let first = local.chars().next().unwrap_or('*');
                    format!("{first}***@{domain}")
                }
                None => "***".to_string(),
            },
            Self::Phone(phone) => {
                let count = phone.chars().count();
                phone
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == 0 || i + 4 >= count { c } else { '*' })
                    .collect()
            }
        }
    }
}

impl fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider exchange types
// ────────────────────────────────────────────────────────────────────────────

/// Handle returned when a code is sent; required, with the code, to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationHandle(String);

impl ConfirmationHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What the user presents back: the link they followed, or the code they typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum CredentialMaterial {
    Link { link: String },
    Code { code: String },
}

#[derive(Debug, Clone)]
pub struct IssueRequest<'a> {
    pub contact: &'a ContactAddress,
    pub continuation_target: &'a str,
    /// App-verification token (reCAPTCHA) required by the provider for SMS.
    pub app_verification: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueReceipt {
    pub confirmation_handle: Option<ConfirmationHandle>,
}

#[derive(Debug, Clone)]
pub enum VerifyRequest<'a> {
    Link {
        link: &'a str,
        contact: &'a ContactAddress,
    },
    Code {
        handle: &'a ConfirmationHandle,
        code: &'a str,
    },
}

/// Result of a successful verification or session lookup.
#[derive(Clone)]
pub struct VerifiedIdentity {
    pub identity: Identity,
    pub contact: ContactAddress,
    /// Provider-issued session token (ID token) presented as a bearer token.
    pub session_token: String,
}

impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("identity", &self.identity)
            .field("contact", &self.contact.masked())
            .field("session_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("the contact address was rejected: {0}")]
    Malformed(String),

    #[error("too many attempts, try again later: {0}")]
    RateLimited(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("the credential is not valid: {0}")]
    Invalid(String),

    #[error("the credential has expired: {0}")]
    Expired(String),

    #[error("verification context is missing: {0}")]
    ContextLost(String),
}

/// External identity provider. One outbound call per method.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn issue_credential(
        &self,
        request: IssueRequest<'_>,
    ) -> Result<IssueReceipt, ProviderError>;

    async fn verify_credential(
        &self,
        request: VerifyRequest<'_>,
    ) -> Result<VerifiedIdentity, ProviderError>;

    /// Resolves a previously issued session token back to its identity.
    async fn lookup_session(&self, session_token: &str) -> Result<VerifiedIdentity, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_picks_link_channel() {
        let contact = ContactAddress::parse("alice@example.com").unwrap();
        assert_eq!(contact, ContactAddress::Email("alice@example.com".to_string()));
        assert_eq!(contact.channel(), Channel::ContinuationLink);
    }

    #[test]
    fn test_parse_phone_strips_formatting() {
        let contact = ContactAddress::parse("+1 (555) 123-4567").unwrap();
        assert_eq!(contact, ContactAddress::Phone("+15551234567".to_string()));
        assert_eq!(contact.channel(), Channel::Code);
    }

    #[test]
    fn test_parse_rejects_malformed_addresses() {
        assert_eq!(ContactAddress::parse("   "), Err(ContactError::Empty));
        assert_eq!(
            ContactAddress::parse("no-at-symbol"),
            Err(ContactError::MissingAtSymbol)
        );
        assert_eq!(
            ContactAddress::parse("a@b@c"),
            Err(ContactError::MissingAtSymbol)
        );
        assert_eq!(
            ContactAddress::parse("@example.com"),
            Err(ContactError::EmptyLocalPart)
        );
        assert_eq!(ContactAddress::parse("user@"), Err(ContactError::EmptyDomain));
        assert_eq!(ContactAddress::parse("+12"), Err(ContactError::InvalidPhone));
        assert_eq!(
            ContactAddress::parse("+0155512345"),
            Err(ContactError::InvalidPhone)
        );
    }

    #[test]
    fn test_email_length_limit() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            ContactAddress::parse(&long),
            Err(ContactError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_masked_hides_most_of_the_address() {
        let email = ContactAddress::Email("alice@example.com".to_string());
        assert_eq!(email.masked(), "a***@example.com");

        let phone = ContactAddress::Phone("+15551234567".to_string());
        assert_eq!(phone.masked(), "+*******4567");
    }

    #[test]
    fn test_identity_short_slice() {
        assert_eq!(Identity::new("abcdefghij").short(), "abcde");
        assert_eq!(Identity::new("abc").short(), "abc");
    }

    #[test]
    fn test_credential_material_wire_shape() {
        let code: CredentialMaterial =
            serde_json::from_str(r#"{"channel":"code","code":"123456"}"#).unwrap();
        assert_eq!(
            code,
            CredentialMaterial::Code {
                code: "123456".to_string()
            }
        );

        let link: CredentialMaterial =
            serde_json::from_str(r#"{"channel":"link","link":"https://x.test/?oobCode=a"}"#)
                .unwrap();
        assert!(matches!(link, CredentialMaterial::Link { .. }));
    }

    #[test]
    fn test_verified_identity_debug_redacts_token() {
        let verified = VerifiedIdentity {
            identity: Identity::new("uid-1"),
            contact: ContactAddress::Email("alice@example.com".to_string()),
            session_token: "secret-token".to_string(),
        };
        let rendered = format!("{verified:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("alice@example.com"));
    }
}
