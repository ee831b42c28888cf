// Sign-in: credential request/verification and first-time profile bootstrap.
// The orchestrator is transport-agnostic; handlers and the session extractor
// adapt it to HTTP.

pub mod handlers;
pub mod orchestrator;
pub mod session;

pub use orchestrator::{PendingVerification, Ready, Recovery, SignInError, SignInOrchestrator};
pub use session::AuthenticatedUser;
