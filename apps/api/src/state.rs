use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::profiles::store::ProfileStore;
use crate::signin::SignInOrchestrator;
use crate::skills::SkillSuggester;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Jobs live in relational tables queried directly through the pool.
    pub db: PgPool,
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    /// Pluggable text-generation backend. Default: `LlmSkillSuggester`.
    pub skills: Arc<dyn SkillSuggester>,
}

impl AppState {
    /// A fresh orchestrator for one request; the caller supplies any pending state.
    pub fn sign_in(&self) -> SignInOrchestrator {
        SignInOrchestrator::new(
            self.identity.clone(),
            self.profiles.clone(),
            self.config.continuation_target(),
        )
    }
}
