use anyhow::{Context, Result};

use crate::identity::toolkit::DEFAULT_API_BASE;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub identity_api_key: String,
    pub identity_api_base: String,
    /// Public origin of the web app; sign-in links return to `{app_base_url}/auth/complete`.
    pub app_base_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            identity_api_key: require_env("IDENTITY_API_KEY")?,
            identity_api_base: std::env::var("IDENTITY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            app_base_url: require_env("APP_BASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Where the provider sends the user back after following a sign-in link.
    pub fn continuation_target(&self) -> String {
        format!("{}/auth/complete", self.app_base_url.trim_end_matches('/'))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_target_trims_trailing_slash() {
        let config = Config {
            database_url: String::new(),
            identity_api_key: String::new(),
            identity_api_base: DEFAULT_API_BASE.to_string(),
            app_base_url: "https://handyman.example.com/".to_string(),
            anthropic_api_key: String::new(),
            port: 8080,
            rust_log: "info".to_string(),
        };
        assert_eq!(
            config.continuation_target(),
            "https://handyman.example.com/auth/complete"
        );
    }
}
