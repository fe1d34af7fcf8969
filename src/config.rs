//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honoured for local
//! development.

use std::env;

use crate::services::streak::StreakPolicy;

/// Default number of freeze tokens granted at registration.
pub const DEFAULT_FREEZE_TOKENS: u32 = 1;

/// PBKDF2 iteration count for new password hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Cloud Firestore (or the emulator when FIRESTORE_EMULATOR_HOST is set).
    Firestore,
    /// Process-local storage; data is lost on restart.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Storage backend selection
    pub storage_backend: StorageBackend,
    /// Override for the summarisation endpoint
    pub text_generation_url: Option<String>,
    /// Streak recomputation and timestamp validation policy
    pub streak_policy: StreakPolicy,
    /// Freeze tokens granted to new users
    pub default_freeze_tokens: u32,
    /// PBKDF2 iterations for new password hashes
    pub password_iterations: u32,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Hugging Face inference API key; local summaries are used without it
    pub huggingface_api_key: Option<String>,
}

impl Config {
    /// Config for tests: in-memory storage, cheap password hashing.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            text_generation_url: None,
            streak_policy: StreakPolicy::default(),
            default_freeze_tokens: DEFAULT_FREEZE_TOKENS,
            password_iterations: 1_000,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            huggingface_api_key: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut streak_policy = StreakPolicy::default();
        if let Some(lookback) = parse_optional::<usize>("STREAK_LOOKBACK_EVENTS")? {
            if lookback == 0 {
                return Err(ConfigError::Invalid(
                    "STREAK_LOOKBACK_EVENTS",
                    "must be greater than 0".to_string(),
                ));
            }
            streak_policy.lookback_events = lookback;
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            text_generation_url: non_empty_var("TEXT_GENERATION_URL"),
            streak_policy,
            default_freeze_tokens: parse_optional("DEFAULT_FREEZE_TOKENS")?
                .unwrap_or(DEFAULT_FREEZE_TOKENS),
            password_iterations: parse_optional("PASSWORD_ITERATIONS")?
                .unwrap_or(DEFAULT_PASSWORD_ITERATIONS),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            huggingface_api_key: non_empty_var("HUGGINGFACE_API_KEY"),
        })
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    non_empty_var(name)
        .map(|raw| {
            raw.parse()
                .map_err(|_| ConfigError::Invalid(name, raw.clone()))
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("STREAK_LOOKBACK_EVENTS", "90");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.streak_policy.lookback_events, 90);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "Firestore".parse::<StorageBackend>().unwrap(),
            StorageBackend::Firestore
        );
        assert_eq!(
            " memory ".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
