//! Engine configuration
//!
//! The remote document store is optional: with no `RemoteConfig` the engine
//! runs local-only and every sync step short-circuits to "skipped".
//! Credentials come from the environment (a `.env` file is honored), never
//! from source.

use thiserror::Error;
use url::Url;

use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};

/// Environment variable names understood by `from_env` constructors.
pub const ENV_API_KEY: &str = "CHEMSYNC_API_KEY";
pub const ENV_PROJECT_ID: &str = "CHEMSYNC_PROJECT_ID";
pub const ENV_AUTH_URL: &str = "CHEMSYNC_AUTH_URL";
pub const ENV_DOCS_URL: &str = "CHEMSYNC_DOCS_URL";
pub const ENV_COLLECTION: &str = "CHEMSYNC_COLLECTION";
pub const ENV_DATA_DIR: &str = "CHEMSYNC_DATA_DIR";

const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts";
const DEFAULT_COLLECTION: &str = "datasets";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Connection settings for the remote typed document store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_key: String,
    pub project_id: String,
    /// Base URL of the identity provider (`:signInWithPassword` is appended)
    pub auth_url: String,
    /// Base URL of the document collection root (`/{collection}` and
    /// `:runQuery` are appended)
    pub docs_url: String,
    pub collection: String,
}

impl RemoteConfig {
    /// Build a config for the hosted endpoints of the given project.
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let docs_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            project_id
        );
        Self {
            api_key: api_key.into(),
            project_id,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            docs_url,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Override both endpoints (for tests against a local mock server).
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, docs_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.docs_url = docs_url.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Read the remote settings from the environment. A `.env` file in the
    /// working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_key =
            std::env::var(ENV_API_KEY).map_err(|_| ConfigError::MissingVar(ENV_API_KEY))?;
        let project_id =
            std::env::var(ENV_PROJECT_ID).map_err(|_| ConfigError::MissingVar(ENV_PROJECT_ID))?;

        let mut config = RemoteConfig::new(api_key, project_id);
        if let Ok(auth_url) = std::env::var(ENV_AUTH_URL) {
            validate_url(ENV_AUTH_URL, &auth_url)?;
            config.auth_url = auth_url;
        }
        if let Ok(docs_url) = std::env::var(ENV_DOCS_URL) {
            validate_url(ENV_DOCS_URL, &docs_url)?;
            config.docs_url = docs_url;
        }
        if let Ok(collection) = std::env::var(ENV_COLLECTION) {
            config.collection = collection;
        }

        Ok(config)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_paths: DataPaths,
    pub remote: Option<RemoteConfig>,
}

impl EngineConfig {
    /// Local-only engine rooted at the given data directory.
    pub fn local(data_dir: impl AsRef<std::path::Path>) -> Self {
        Self {
            data_paths: DataPaths::new(data_dir),
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Data directory from `CHEMSYNC_DATA_DIR`, remote settings from the
    /// environment when both required variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let data_dir =
            std::env::var(ENV_DATA_DIR).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let remote = match RemoteConfig::from_env() {
            Ok(remote) => Some(remote),
            Err(ConfigError::MissingVar(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            data_paths: DataPaths::new(data_dir),
            remote,
        })
    }
}

fn validate_url(var: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidUrl { var, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_derived_from_project() {
        let config = RemoteConfig::new("key", "plant-analytics");
        assert!(config.docs_url.contains("projects/plant-analytics/"));
        assert_eq!(config.collection, "datasets");
    }

    #[test]
    fn test_endpoint_override() {
        let config = RemoteConfig::new("key", "p")
            .with_endpoints("http://localhost:9099/accounts", "http://localhost:8080/docs");
        assert_eq!(config.auth_url, "http://localhost:9099/accounts");
        assert_eq!(config.docs_url, "http://localhost:8080/docs");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(validate_url(ENV_DOCS_URL, "not a url").is_err());
        assert!(validate_url(ENV_DOCS_URL, "http://localhost:8080").is_ok());
    }
}
