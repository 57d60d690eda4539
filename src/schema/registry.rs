//! Schema registry REST client.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, Env, ProcessEnv};

/// Base URL of the schema registry.
pub const SCHEMA_REGISTRY_URL_ENV: &str = "SCHEMA_REGISTRY_URL";

const ACCEPT: &str = "application/vnd.schemaregistry.v1+json, application/json";

/// Errors talking to the schema registry.
#[derive(Debug, Error)]
pub enum SchemaRegistryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid schema registry URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("schema registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("schema registry returned {status}: {message}")]
    Api {
        status: u16,
        error_code: Option<i64>,
        message: String,
    },
}

/// Which version of a subject to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    Latest,
    Number(u32),
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One registered version of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubjectSchema {
    pub subject: String,
    pub version: i32,
    pub id: u32,
    pub schema: String,
    /// Absent for Avro, the registry's default type.
    #[serde(rename = "schemaType", default)]
    pub schema_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: Option<i64>,
    message: Option<String>,
}

/// Client for the registry's subject/version endpoints.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base: Url,
}

impl RegistryClient {
    /// Create a client for the registry at `url`.
    pub fn new(url: &str) -> Result<Self, SchemaRegistryError> {
        let invalid = |reason: String| SchemaRegistryError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let base = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Create a client from `SCHEMA_REGISTRY_URL`. Unset or empty fails fast.
    pub fn from_env(env: &impl Env) -> Result<Self, SchemaRegistryError> {
        let url = env.required(SCHEMA_REGISTRY_URL_ENV)?;
        Self::new(&url)
    }

    /// Create a client from the process environment.
    pub fn from_process_env() -> Result<Self, SchemaRegistryError> {
        Self::from_env(&ProcessEnv)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch one version of `subject`.
    pub async fn schema_by_version(
        &self,
        subject: &str,
        version: SchemaVersion,
    ) -> Result<SubjectSchema, SchemaRegistryError> {
        let url = self.subject_version_url(subject, version)?;
        tracing::debug!(url = %url, "Fetching schema");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
            let (error_code, message) = match parsed {
                Some(e) => (e.error_code, e.message.unwrap_or(body)),
                None => (None, body),
            };
            return Err(SchemaRegistryError::Api {
                status: status.as_u16(),
                error_code,
                message,
            });
        }

        Ok(response.json::<SubjectSchema>().await?)
    }

    fn subject_version_url(
        &self,
        subject: &str,
        version: SchemaVersion,
    ) -> Result<Url, SchemaRegistryError> {
        let mut url = self.base.clone();
        let version = version.to_string();
        url.path_segments_mut()
            .map_err(|()| SchemaRegistryError::InvalidUrl {
                url: self.base.to_string(),
                reason: "not a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["subjects", subject, "versions", version.as_str()]);
        Ok(url)
    }
}
