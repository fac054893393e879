//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to open config file {path}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file parsing failed - key '{key}' missing or has no value in section '{section}'. Try re-running without --no-create-config")]
    MissingKey { section: String, key: String },

    #[error("Config parsing failed, key '{key}' in section '{section}' is not of type {expected}")]
    InvalidValue {
        section: String,
        key: String,
        expected: String,
    },

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("File {0} is not readable")]
    UnreadableFile(PathBuf),

    #[error("No credentials found in {path}: {message}")]
    Credentials { path: PathBuf, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No endpoint for service '{service}' in region '{region}'")]
    MissingEndpoint { service: String, region: String },

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Webhook {0} has no capability URL")]
    MissingCapability(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Console input closed")]
    InputClosed,
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "config file".to_string(),
        }
    }
}

impl Error {
    fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn message_contains(&self, needle: &str) -> bool {
        matches!(self, Error::Api { message, .. } if message.contains(needle))
    }

    /// The remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The request clashed with an existing resource (e.g. a keypair name).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// A load balancer refused a change because another one is in flight.
    pub fn is_pending_update(&self) -> bool {
        self.status() == Some(422)
            || self.message_contains("PENDING")
            || self.message_contains("immutable")
    }

    /// The node being added is already a member of the load balancer.
    pub fn is_duplicate_node(&self) -> bool {
        self.message_contains("Duplicate nodes")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
