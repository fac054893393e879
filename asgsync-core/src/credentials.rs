//! Cloud credential resolution.
//!
//! Credentials live in a `[rackspace_cloud]` or `[cloud]` section, either
//! inline (`username`, `api_key`, `region`) or behind a `credentials_file`
//! key pointing to another file with the same layout.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{CloudSection, ConfigFile, CLOUD, RACKSPACE_CLOUD};
use crate::error::{Error, Result};
use crate::path_utils::expand_tilde;

const MAX_INDIRECTION: usize = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
    pub region: Option<String>,
    pub identity_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("identity_url", &self.identity_url)
            .finish()
    }
}

impl Credentials {
    /// Loads credentials from a standalone credentials file.
    ///
    /// The file is TOML, so values must be quoted: `username = "alice"`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Credentials` if the file is not valid TOML or lacks
    /// the keys, and `Error::ConfigUnreadable` if it cannot be opened.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = load(path.as_ref())?;
        Self::from_config(&config)
    }

    /// Resolves credentials from a loaded config file.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        resolve(config, 0)
    }

    /// Replaces the region when `region` is set.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        if region.is_some() {
            self.region = region;
        }
        self
    }
}

fn fail(path: &Path, message: impl Into<String>) -> Error {
    Error::Credentials {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Loads a credentials file, naming the expected format when it does not parse.
fn load(path: &Path) -> Result<ConfigFile> {
    ConfigFile::load(path).map_err(|e| match e {
        Error::Toml { error, .. } => fail(
            path,
            format!(
                "expected a TOML file with quoted values, such as username = \"alice\": {}",
                error.message()
            ),
        ),
        other => other,
    })
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().trim_matches('\'').to_string())
        .filter(|v| !v.is_empty())
}

fn resolve(config: &ConfigFile, depth: usize) -> Result<Credentials> {
    let path = config.path();
    let section: CloudSection = match config.section(RACKSPACE_CLOUD)? {
        Some(section) => section,
        None => config.section(CLOUD)?.ok_or_else(|| {
            fail(path, "the file does not contain a 'cloud' or 'rackspace_cloud' section")
        })?,
    };

    let region = clean(&section.region);
    let identity_url = clean(&section.identity_url);

    if let (Some(username), Some(api_key)) = (clean(&section.username), clean(&section.api_key)) {
        return Ok(Credentials {
            username,
            api_key,
            region,
            identity_url,
        });
    }

    let Some(file) = clean(&section.credentials_file) else {
        return Err(fail(
            path,
            "the file does not contain the keys username and api_key, or credentials_file",
        ));
    };
    if depth >= MAX_INDIRECTION {
        return Err(fail(path, "too many nested credentials_file references"));
    }

    let nested_path: PathBuf = expand_tilde(&file);
    let nested = load(&nested_path)?;
    let mut credentials = resolve(&nested, depth + 1)?;
    if credentials.region.is_none() {
        credentials.region = region;
    }
    if credentials.identity_url.is_none() {
        credentials.identity_url = identity_url;
    }
    Ok(credentials)
}
