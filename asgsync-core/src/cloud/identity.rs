//! Identity v2 authentication and service catalog lookup.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

pub const DEFAULT_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Service types in the catalog.
pub mod service {
    pub const AUTOSCALE: &str = "rax:autoscale";
    pub const LOAD_BALANCER: &str = "rax:load-balancer";
    pub const COMPUTE: &str = "compute";
    pub const IMAGE: &str = "image";
    pub const NETWORK: &str = "network";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Endpoints the token grants access to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCatalog {
    pub entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    /// Public URL of `service` in `region`.
    ///
    /// Region matching is case-insensitive. Endpoints without a region are
    /// global and used when no regional endpoint exists.
    pub fn endpoint(&self, service: &str, region: &str) -> Result<String> {
        let endpoints: Vec<&Endpoint> = self
            .entries
            .iter()
            .filter(|entry| entry.kind == service)
            .flat_map(|entry| entry.endpoints.iter())
            .collect();

        let regional = endpoints.iter().find(|ep| {
            ep.region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(region))
        });
        let global = endpoints.iter().find(|ep| ep.region.is_none());

        regional
            .or(global)
            .map(|ep| ep.public_url.trim_end_matches('/').to_string())
            .ok_or_else(|| Error::MissingEndpoint {
                service: service.to_string(),
                region: region.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

/// A token plus the endpoints it can be used against.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub region: String,
    pub catalog: ServiceCatalog,
}

impl Session {
    pub fn endpoint(&self, service: &str) -> Result<String> {
        self.catalog.endpoint(service, &self.region)
    }
}

/// Exchanges an API key for a token.
pub async fn authenticate(client: &reqwest::Client, credentials: &Credentials) -> Result<Session> {
    let region = credentials
        .region
        .clone()
        .ok_or_else(|| Error::Auth("no region configured".to_string()))?;
    let identity_url = credentials
        .identity_url
        .as_deref()
        .unwrap_or(DEFAULT_IDENTITY_URL)
        .trim_end_matches('/');
    let url = format!("{}/tokens", identity_url);

    debug!(%url, username = %credentials.username, "authenticating");
    let body = json!({
        "auth": {
            "RAX-KSKEY:apiKeyCredentials": {
                "username": credentials.username,
                "apiKey": credentials.api_key,
            }
        }
    });
    let response = client.post(&url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("identity returned {}: {}", status, text)));
    }

    let access: AccessResponse = response.json().await?;
    Ok(Session {
        token: access.access.token.id,
        region,
        catalog: ServiceCatalog {
            entries: access.access.service_catalog,
        },
    })
}
