//! Config file for the external autoscaler that fires the group's webhooks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Settings, AUTOSCALE, CLOUD, RAX_AUTOSCALER};
use crate::credentials::Credentials;
use crate::error::{Error, Result};

pub const GROUP_KEY: &str = "group0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub os_username: String,
    pub os_password: String,
    pub os_region_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub group_id: String,
    pub scale_up_policy: String,
    pub scale_down_policy: String,
    pub load_balancers: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_static_servers: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerExport {
    pub auth: Auth,
    pub autoscale_groups: BTreeMap<String, GroupEntry>,
}

fn missing(section: &str, key: &str) -> Error {
    Error::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

impl AutoscalerExport {
    /// Builds the export from a reconciled config.
    ///
    /// # Errors
    ///
    /// The group id, both policy ids and a region must be known, so `apply`
    /// has to have run first.
    pub fn build(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let ras = &settings.autoscaler;
        let group_id = settings
            .group
            .id
            .clone()
            .ok_or_else(|| missing(AUTOSCALE, "id"))?;
        let scale_up_policy = ras
            .scale_up_policy
            .clone()
            .ok_or_else(|| missing(RAX_AUTOSCALER, "scale_up_policy"))?;
        let scale_down_policy = ras
            .scale_down_policy
            .clone()
            .ok_or_else(|| missing(RAX_AUTOSCALER, "scale_down_policy"))?;
        let region = credentials
            .region
            .clone()
            .ok_or_else(|| missing(CLOUD, "region"))?;

        let entry = GroupEntry {
            group_id,
            scale_up_policy,
            scale_down_policy,
            load_balancers: ras.unique_load_balancers(),
            num_static_servers: ras.num_static_servers,
        };

        Ok(Self {
            auth: Auth {
                os_username: credentials.username.clone(),
                os_password: credentials.api_key.clone(),
                os_region_name: region,
            },
            autoscale_groups: BTreeMap::from([(GROUP_KEY.to_string(), entry)]),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()? + "\n")?;
        info!(path = %path.display(), "wrote autoscaler config");
        Ok(())
    }
}
