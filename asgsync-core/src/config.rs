//! TOML configuration file describing the desired scaling group.
//!
//! The file has four sections:
//!
//! * `[autoscale]` - scaling group settings and scale amounts
//! * `[launch-configuration]` - the server every group member boots from
//! * `[rax-autoscaler]` - settings for the external autoscaler, plus the
//!   policy ids and webhook URLs this tool writes back
//! * `[cloud]` or `[rackspace_cloud]` - credentials (see [`crate::credentials`])

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cloud::types::LoadBalancerRef;
use crate::error::{Error, Result};
use crate::path_utils::{expand_tilde, is_readable};

pub const AUTOSCALE: &str = "autoscale";
pub const LAUNCH_CONFIGURATION: &str = "launch-configuration";
pub const RAX_AUTOSCALER: &str = "rax-autoscaler";

pub const DEFAULT_LAUNCH_TYPE: &str = "launch_server";

fn default_metadata() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("rax-autoscaler-setup".to_string(), "1.0".to_string()),
        (
            "build_config".to_string(),
            "rack_user_only, monitoring_agent_only".to_string(),
        ),
    ])
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoscaleSection {
    pub id: Option<String>,
    pub name: Option<String>,
    pub scale_up: Option<i64>,
    pub scale_down: Option<i64>,
    pub max_entities: Option<i64>,
    pub min_entities: Option<i64>,
    pub cooldown: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchLoadBalancer {
    pub id: u64,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchSection {
    pub name: Option<String>,
    pub networks: Option<Vec<String>>,
    pub key_name: Option<String>,
    pub disk_config: Option<String>,
    pub cloud_init: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub flavor: Option<String>,
    pub image: Option<String>,
    pub config_drive: Option<bool>,
    pub skip_default_networks: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub load_balancers: Option<Vec<LaunchLoadBalancer>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoscalerSection {
    pub scale_up_webhook: Option<String>,
    pub scale_down_webhook: Option<String>,
    pub scale_up_policy: Option<String>,
    pub scale_down_policy: Option<String>,
    pub load_balancers: Option<Vec<u64>>,
    pub private_key: Option<String>,
    pub admin_server: Option<String>,
    pub num_static_servers: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudSection {
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub region: Option<String>,
    pub credentials_file: Option<String>,
    pub identity_url: Option<String>,
}

/// Typed but unvalidated view of the whole file. Unknown sections are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sections {
    #[serde(default)]
    pub autoscale: AutoscaleSection,
    #[serde(default, rename = "launch-configuration")]
    pub launch: LaunchSection,
    #[serde(default, rename = "rax-autoscaler")]
    pub autoscaler: AutoscalerSection,
    #[serde(default)]
    pub cloud: Option<CloudSection>,
    #[serde(default)]
    pub rackspace_cloud: Option<CloudSection>,
}

pub const CLOUD: &str = "cloud";
pub const RACKSPACE_CLOUD: &str = "rackspace_cloud";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskConfig {
    Auto,
    Manual,
}

impl DiskConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskConfig::Auto => "AUTO",
            DiskConfig::Manual => "MANUAL",
        }
    }
}

impl FromStr for DiskConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(DiskConfig::Auto),
            "MANUAL" => Ok(DiskConfig::Manual),
            _ => Err(Error::InvalidValue {
                section: LAUNCH_CONFIGURATION.to_string(),
                key: "disk_config".to_string(),
                expected: "AUTO or MANUAL".to_string(),
            }),
        }
    }
}

impl fmt::Display for DiskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub id: Option<String>,
    pub name: String,
    pub scale_up: i32,
    pub scale_down: i32,
    pub min_entities: u32,
    pub max_entities: u32,
    pub cooldown: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub server_name: String,
    pub image: String,
    pub flavor: String,
    pub disk_config: DiskConfig,
    pub metadata: BTreeMap<String, String>,
    pub key_name: String,
    /// Networks chosen in the file, without the default networks.
    pub networks: Vec<String>,
    pub skip_default_networks: bool,
    pub cloud_init: Option<PathBuf>,
    pub config_drive: bool,
    pub kind: String,
    pub load_balancers: Vec<LoadBalancerRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoscalerSpec {
    pub load_balancers: Vec<u64>,
    pub private_key: Option<PathBuf>,
    pub admin_server: Option<String>,
    pub num_static_servers: Option<u32>,
    pub scale_up_policy: Option<String>,
    pub scale_down_policy: Option<String>,
    pub scale_up_webhook: Option<String>,
    pub scale_down_webhook: Option<String>,
}

impl AutoscalerSpec {
    /// Watched load balancers in file order, each listed once.
    pub fn unique_load_balancers(&self) -> Vec<u64> {
        let mut seen = BTreeSet::new();
        self.load_balancers
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// A fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub group: GroupSpec,
    pub launch: LaunchSpec,
    pub autoscaler: AutoscalerSpec,
}

fn missing(section: &str, key: &str) -> Error {
    Error::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn require<T: Clone>(value: &Option<T>, section: &str, key: &str) -> Result<T> {
    value.clone().ok_or_else(|| missing(section, key))
}

fn require_str(value: &Option<String>, section: &str, key: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| missing(section, key))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_u32(value: i64, section: &str, key: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        expected: "non-negative integer".to_string(),
    })
}

fn to_i32(value: i64, section: &str, key: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        expected: "32-bit integer".to_string(),
    })
}

impl AutoscaleSection {
    pub fn validate(&self) -> Result<GroupSpec> {
        let s = AUTOSCALE;
        let name = require_str(&self.name, s, "name")?;
        let scale_up = to_i32(require(&self.scale_up, s, "scale_up")?, s, "scale_up")?;
        let scale_down = to_i32(require(&self.scale_down, s, "scale_down")?, s, "scale_down")?;
        let max_entities = to_u32(require(&self.max_entities, s, "max_entities")?, s, "max_entities")?;
        let min_entities = to_u32(require(&self.min_entities, s, "min_entities")?, s, "min_entities")?;
        let cooldown = to_u32(require(&self.cooldown, s, "cooldown")?, s, "cooldown")?;

        if min_entities > max_entities {
            return Err(Error::Validation(format!(
                "min_entities ({}) must be smaller than or equal to max_entities ({})",
                min_entities, max_entities
            )));
        }

        Ok(GroupSpec {
            id: non_empty(&self.id),
            name,
            scale_up,
            scale_down,
            min_entities,
            max_entities,
            cooldown,
        })
    }
}

impl LaunchSection {
    pub fn validate(&self) -> Result<LaunchSpec> {
        let s = LAUNCH_CONFIGURATION;
        let cloud_init = match non_empty(&self.cloud_init) {
            Some(path) => {
                let path = expand_tilde(&path);
                if !is_readable(&path) {
                    return Err(Error::UnreadableFile(path));
                }
                Some(path)
            }
            None => None,
        };

        Ok(LaunchSpec {
            server_name: require_str(&self.name, s, "name")?,
            image: require_str(&self.image, s, "image")?,
            flavor: require_str(&self.flavor, s, "flavor")?,
            disk_config: require_str(&self.disk_config, s, "disk_config")?.parse()?,
            metadata: self.metadata.clone().unwrap_or_else(default_metadata),
            key_name: require_str(&self.key_name, s, "key_name")?,
            networks: require(&self.networks, s, "networks")?,
            skip_default_networks: require(&self.skip_default_networks, s, "skip_default_networks")?,
            config_drive: self.config_drive.unwrap_or(true),
            cloud_init,
            kind: non_empty(&self.kind).unwrap_or_else(|| DEFAULT_LAUNCH_TYPE.to_string()),
            load_balancers: self
                .load_balancers
                .iter()
                .flatten()
                .map(|lb| LoadBalancerRef {
                    load_balancer_id: lb.id,
                    port: lb.port,
                })
                .collect(),
        })
    }
}

impl AutoscalerSection {
    pub fn validate(&self, needs_template_vars: bool) -> Result<AutoscalerSpec> {
        let s = RAX_AUTOSCALER;
        let load_balancers = require(&self.load_balancers, s, "load_balancers")?;

        let private_key = non_empty(&self.private_key).map(|p| expand_tilde(&p));
        let admin_server = non_empty(&self.admin_server);
        if needs_template_vars {
            match &private_key {
                None => return Err(missing(s, "private_key")),
                Some(path) if !is_readable(path) => {
                    return Err(Error::UnreadableFile(path.clone()))
                }
                Some(_) => {}
            }
            if admin_server.is_none() {
                return Err(missing(s, "admin_server"));
            }
        }

        Ok(AutoscalerSpec {
            load_balancers,
            private_key,
            admin_server,
            num_static_servers: self.num_static_servers,
            scale_up_policy: non_empty(&self.scale_up_policy),
            scale_down_policy: non_empty(&self.scale_down_policy),
            scale_up_webhook: non_empty(&self.scale_up_webhook),
            scale_down_webhook: non_empty(&self.scale_down_webhook),
        })
    }
}

impl Sections {
    /// Validates every section into [`Settings`].
    pub fn validate(&self) -> Result<Settings> {
        let launch = self.launch.validate()?;
        let group = self.autoscale.validate()?;
        let autoscaler = self.autoscaler.validate(launch.cloud_init.is_some())?;
        Ok(Settings {
            group,
            launch,
            autoscaler,
        })
    }
}

/// A config file on disk. Every change is written back immediately.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    doc: toml::Table,
}

impl ConfigFile {
    /// Reads and parses the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = Self::read(&path)?;
        Ok(Self { path, doc })
    }

    fn read(path: &Path) -> Result<toml::Table> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|error| Error::Toml {
            error,
            context: path.display().to_string(),
        })
    }

    /// Re-reads the file from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.doc = Self::read(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.doc.get(section)?.as_table()?.get(key)
    }

    /// Key names present in `section`, empty if the section does not exist.
    pub fn keys(&self, section: &str) -> Vec<String> {
        self.doc
            .get(section)
            .and_then(|v| v.as_table())
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sets `key` in `section` (creating the section) and writes the file.
    pub fn set_option(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<toml::Value>,
    ) -> Result<()> {
        let table = self
            .doc
            .entry(section.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        match table {
            toml::Value::Table(t) => {
                t.insert(key.to_string(), value.into());
            }
            _ => {
                return Err(Error::InvalidValue {
                    section: section.to_string(),
                    key: section.to_string(),
                    expected: "table".to_string(),
                })
            }
        }
        self.write()
    }

    fn write(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.doc)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Deserializes a single section, `None` if it is absent.
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.doc
            .get(name)
            .cloned()
            .map(|value| {
                value.try_into().map_err(|error| Error::Toml {
                    error,
                    context: format!("{} [{}]", self.path.display(), name),
                })
            })
            .transpose()
    }

    /// Typed, unvalidated sections.
    pub fn sections(&self) -> Result<Sections> {
        toml::Value::Table(self.doc.clone())
            .try_into()
            .map_err(|error| Error::Toml {
                error,
                context: self.path.display().to_string(),
            })
    }

    /// Parses and validates the whole file.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingKey` naming the first absent key, or a
    /// validation error for out-of-range or unreadable values.
    pub fn settings(&self) -> Result<Settings> {
        self.sections()?.validate()
    }
}
