//! Wire types for the autoscale, load balancer and compute APIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scaling group settings (`groupConfiguration`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfiguration {
    pub name: String,
    pub cooldown: u32,
    pub min_entities: u32,
    pub max_entities: u32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Launch configuration (`launchConfiguration`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: LaunchArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    pub server: ServerTemplate,
    #[serde(
        rename = "loadBalancers",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub load_balancers: Vec<LoadBalancerRef>,
}

/// The server each new group member is booted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTemplate {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(
        rename = "OS-DCF:diskConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub disk_config: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub networks: Vec<NetworkRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_drive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkRef {
    pub uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerRef {
    pub load_balancer_id: u64,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingGroup {
    pub id: String,
    pub group_configuration: GroupConfiguration,
    pub launch_configuration: LaunchConfiguration,
    #[serde(default)]
    pub scaling_policies: Vec<Policy>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Entry of `GET /groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    #[serde(default)]
    pub state: GroupState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Vec<ActiveServer>,
    #[serde(default)]
    pub active_capacity: u32,
    #[serde(default)]
    pub pending_capacity: u32,
    #[serde(default)]
    pub desired_capacity: u32,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveServer {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

pub const POLICY_TYPE_WEBHOOK: &str = "webhook";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub change: Option<i32>,
    pub cooldown: u32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Body for creating or replacing a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    pub change: i32,
    pub cooldown: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PolicySpec {
    pub fn webhook(name: impl Into<String>, change: i32, cooldown: u32) -> Self {
        Self {
            name: name.into(),
            change,
            cooldown,
            kind: POLICY_TYPE_WEBHOOK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Webhook {
    /// The anonymous execution URL of the webhook.
    pub fn capability_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "capability")
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeCondition {
    Enabled,
    Disabled,
    Draining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
    #[serde(default)]
    pub status: String,
}

impl Node {
    pub fn is_online(&self) -> bool {
        self.status == "ONLINE"
    }
}

/// Body for adding a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    pub status: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl LoadBalancer {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

/// Load balancer health monitor. An unconfigured monitor has no type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMonitor {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status_regex: Option<String>,
    #[serde(default)]
    pub body_regex: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub host_header: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<Address>>,
}

impl Server {
    /// All addresses across every attached network.
    pub fn all_addresses(&self) -> impl Iterator<Item = &str> {
        self.addresses
            .values()
            .flat_map(|addrs| addrs.iter().map(|a| a.addr.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(alias = "label")]
    pub name: String,
}
