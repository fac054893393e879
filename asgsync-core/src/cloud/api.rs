//! Traits for the remote services the tool drives.
//!
//! `RackspaceClient` implements all of them over HTTP; tests substitute
//! in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{
    Flavor, GroupConfiguration, GroupState, GroupSummary, HealthMonitor, Image, KeyPair,
    LaunchConfiguration, LoadBalancer, Network, NewNode, NodeCondition, Policy, PolicySpec,
    ScalingGroup, Server, Webhook,
};

/// Autoscale service: groups, policies and webhooks.
#[async_trait]
pub trait AutoscaleApi: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupSummary>>;

    /// Fetches a group. A missing group is an error with `is_not_found()`.
    async fn get_group(&self, group_id: &str) -> Result<ScalingGroup>;

    async fn create_group(
        &self,
        config: &GroupConfiguration,
        launch: &LaunchConfiguration,
        policies: &[PolicySpec],
    ) -> Result<ScalingGroup>;

    async fn update_group_config(&self, group_id: &str, config: &GroupConfiguration) -> Result<()>;

    async fn update_launch_config(&self, group_id: &str, launch: &LaunchConfiguration)
        -> Result<()>;

    async fn group_state(&self, group_id: &str) -> Result<GroupState>;

    async fn list_policies(&self, group_id: &str) -> Result<Vec<Policy>>;

    async fn create_policy(&self, group_id: &str, policy: &PolicySpec) -> Result<Policy>;

    async fn update_policy(&self, group_id: &str, policy_id: &str, policy: &PolicySpec)
        -> Result<()>;

    async fn list_webhooks(&self, group_id: &str, policy_id: &str) -> Result<Vec<Webhook>>;

    async fn create_webhook(&self, group_id: &str, policy_id: &str, name: &str) -> Result<Webhook>;

    async fn get_webhook(&self, group_id: &str, policy_id: &str, webhook_id: &str)
        -> Result<Webhook>;
}

/// Cloud load balancers.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>>;

    async fn get_load_balancer(&self, lb_id: u64) -> Result<LoadBalancer>;

    async fn health_monitor(&self, lb_id: u64) -> Result<HealthMonitor>;

    async fn add_node(&self, lb_id: u64, node: &NewNode) -> Result<()>;

    async fn set_node_condition(&self, lb_id: u64, node_id: u64, condition: NodeCondition)
        -> Result<()>;

    async fn delete_node(&self, lb_id: u64, node_id: u64) -> Result<()>;
}

/// Compute, image and network catalogue lookups.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn get_server(&self, server_id: &str) -> Result<Server>;

    async fn list_flavors(&self) -> Result<Vec<Flavor>>;

    async fn list_images(&self) -> Result<Vec<Image>>;

    async fn list_keypairs(&self) -> Result<Vec<KeyPair>>;

    /// Uploads a public key. A taken name is an error with `is_conflict()`.
    async fn create_keypair(&self, name: &str, public_key: &str) -> Result<KeyPair>;

    async fn list_networks(&self) -> Result<Vec<Network>>;
}
