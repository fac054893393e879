//! Removal of load balancer nodes that no longer belong to the scaling group.
//!
//! Meant to run periodically. A dead node is first set to DRAINING and
//! deleted on a later run, once it already is DRAINING.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::cloud::types::{Node, NodeCondition};
use crate::cloud::{wait_until_active, AutoscaleApi, ComputeApi, LoadBalancerApi, WaitPolicy};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub group_id: String,
    pub load_balancers: Vec<u64>,
    /// Addresses treated as group members even though they are not.
    pub whitelist: Vec<String>,
    /// Also remove nodes the load balancer still reports as ONLINE.
    pub delete_online: bool,
    pub wait: WaitPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Keep,
    Drain,
    Delete,
    /// Not in the group but still serving, and not overridden.
    LeaveOnline,
}

/// Decides what to do with one node.
pub fn plan_node(node: &Node, in_group: bool, delete_online: bool) -> NodeAction {
    if in_group {
        NodeAction::Keep
    } else if node.is_online() && !delete_online {
        NodeAction::LeaveOnline
    } else if node.condition != NodeCondition::Draining {
        NodeAction::Drain
    } else {
        NodeAction::Delete
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub lb_id: u64,
    pub node_id: u64,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub drained: Vec<NodeRef>,
    pub deleted: Vec<NodeRef>,
    pub left_online: Vec<NodeRef>,
    /// Load balancers that could not be processed, with the error.
    pub failed: Vec<(u64, String)>,
}

/// Every address of every active group member, plus the whitelist.
pub async fn group_addresses<C>(cloud: &C, group_id: &str, whitelist: &[String]) -> Result<BTreeSet<String>>
where
    C: AutoscaleApi + ComputeApi + ?Sized,
{
    let mut addresses: BTreeSet<String> = whitelist.iter().cloned().collect();
    let state = cloud.group_state(group_id).await?;
    for member in &state.active {
        let server = cloud.get_server(&member.id).await?;
        addresses.extend(server.all_addresses().map(str::to_string));
    }
    Ok(addresses)
}

/// Removes nodes of `options.load_balancers` that no longer belong to a
/// server in the group.
///
/// Enabled dead nodes are drained, nodes already draining are deleted, and
/// ONLINE nodes stay unless `delete_online` is set. Whitelisted addresses
/// are never touched.
///
/// # Errors
///
/// Fails only when the group's servers cannot be listed. A load balancer
/// that cannot be read or changed is recorded in `PruneReport::failed` and
/// the others are still processed.
pub async fn prune_dead_nodes<C>(cloud: &C, options: &PruneOptions) -> Result<PruneReport>
where
    C: AutoscaleApi + LoadBalancerApi + ComputeApi + ?Sized,
{
    let addresses = group_addresses(cloud, &options.group_id, &options.whitelist).await?;
    let mut report = PruneReport::default();

    for &lb_id in &options.load_balancers {
        if let Err(e) = prune_load_balancer(cloud, lb_id, &addresses, options, &mut report).await {
            warn!(lb_id, error = %e, "failed to prune load balancer");
            report.failed.push((lb_id, e.to_string()));
        }
    }

    Ok(report)
}

async fn prune_load_balancer<C>(
    cloud: &C,
    lb_id: u64,
    addresses: &BTreeSet<String>,
    options: &PruneOptions,
    report: &mut PruneReport,
) -> Result<()>
where
    C: LoadBalancerApi + ?Sized,
{
    let lb = cloud.get_load_balancer(lb_id).await?;
    if lb.nodes.is_empty() {
        return Ok(());
    }

    for node in &lb.nodes {
        let action = plan_node(node, addresses.contains(&node.address), options.delete_online);
        let node_ref = NodeRef {
            lb_id,
            node_id: node.id,
            address: node.address.clone(),
        };

        match action {
            NodeAction::Keep => {}
            NodeAction::LeaveOnline => {
                info!(
                    lb_id,
                    address = %node.address,
                    "node not in scaling group, but is online and not overriding"
                );
                report.left_online.push(node_ref);
            }
            NodeAction::Drain => {
                wait_until_active(cloud, lb_id, options.wait).await?;
                info!(
                    lb_id,
                    address = %node.address,
                    status = %node.status,
                    "node not found in scaling group or whitelist, draining"
                );
                cloud
                    .set_node_condition(lb_id, node.id, NodeCondition::Draining)
                    .await?;
                report.drained.push(node_ref);
            }
            NodeAction::Delete => {
                wait_until_active(cloud, lb_id, options.wait).await?;
                info!(
                    lb_id,
                    address = %node.address,
                    status = %node.status,
                    "node not found in scaling group or whitelist and draining, deleting"
                );
                cloud.delete_node(lb_id, node.id).await?;
                report.deleted.push(node_ref);
            }
        }
    }

    Ok(())
}
