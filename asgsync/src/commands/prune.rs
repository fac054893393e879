//! Removing dead nodes from load balancers.

use std::path::PathBuf;

use anyhow::{bail, Result};
use asgsync_core::{prune_dead_nodes, PruneOptions, WaitPolicy};

use crate::formatting::{print_node_table, print_success, print_summary_box, print_warning};

pub struct PruneArgs {
    pub group: String,
    pub load_balancers: Vec<u64>,
    pub credentials: PathBuf,
    pub region: Option<String>,
    pub whitelist: Vec<String>,
    pub delete_online: bool,
}

pub async fn cmd_prune(args: PruneArgs) -> Result<()> {
    let client = super::connect(&args.credentials, args.region).await?;
    let options = PruneOptions {
        group_id: args.group,
        load_balancers: args.load_balancers,
        whitelist: args.whitelist,
        delete_online: args.delete_online,
        wait: WaitPolicy::default(),
    };

    let report = prune_dead_nodes(&client, &options).await?;

    let rows: Vec<(u64, String, &str)> = report
        .drained
        .iter()
        .map(|n| (n.lb_id, n.address.clone(), "drained"))
        .chain(report.deleted.iter().map(|n| (n.lb_id, n.address.clone(), "deleted")))
        .chain(
            report
                .left_online
                .iter()
                .map(|n| (n.lb_id, n.address.clone(), "left online")),
        )
        .collect();

    if rows.is_empty() {
        print_success("No dead nodes found");
    } else {
        print_node_table(&rows);
    }
    println!();

    print_summary_box(
        "Prune Summary",
        &[
            ("Drained", &report.drained.len().to_string()),
            ("Deleted", &report.deleted.len().to_string()),
            ("Left online", &report.left_online.len().to_string()),
            ("Failed load balancers", &report.failed.len().to_string()),
        ],
    );

    for (lb_id, error) in &report.failed {
        print_warning(&format!("Load balancer {}: {}", lb_id, error));
    }
    if !report.failed.is_empty() {
        bail!("{} load balancer(s) could not be pruned", report.failed.len());
    }
    Ok(())
}
