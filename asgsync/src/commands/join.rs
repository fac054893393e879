//! Adding this server to load balancers after a passing health check.

use std::path::PathBuf;

use anyhow::{bail, Result};
use asgsync_core::{join_load_balancers, JoinOptions, NetworkProbe};

use crate::formatting::{
    print_key_value, print_section_header, print_success, print_warning, SectionStyle,
};
use crate::net::interface_ipv4;

pub struct JoinArgs {
    pub load_balancers: Vec<u64>,
    pub credentials: PathBuf,
    pub region: Option<String>,
    pub address: Option<String>,
    pub interface: Option<String>,
    pub host_header: Option<String>,
    pub protocol: Option<String>,
}

fn resolve_address(address: Option<String>, interface: Option<String>) -> Result<String> {
    match (address, interface) {
        (Some(address), _) => Ok(address),
        (None, Some(interface)) => Ok(interface_ipv4(&interface)?.to_string()),
        (None, None) => bail!("either --address or --interface is required"),
    }
}

pub async fn cmd_join(args: JoinArgs) -> Result<()> {
    let address = resolve_address(args.address, args.interface)?;
    print_key_value("Address", &address);

    let client = super::connect(&args.credentials, args.region).await?;
    let probe = NetworkProbe::new(args.protocol, args.host_header)?;
    let options = JoinOptions::new(address.clone(), args.load_balancers);

    let report = join_load_balancers(&client, &probe, &options).await?;

    let style = SectionStyle::for_outcome(report.failed.is_empty() && report.skipped.is_empty());
    print_section_header("Load balancers", Some(&address), style);

    for lb_id in &report.added {
        print_success(&format!("Node added to LB {}", lb_id));
    }
    for lb_id in &report.already_present {
        print_success(&format!("Node {} already in LB {}", address, lb_id));
    }
    for (lb_id, error) in &report.skipped {
        print_warning(&format!(
            "Health check for LB {} failed with error: {}  Not adding...",
            lb_id, error
        ));
    }
    for (lb_id, error) in &report.failed {
        print_warning(&format!("Unable to add node to LB {}: {}", lb_id, error));
    }

    if !report.failed.is_empty() {
        bail!("{} load balancer(s) rejected the node", report.failed.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_address_wins() {
        let address = resolve_address(Some("10.1.2.3".to_string()), Some("eth9".to_string())).unwrap();
        assert_eq!(address, "10.1.2.3");
        assert!(resolve_address(None, None).is_err());
    }
}
