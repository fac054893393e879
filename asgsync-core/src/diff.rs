//! Comparison of the live scaling group against the desired state.
//!
//! Lists whose order the API does not preserve (networks, load balancers)
//! are compared as sets. User data is compared after base64 decoding.

use std::collections::BTreeSet;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cloud::types::{GroupConfiguration, LaunchConfiguration, Policy, PolicySpec, ScalingGroup};
use crate::desired::DesiredGroup;

/// A single key whose live value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub key: String,
    pub live: String,
    pub desired: String,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} != {}", self.key, self.live, self.desired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDiff {
    /// No policy with the expected name exists on the group.
    Missing,
    Changed(Vec<Difference>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDiff {
    pub scaling_group: Vec<Difference>,
    pub launch_config: Vec<Difference>,
    pub scale_up_policy: Option<PolicyDiff>,
    pub scale_down_policy: Option<PolicyDiff>,
}

impl GroupDiff {
    pub fn is_empty(&self) -> bool {
        self.scaling_group.is_empty()
            && self.launch_config.is_empty()
            && self.scale_up_policy.is_none()
            && self.scale_down_policy.is_none()
    }

    /// Every difference, in report order.
    pub fn differences(&self) -> Vec<Difference> {
        let policy = |name: &str, diff: &Option<PolicyDiff>| match diff {
            None => Vec::new(),
            Some(PolicyDiff::Missing) => vec![Difference {
                key: name.to_string(),
                live: "(missing)".to_string(),
                desired: "policy".to_string(),
            }],
            Some(PolicyDiff::Changed(diffs)) => diffs.clone(),
        };

        self.scaling_group
            .iter()
            .cloned()
            .chain(policy("scale_up", &self.scale_up_policy))
            .chain(policy("scale_down", &self.scale_down_policy))
            .chain(self.launch_config.iter().cloned())
            .collect()
    }
}

fn push<T: PartialEq + fmt::Debug>(diffs: &mut Vec<Difference>, key: &str, live: T, desired: T) {
    if live != desired {
        diffs.push(Difference {
            key: key.to_string(),
            live: format!("{:?}", live),
            desired: format!("{:?}", desired),
        });
    }
}

pub fn find_policy<'a>(policies: &'a [Policy], name: &str) -> Option<&'a Policy> {
    policies.iter().find(|p| p.name == name)
}

/// Differences in name, cooldown and entity bounds. Group metadata is not managed.
pub fn diff_group_config(live: &GroupConfiguration, desired: &GroupConfiguration) -> Vec<Difference> {
    let mut diffs = Vec::new();
    push(&mut diffs, "name", &live.name, &desired.name);
    push(&mut diffs, "cooldown", live.cooldown, desired.cooldown);
    push(&mut diffs, "min_entities", live.min_entities, desired.min_entities);
    push(&mut diffs, "max_entities", live.max_entities, desired.max_entities);
    diffs
}

pub fn diff_policy(live: Option<&Policy>, desired: &PolicySpec) -> Option<PolicyDiff> {
    let Some(live) = live else {
        return Some(PolicyDiff::Missing);
    };

    let mut diffs = Vec::new();
    push(&mut diffs, &desired.name, live.change, Some(desired.change));
    push(
        &mut diffs,
        &format!("{}.cooldown", desired.name),
        live.cooldown,
        desired.cooldown,
    );
    push(&mut diffs, &format!("{}.type", desired.name), &live.kind, &desired.kind);

    if diffs.is_empty() {
        None
    } else {
        Some(PolicyDiff::Changed(diffs))
    }
}

fn decoded(user_data: &Option<String>) -> Option<Vec<u8>> {
    user_data.as_ref().map(|data| {
        let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .unwrap_or_else(|_| data.as_bytes().to_vec())
    })
}

fn describe_user_data(data: &Option<Vec<u8>>) -> String {
    match data {
        Some(bytes) => format!("<{} bytes>", bytes.len()),
        None => "(unset)".to_string(),
    }
}

fn upper(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.to_ascii_uppercase())
}

pub fn diff_launch_config(live: &LaunchConfiguration, desired: &LaunchConfiguration) -> Vec<Difference> {
    let mut diffs = Vec::new();
    let (ls, ds) = (&live.args.server, &desired.args.server);

    push(&mut diffs, "type", &live.kind, &desired.kind);
    push(&mut diffs, "name", ls.name.as_str(), ds.name.as_str());
    push(&mut diffs, "flavor", &ls.flavor_ref, &ds.flavor_ref);
    push(&mut diffs, "image", &ls.image_ref, &ds.image_ref);
    push(&mut diffs, "disk_config", upper(&ls.disk_config), upper(&ds.disk_config));
    push(&mut diffs, "metadata", &ls.metadata, &ds.metadata);
    push(&mut diffs, "key_name", &ls.key_name, &ds.key_name);

    let live_networks: BTreeSet<&str> = ls.networks.iter().map(|n| n.uuid.as_str()).collect();
    let desired_networks: BTreeSet<&str> = ds.networks.iter().map(|n| n.uuid.as_str()).collect();
    push(&mut diffs, "networks", live_networks, desired_networks);

    let live_lbs: BTreeSet<(u64, u16)> = live
        .args
        .load_balancers
        .iter()
        .map(|lb| (lb.load_balancer_id, lb.port))
        .collect();
    let desired_lbs: BTreeSet<(u64, u16)> = desired
        .args
        .load_balancers
        .iter()
        .map(|lb| (lb.load_balancer_id, lb.port))
        .collect();
    push(&mut diffs, "load_balancers", live_lbs, desired_lbs);

    let (live_data, desired_data) = (decoded(&ls.user_data), decoded(&ds.user_data));
    if live_data != desired_data {
        diffs.push(Difference {
            key: "user_data".to_string(),
            live: describe_user_data(&live_data),
            desired: describe_user_data(&desired_data),
        });
    }

    push(
        &mut diffs,
        "config_drive",
        ls.config_drive.unwrap_or(false),
        ds.config_drive.unwrap_or(false),
    );
    diffs
}

/// Compares a live group and its policies with the desired state.
pub fn diff_group(live: &ScalingGroup, live_policies: &[Policy], desired: &DesiredGroup) -> GroupDiff {
    GroupDiff {
        scaling_group: diff_group_config(&live.group_configuration, &desired.config),
        launch_config: diff_launch_config(&live.launch_configuration, &desired.launch),
        scale_up_policy: diff_policy(
            find_policy(live_policies, &desired.scale_up.name),
            &desired.scale_up,
        ),
        scale_down_policy: diff_policy(
            find_policy(live_policies, &desired.scale_down.name),
            &desired.scale_down,
        ),
    }
}
