mod common;

use asgsync_core::cloud::types::{LoadBalancerRef, NetworkRef, PolicySpec};
use asgsync_core::diff::{diff_group, diff_launch_config, PolicyDiff};
use asgsync_core::DesiredGroup;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use proptest::prelude::*;

use common::{group_config, launch_config, policy};

fn desired() -> DesiredGroup {
    DesiredGroup {
        id: Some("group-1".to_string()),
        config: group_config("web"),
        launch: launch_config("web"),
        scale_up: PolicySpec::webhook("scale_up", 2, 60),
        scale_down: PolicySpec::webhook("scale_down", -1, 60),
    }
}

fn live_group(desired: &DesiredGroup) -> asgsync_core::cloud::types::ScalingGroup {
    asgsync_core::cloud::types::ScalingGroup {
        id: "group-1".to_string(),
        group_configuration: desired.config.clone(),
        launch_configuration: desired.launch.clone(),
        scaling_policies: Vec::new(),
        links: Vec::new(),
    }
}

#[test]
fn test_identical_state_has_no_diff() {
    let desired = desired();
    let policies = vec![
        policy("p-up", "scale_up", 2, 60),
        policy("p-down", "scale_down", -1, 60),
    ];
    let diff = diff_group(&live_group(&desired), &policies, &desired);
    assert!(diff.is_empty(), "{:?}", diff);
    assert!(diff.differences().is_empty());
}

#[test]
fn test_each_section_reported() {
    let desired = desired();
    let mut live = live_group(&desired);
    live.group_configuration.cooldown = 300;
    live.launch_configuration.args.server.flavor_ref = "general1-8".to_string();
    let policies = vec![policy("p-up", "scale_up", 1, 60)];

    let diff = diff_group(&live, &policies, &desired);
    assert_eq!(diff.scaling_group.len(), 1);
    assert_eq!(diff.scaling_group[0].to_string(), "cooldown: 300 != 60");
    assert_eq!(diff.launch_config.len(), 1);
    assert_eq!(diff.launch_config[0].key, "flavor");
    assert!(matches!(diff.scale_up_policy, Some(PolicyDiff::Changed(_))));
    assert_eq!(diff.scale_down_policy, Some(PolicyDiff::Missing));

    let keys: Vec<String> = diff.differences().into_iter().map(|d| d.key).collect();
    assert_eq!(keys, vec!["cooldown", "scale_up", "scale_down", "flavor"]);
}

#[test]
fn test_user_data_compared_after_decoding() {
    let desired = {
        let mut d = desired();
        d.launch.args.server.user_data = Some(STANDARD.encode("#cloud-config\nruncmd: []\n"));
        d
    };
    let mut live = desired.launch.clone();
    let wrapped = STANDARD.encode("#cloud-config\nruncmd: []\n");
    let (head, tail) = wrapped.split_at(8);
    live.args.server.user_data = Some(format!("{}\n{}", head, tail));
    assert!(diff_launch_config(&live, &desired.launch).is_empty());

    live.args.server.user_data = Some(STANDARD.encode("#cloud-config\n"));
    let diffs = diff_launch_config(&live, &desired.launch);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].key, "user_data");
}

#[test]
fn test_missing_config_drive_equals_false() {
    let mut live = launch_config("web");
    let mut desired = live.clone();
    live.args.server.config_drive = None;
    desired.args.server.config_drive = Some(false);
    assert!(diff_launch_config(&live, &desired).is_empty());
}

#[test]
fn test_server_name_and_metadata() {
    let live = launch_config("web");
    let mut desired = live.clone();
    desired.args.server.name = "api".to_string();
    desired
        .args
        .server
        .metadata
        .insert("team".to_string(), "ops".to_string());
    let keys: Vec<String> = diff_launch_config(&live, &desired)
        .into_iter()
        .map(|d| d.key)
        .collect();
    assert_eq!(keys, vec!["name", "metadata"]);
}

fn networks() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-f0-9]{8}", 0..6).prop_map(|set| set.into_iter().collect())
}

fn load_balancers() -> impl Strategy<Value = Vec<(u64, u16)>> {
    prop::collection::btree_set((1u64..10_000, 1u16..1024), 0..6)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn test_network_order_is_ignored(nets in networks(), seed in any::<u64>()) {
        let mut live = launch_config("web");
        live.args.server.networks = nets.iter().map(|uuid| NetworkRef { uuid: uuid.clone() }).collect();

        let mut shuffled = nets.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
        }
        shuffled.reverse();
        let mut desired = live.clone();
        desired.args.server.networks = shuffled.into_iter().map(|uuid| NetworkRef { uuid }).collect();

        prop_assert!(diff_launch_config(&live, &desired).is_empty());
    }

    #[test]
    fn test_load_balancer_order_is_ignored(lbs in load_balancers()) {
        let refs: Vec<LoadBalancerRef> = lbs
            .iter()
            .map(|&(load_balancer_id, port)| LoadBalancerRef { load_balancer_id, port })
            .collect();
        let mut live = launch_config("web");
        live.args.load_balancers = refs.clone();
        let mut desired = live.clone();
        desired.args.load_balancers = refs.into_iter().rev().collect();

        prop_assert!(diff_launch_config(&live, &desired).is_empty());
    }

    #[test]
    fn test_extra_network_is_detected(nets in networks(), extra in "[g-z]{8}") {
        let mut live = launch_config("web");
        live.args.server.networks = nets.iter().map(|uuid| NetworkRef { uuid: uuid.clone() }).collect();
        let mut desired = live.clone();
        desired.args.server.networks.push(NetworkRef { uuid: extra });

        let diffs = diff_launch_config(&live, &desired);
        prop_assert_eq!(diffs.len(), 1);
        prop_assert_eq!(diffs[0].key.as_str(), "networks");
    }
}
