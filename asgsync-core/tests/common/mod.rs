//! In-memory cloud and scripted console shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use asgsync_core::cloud::types::{
    ActiveServer, Address, Flavor, GroupConfiguration, GroupState, GroupSummary, HealthMonitor,
    Image, KeyPair, LaunchArgs, LaunchConfiguration, Link, LoadBalancer, Network, NetworkRef,
    NewNode, Node, NodeCondition, Policy, PolicySpec, ScalingGroup, Server, ServerTemplate,
    Webhook,
};
use asgsync_core::cloud::{AutoscaleApi, ComputeApi, LoadBalancerApi};
use asgsync_core::{Console, Error, Result, Tone};

fn api_error(status: u16, message: impl Into<String>) -> Error {
    Error::Api {
        status,
        message: message.into(),
    }
}

fn not_found(what: impl std::fmt::Display) -> Error {
    api_error(404, format!("{} not found", what))
}

pub fn capability(id: &str) -> Vec<Link> {
    vec![Link {
        href: format!("https://hooks.example.com/{}", id),
        rel: "capability".to_string(),
    }]
}

#[derive(Default)]
pub struct State {
    pub groups: BTreeMap<String, ScalingGroup>,
    pub policies: BTreeMap<String, Vec<Policy>>,
    /// Webhooks by policy id.
    pub webhooks: BTreeMap<String, Vec<Webhook>>,
    pub group_states: BTreeMap<String, GroupState>,
    pub servers: BTreeMap<String, Server>,
    pub load_balancers: BTreeMap<u64, LoadBalancer>,
    pub monitors: BTreeMap<u64, HealthMonitor>,
    /// Polls answered with PENDING_UPDATE before the load balancer turns ACTIVE.
    pub busy_polls: BTreeMap<u64, u32>,
    /// Errors returned by `add_node`, in order, before it succeeds.
    pub add_node_errors: BTreeMap<u64, VecDeque<(u16, String)>>,
    pub flavors: Vec<Flavor>,
    pub images: Vec<Image>,
    pub keypairs: Vec<KeyPair>,
    pub networks: Vec<Network>,
    /// Every mutating call, e.g. `update_policy group-1 policy-2`.
    pub calls: Vec<String>,
    next_id: u64,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn add_group(&self, group: ScalingGroup, policies: Vec<Policy>) {
        let mut state = self.state();
        for policy in &policies {
            let hook_id = format!("hook-{}", policy.id);
            state.webhooks.entry(policy.id.clone()).or_default().push(Webhook {
                id: hook_id.clone(),
                name: format!("{}_webhook", policy.name),
                links: capability(&hook_id),
            });
        }
        state.policies.insert(group.id.clone(), policies);
        state.groups.insert(group.id.clone(), group);
    }

    pub fn add_load_balancer(&self, lb: LoadBalancer) {
        self.state().load_balancers.insert(lb.id, lb);
    }

    pub fn add_server(&self, group_id: &str, server: Server) {
        let mut state = self.state();
        state
            .group_states
            .entry(group_id.to_string())
            .or_default()
            .active
            .push(ActiveServer {
                id: server.id.clone(),
                links: Vec::new(),
            });
        state.servers.insert(server.id.clone(), server);
    }
}

pub fn group_config(name: &str) -> GroupConfiguration {
    GroupConfiguration {
        name: name.to_string(),
        cooldown: 60,
        min_entities: 1,
        max_entities: 4,
        metadata: BTreeMap::new(),
    }
}

pub fn launch_config(name: &str) -> LaunchConfiguration {
    LaunchConfiguration {
        kind: "launch_server".to_string(),
        args: LaunchArgs {
            server: ServerTemplate {
                name: name.to_string(),
                image_ref: "image-1".to_string(),
                flavor_ref: "general1-1".to_string(),
                disk_config: Some("AUTO".to_string()),
                metadata: BTreeMap::new(),
                networks: vec![NetworkRef {
                    uuid: "11111111-1111-1111-1111-111111111111".to_string(),
                }],
                key_name: Some("deploy".to_string()),
                user_data: None,
                config_drive: Some(true),
            },
            load_balancers: Vec::new(),
        },
    }
}

pub fn policy(id: &str, name: &str, change: i32, cooldown: u32) -> Policy {
    Policy {
        id: id.to_string(),
        name: name.to_string(),
        change: Some(change),
        cooldown,
        kind: "webhook".to_string(),
        links: Vec::new(),
    }
}

pub fn node(id: u64, address: &str, status: &str, condition: NodeCondition) -> Node {
    Node {
        id,
        address: address.to_string(),
        port: 80,
        condition,
        status: status.to_string(),
    }
}

pub fn load_balancer(id: u64, nodes: Vec<Node>) -> LoadBalancer {
    LoadBalancer {
        id,
        name: format!("lb-{}", id),
        port: 80,
        protocol: "HTTP".to_string(),
        status: "ACTIVE".to_string(),
        nodes,
    }
}

pub fn server(id: &str, addresses: &[(&str, &str)]) -> Server {
    let mut map: BTreeMap<String, Vec<Address>> = BTreeMap::new();
    for (network, addr) in addresses {
        map.entry(network.to_string()).or_default().push(Address {
            addr: addr.to_string(),
            version: 4,
        });
    }
    Server {
        id: id.to_string(),
        name: id.to_string(),
        addresses: map,
    }
}

#[async_trait]
impl AutoscaleApi for FakeCloud {
    async fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let state = self.state();
        Ok(state
            .groups
            .values()
            .map(|g| GroupSummary {
                id: g.id.clone(),
                state: GroupState {
                    name: Some(g.group_configuration.name.clone()),
                    ..Default::default()
                },
            })
            .collect())
    }

    async fn get_group(&self, group_id: &str) -> Result<ScalingGroup> {
        self.state()
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| not_found(group_id))
    }

    async fn create_group(
        &self,
        config: &GroupConfiguration,
        launch: &LaunchConfiguration,
        policies: &[PolicySpec],
    ) -> Result<ScalingGroup> {
        let mut state = self.state();
        let id = state.next("group");
        let created: Vec<Policy> = policies
            .iter()
            .map(|spec| Policy {
                id: state.next("policy"),
                name: spec.name.clone(),
                change: Some(spec.change),
                cooldown: spec.cooldown,
                kind: spec.kind.clone(),
                links: Vec::new(),
            })
            .collect();
        let group = ScalingGroup {
            id: id.clone(),
            group_configuration: config.clone(),
            launch_configuration: launch.clone(),
            scaling_policies: created.clone(),
            links: Vec::new(),
        };
        state.calls.push(format!("create_group {}", config.name));
        state.policies.insert(id.clone(), created);
        state.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn update_group_config(&self, group_id: &str, config: &GroupConfiguration) -> Result<()> {
        let mut state = self.state();
        let group = state.groups.get_mut(group_id).ok_or_else(|| not_found(group_id))?;
        group.group_configuration = config.clone();
        state.calls.push(format!("update_group_config {}", group_id));
        Ok(())
    }

    async fn update_launch_config(&self, group_id: &str, launch: &LaunchConfiguration) -> Result<()> {
        let mut state = self.state();
        let group = state.groups.get_mut(group_id).ok_or_else(|| not_found(group_id))?;
        group.launch_configuration = launch.clone();
        state.calls.push(format!("update_launch_config {}", group_id));
        Ok(())
    }

    async fn group_state(&self, group_id: &str) -> Result<GroupState> {
        let state = self.state();
        if !state.groups.contains_key(group_id) {
            return Err(not_found(group_id));
        }
        Ok(state.group_states.get(group_id).cloned().unwrap_or_default())
    }

    async fn list_policies(&self, group_id: &str) -> Result<Vec<Policy>> {
        self.state()
            .policies
            .get(group_id)
            .cloned()
            .ok_or_else(|| not_found(group_id))
    }

    async fn create_policy(&self, group_id: &str, spec: &PolicySpec) -> Result<Policy> {
        let mut state = self.state();
        let policy = Policy {
            id: state.next("policy"),
            name: spec.name.clone(),
            change: Some(spec.change),
            cooldown: spec.cooldown,
            kind: spec.kind.clone(),
            links: Vec::new(),
        };
        state.calls.push(format!("create_policy {} {}", group_id, spec.name));
        state
            .policies
            .entry(group_id.to_string())
            .or_default()
            .push(policy.clone());
        Ok(policy)
    }

    async fn update_policy(&self, group_id: &str, policy_id: &str, spec: &PolicySpec) -> Result<()> {
        let mut state = self.state();
        let policy = state
            .policies
            .get_mut(group_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == policy_id))
            .ok_or_else(|| not_found(policy_id))?;
        policy.change = Some(spec.change);
        policy.cooldown = spec.cooldown;
        state.calls.push(format!("update_policy {} {}", group_id, policy_id));
        Ok(())
    }

    async fn list_webhooks(&self, _group_id: &str, policy_id: &str) -> Result<Vec<Webhook>> {
        Ok(self.state().webhooks.get(policy_id).cloned().unwrap_or_default())
    }

    async fn create_webhook(&self, group_id: &str, policy_id: &str, name: &str) -> Result<Webhook> {
        let mut state = self.state();
        let id = state.next("hook");
        let hook = Webhook {
            id: id.clone(),
            name: name.to_string(),
            links: capability(&id),
        };
        state.calls.push(format!("create_webhook {} {} {}", group_id, policy_id, name));
        state
            .webhooks
            .entry(policy_id.to_string())
            .or_default()
            .push(hook.clone());
        Ok(hook)
    }

    async fn get_webhook(&self, _group_id: &str, policy_id: &str, webhook_id: &str) -> Result<Webhook> {
        let state = self.state();
        let hook = state
            .webhooks
            .get(policy_id)
            .and_then(|hooks| hooks.iter().find(|h| h.id == webhook_id))
            .cloned()
            .ok_or_else(|| not_found(webhook_id))?;
        Ok(Webhook {
            links: capability(&hook.id),
            ..hook
        })
    }
}

#[async_trait]
impl LoadBalancerApi for FakeCloud {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        Ok(self.state().load_balancers.values().cloned().collect())
    }

    async fn get_load_balancer(&self, lb_id: u64) -> Result<LoadBalancer> {
        let mut state = self.state();
        let mut lb = state
            .load_balancers
            .get(&lb_id)
            .cloned()
            .ok_or_else(|| not_found(lb_id))?;
        if let Some(busy) = state.busy_polls.get_mut(&lb_id) {
            if *busy > 0 {
                *busy -= 1;
                lb.status = "PENDING_UPDATE".to_string();
            }
        }
        Ok(lb)
    }

    async fn health_monitor(&self, lb_id: u64) -> Result<HealthMonitor> {
        let state = self.state();
        if !state.load_balancers.contains_key(&lb_id) {
            return Err(not_found(lb_id));
        }
        Ok(state.monitors.get(&lb_id).cloned().unwrap_or_default())
    }

    async fn add_node(&self, lb_id: u64, new: &NewNode) -> Result<()> {
        let mut state = self.state();
        let scripted = state
            .add_node_errors
            .get_mut(&lb_id)
            .and_then(|errors| errors.pop_front());
        if let Some((status, message)) = scripted {
            state.calls.push(format!("add_node {} rejected", lb_id));
            return Err(api_error(status, message));
        }

        state.next_id += 1;
        let id = 1000 + state.next_id;
        let lb = state.load_balancers.get_mut(&lb_id).ok_or_else(|| not_found(lb_id))?;
        if lb.nodes.iter().any(|n| n.address == new.address && n.port == new.port) {
            return Err(api_error(
                400,
                "Duplicate nodes detected. One or more nodes already configured on load balancer.",
            ));
        }
        lb.nodes.push(Node {
            id,
            address: new.address.clone(),
            port: new.port,
            condition: new.condition,
            status: "ONLINE".to_string(),
        });
        state.calls.push(format!("add_node {} {}", lb_id, new.address));
        Ok(())
    }

    async fn set_node_condition(&self, lb_id: u64, node_id: u64, condition: NodeCondition) -> Result<()> {
        let mut state = self.state();
        let node = state
            .load_balancers
            .get_mut(&lb_id)
            .and_then(|lb| lb.nodes.iter_mut().find(|n| n.id == node_id))
            .ok_or_else(|| not_found(node_id))?;
        node.condition = condition;
        state.calls.push(format!("set_node_condition {} {} {:?}", lb_id, node_id, condition));
        Ok(())
    }

    async fn delete_node(&self, lb_id: u64, node_id: u64) -> Result<()> {
        let mut state = self.state();
        let lb = state.load_balancers.get_mut(&lb_id).ok_or_else(|| not_found(lb_id))?;
        lb.nodes.retain(|n| n.id != node_id);
        state.calls.push(format!("delete_node {} {}", lb_id, node_id));
        Ok(())
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn get_server(&self, server_id: &str) -> Result<Server> {
        self.state()
            .servers
            .get(server_id)
            .cloned()
            .ok_or_else(|| not_found(server_id))
    }

    async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        Ok(self.state().flavors.clone())
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        Ok(self.state().images.clone())
    }

    async fn list_keypairs(&self) -> Result<Vec<KeyPair>> {
        Ok(self.state().keypairs.clone())
    }

    async fn create_keypair(&self, name: &str, _public_key: &str) -> Result<KeyPair> {
        let mut state = self.state();
        if state.keypairs.iter().any(|k| k.name == name) {
            return Err(api_error(409, format!("Key pair '{}' already exists", name)));
        }
        let key = KeyPair {
            name: name.to_string(),
            fingerprint: None,
        };
        state.keypairs.push(key.clone());
        state.calls.push(format!("create_keypair {}", name));
        Ok(key)
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Ok(self.state().networks.clone())
    }
}

/// Console answering prompts from a fixed script.
#[derive(Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub messages: Vec<(Tone, String)>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }

    fn show(&mut self, tone: Tone, message: &str) {
        self.messages.push((tone, message.to_string()));
    }

    fn show_choices(&mut self, _title: &str, _choices: &[String]) {}
}

/// A complete config file with inline credentials.
pub const FULL_CONFIG: &str = r#"
[autoscale]
name = "web"
scale_up = 2
scale_down = 1
max_entities = 4
min_entities = 1
cooldown = 60

[launch-configuration]
name = "web"
image = "image-1"
flavor = "general1-1"
disk_config = "auto"
key_name = "deploy"
networks = ["net-a"]
skip_default_networks = false
cloud_init = ""
metadata = {}

[rax-autoscaler]
load_balancers = [1234, 1234, 5678]
num_static_servers = 1

[cloud]
username = "alice"
api_key = "secret"
region = "DFW"
"#;

pub fn write_config(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("autoscaler.toml");
    std::fs::write(&path, content).unwrap();
    path
}
