//! HTTP client for the Rackspace cloud APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

use super::api::{AutoscaleApi, ComputeApi, LoadBalancerApi};
use super::identity::{authenticate, service, Session};
use super::types::{
    Flavor, GroupConfiguration, GroupState, GroupSummary, HealthMonitor, Image, KeyPair,
    LaunchConfiguration, LoadBalancer, Network, NewNode, NodeCondition, Policy, PolicySpec,
    ScalingGroup, Server, Webhook,
};

/// Authenticated client for every service the tool talks to.
///
/// Rate limiting (413) is retried with exponential backoff. GET, PUT and
/// DELETE are also retried on transport errors and 5xx responses; a POST
/// only on connection failures, so creates are never sent twice. Other 4xx
/// responses are returned as `Error::Api`.
pub struct RackspaceClient {
    client: Client,
    session: Session,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Deserialize)]
struct GroupEnvelope {
    group: ScalingGroup,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    groups: Vec<GroupSummary>,
}

#[derive(Deserialize)]
struct StateEnvelope {
    group: GroupState,
}

#[derive(Deserialize)]
struct PoliciesEnvelope {
    policies: Vec<Policy>,
}

#[derive(Deserialize)]
struct WebhooksEnvelope {
    webhooks: Vec<Webhook>,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    webhook: Webhook,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancersEnvelope {
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancerEnvelope {
    load_balancer: LoadBalancer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthMonitorEnvelope {
    #[serde(default)]
    health_monitor: HealthMonitor,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Deserialize)]
struct FlavorsEnvelope {
    flavors: Vec<Flavor>,
}

#[derive(Deserialize)]
struct ImagesEnvelope {
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct KeyPairEnvelope {
    keypair: KeyPair,
}

#[derive(Deserialize)]
struct KeyPairsEnvelope {
    keypairs: Vec<KeyPairEnvelope>,
}

#[derive(Deserialize)]
struct NetworksEnvelope {
    networks: Vec<Network>,
}

fn http_client() -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(30)).build()?)
}

/// Whether a failed request may be sent again.
///
/// A POST is only repeated when the provider cannot have acted on it: the
/// connection was never established or the request was rate limited.
fn is_transient(method: &Method, error: &Error) -> bool {
    let idempotent = *method != Method::POST;
    match error {
        Error::Http(e) => idempotent || e.is_connect(),
        Error::Api { status: 413, .. } => true,
        Error::Api { status, .. } => idempotent && *status >= 500,
        _ => false,
    }
}

impl RackspaceClient {
    /// Authenticates and returns a ready client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or identity
    /// rejects the credentials.
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        let client = http_client()?;
        let session = authenticate(&client, credentials).await?;
        debug!(region = %session.region, "authenticated");
        Ok(Self::from_session(client, session))
    }

    /// Builds a client around an existing session.
    pub fn with_session(session: Session) -> Result<Self> {
        Ok(Self::from_session(http_client()?, session))
    }

    fn from_session(client: Client, session: Session) -> Self {
        Self {
            client,
            session,
            max_retries: 3,
            retry_delay: Duration::from_millis(250),
        }
    }

    /// Overrides the retry policy.
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, service: &str, path: &str) -> Result<String> {
        Ok(format!("{}{}", self.session.endpoint(service)?, path))
    }

    async fn send_once(&self, method: Method, url: &str, body: Option<&Value>) -> Result<String> {
        let mut builder = self
            .client
            .request(method, url)
            .header("X-Auth-Token", &self.session.token)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn send(&self, method: Method, url: String, body: Option<Value>) -> Result<String> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            debug!(%method, %url, attempt, "request");
            match self.send_once(method.clone(), &url, body.as_ref()).await {
                Err(e) if attempt < self.max_retries && is_transient(&method, &e) => {
                    warn!(%method, %url, error = %e, "transient failure, retrying");
                    sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let text = self.send(Method::GET, url, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post<T: DeserializeOwned>(&self, url: String, body: Value) -> Result<T> {
        let text = self.send(Method::POST, url, Some(body)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn put(&self, url: String, body: Value) -> Result<()> {
        self.send(Method::PUT, url, Some(body)).await.map(|_| ())
    }

    async fn delete(&self, url: String) -> Result<()> {
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }

    fn autoscale(&self, path: &str) -> Result<String> {
        self.url(service::AUTOSCALE, path)
    }

    fn load_balancers(&self, path: &str) -> Result<String> {
        self.url(service::LOAD_BALANCER, path)
    }

    fn compute(&self, path: &str) -> Result<String> {
        self.url(service::COMPUTE, path)
    }
}

#[async_trait]
impl AutoscaleApi for RackspaceClient {
    async fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let envelope: GroupsEnvelope = self.get(self.autoscale("/groups")?).await?;
        Ok(envelope.groups)
    }

    async fn get_group(&self, group_id: &str) -> Result<ScalingGroup> {
        let url = self.autoscale(&format!("/groups/{}", group_id))?;
        let envelope: GroupEnvelope = self.get(url).await?;
        Ok(envelope.group)
    }

    async fn create_group(
        &self,
        config: &GroupConfiguration,
        launch: &LaunchConfiguration,
        policies: &[PolicySpec],
    ) -> Result<ScalingGroup> {
        let body = json!({
            "groupConfiguration": config,
            "launchConfiguration": launch,
            "scalingPolicies": policies,
        });
        let envelope: GroupEnvelope = self.post(self.autoscale("/groups")?, body).await?;
        Ok(envelope.group)
    }

    async fn update_group_config(&self, group_id: &str, config: &GroupConfiguration) -> Result<()> {
        let url = self.autoscale(&format!("/groups/{}/config", group_id))?;
        self.put(url, serde_json::to_value(config)?).await
    }

    async fn update_launch_config(
        &self,
        group_id: &str,
        launch: &LaunchConfiguration,
    ) -> Result<()> {
        let url = self.autoscale(&format!("/groups/{}/launch", group_id))?;
        self.put(url, serde_json::to_value(launch)?).await
    }

    async fn group_state(&self, group_id: &str) -> Result<GroupState> {
        let url = self.autoscale(&format!("/groups/{}/state", group_id))?;
        let envelope: StateEnvelope = self.get(url).await?;
        Ok(envelope.group)
    }

    async fn list_policies(&self, group_id: &str) -> Result<Vec<Policy>> {
        let url = self.autoscale(&format!("/groups/{}/policies", group_id))?;
        let envelope: PoliciesEnvelope = self.get(url).await?;
        Ok(envelope.policies)
    }

    async fn create_policy(&self, group_id: &str, policy: &PolicySpec) -> Result<Policy> {
        let url = self.autoscale(&format!("/groups/{}/policies", group_id))?;
        let envelope: PoliciesEnvelope = self.post(url, json!([policy])).await?;
        envelope.policies.into_iter().next().ok_or_else(|| Error::Api {
            status: 200,
            message: format!("policy {} was not returned after creation", policy.name),
        })
    }

    async fn update_policy(
        &self,
        group_id: &str,
        policy_id: &str,
        policy: &PolicySpec,
    ) -> Result<()> {
        let url = self.autoscale(&format!("/groups/{}/policies/{}", group_id, policy_id))?;
        self.put(url, serde_json::to_value(policy)?).await
    }

    async fn list_webhooks(&self, group_id: &str, policy_id: &str) -> Result<Vec<Webhook>> {
        let url = self.autoscale(&format!(
            "/groups/{}/policies/{}/webhooks",
            group_id, policy_id
        ))?;
        let envelope: WebhooksEnvelope = self.get(url).await?;
        Ok(envelope.webhooks)
    }

    async fn create_webhook(&self, group_id: &str, policy_id: &str, name: &str) -> Result<Webhook> {
        let url = self.autoscale(&format!(
            "/groups/{}/policies/{}/webhooks",
            group_id, policy_id
        ))?;
        let envelope: WebhooksEnvelope = self.post(url, json!([{ "name": name }])).await?;
        envelope.webhooks.into_iter().next().ok_or_else(|| Error::Api {
            status: 200,
            message: format!("webhook {} was not returned after creation", name),
        })
    }

    async fn get_webhook(
        &self,
        group_id: &str,
        policy_id: &str,
        webhook_id: &str,
    ) -> Result<Webhook> {
        let url = self.autoscale(&format!(
            "/groups/{}/policies/{}/webhooks/{}",
            group_id, policy_id, webhook_id
        ))?;
        let envelope: WebhookEnvelope = self.get(url).await?;
        Ok(envelope.webhook)
    }
}

#[async_trait]
impl LoadBalancerApi for RackspaceClient {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        let envelope: LoadBalancersEnvelope = self.get(self.load_balancers("/loadbalancers")?).await?;
        Ok(envelope.load_balancers)
    }

    async fn get_load_balancer(&self, lb_id: u64) -> Result<LoadBalancer> {
        let url = self.load_balancers(&format!("/loadbalancers/{}", lb_id))?;
        let envelope: LoadBalancerEnvelope = self.get(url).await?;
        Ok(envelope.load_balancer)
    }

    async fn health_monitor(&self, lb_id: u64) -> Result<HealthMonitor> {
        let url = self.load_balancers(&format!("/loadbalancers/{}/healthmonitor", lb_id))?;
        let envelope: HealthMonitorEnvelope = self.get(url).await?;
        Ok(envelope.health_monitor)
    }

    async fn add_node(&self, lb_id: u64, node: &NewNode) -> Result<()> {
        let url = self.load_balancers(&format!("/loadbalancers/{}/nodes", lb_id))?;
        self.send(Method::POST, url, Some(json!({ "nodes": [node] })))
            .await
            .map(|_| ())
    }

    async fn set_node_condition(
        &self,
        lb_id: u64,
        node_id: u64,
        condition: NodeCondition,
    ) -> Result<()> {
        let url = self.load_balancers(&format!("/loadbalancers/{}/nodes/{}", lb_id, node_id))?;
        self.put(url, json!({ "node": { "condition": condition } })).await
    }

    async fn delete_node(&self, lb_id: u64, node_id: u64) -> Result<()> {
        let url = self.load_balancers(&format!("/loadbalancers/{}/nodes/{}", lb_id, node_id))?;
        self.delete(url).await
    }
}

#[async_trait]
impl ComputeApi for RackspaceClient {
    async fn get_server(&self, server_id: &str) -> Result<Server> {
        let envelope: ServerEnvelope = self.get(self.compute(&format!("/servers/{}", server_id))?).await?;
        Ok(envelope.server)
    }

    async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        let envelope: FlavorsEnvelope = self.get(self.compute("/flavors")?).await?;
        Ok(envelope.flavors)
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        let url = self.url(service::IMAGE, "/images?limit=1000")?;
        let envelope: ImagesEnvelope = self.get(url).await?;
        Ok(envelope.images)
    }

    async fn list_keypairs(&self) -> Result<Vec<KeyPair>> {
        let envelope: KeyPairsEnvelope = self.get(self.compute("/os-keypairs")?).await?;
        Ok(envelope.keypairs.into_iter().map(|k| k.keypair).collect())
    }

    async fn create_keypair(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let body = json!({ "keypair": { "name": name, "public_key": public_key } });
        let envelope: KeyPairEnvelope = self.post(self.compute("/os-keypairs")?, body).await?;
        Ok(envelope.keypair)
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        let envelope: NetworksEnvelope = self.get(self.url(service::NETWORK, "/networks")?).await?;
        Ok(envelope.networks)
    }
}
