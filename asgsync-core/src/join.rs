//! Adding this server to load balancers once it passes their health checks.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::cloud::types::{HealthMonitor, NewNode, NodeCondition};
use crate::cloud::{wait_until_active, LoadBalancerApi, WaitPolicy};
use crate::error::{Error, Result};

const DEFAULT_CHECK_TIMEOUT: u64 = 10;

/// Runs a load balancer's health check against an address.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, monitor: &HealthMonitor, address: &str, port: u16) -> Result<()>;
}

/// Probe that performs the checks over the network.
pub struct NetworkProbe {
    client: reqwest::Client,
    protocol: Option<String>,
    host_header: Option<String>,
}

impl NetworkProbe {
    /// `protocol` overrides the scheme derived from the monitor type.
    /// `host_header` overrides the monitor's, which defaults to the probed address.
    pub fn new(protocol: Option<String>, host_header: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            protocol,
            host_header,
        })
    }

    async fn check_port(&self, address: &str, port: u16, limit: Duration) -> Result<()> {
        match timeout(limit, TcpStream::connect((address, port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::HealthCheck(format!(
                "error connecting to port {}: {}",
                port, e
            ))),
            Err(_) => Err(Error::HealthCheck(format!(
                "connecting to port {} timed out after {:?}",
                port, limit
            ))),
        }
    }

    async fn check_url(&self, monitor: &HealthMonitor, kind: &str, address: &str, limit: Duration) -> Result<()> {
        let body_pattern = compile(monitor.body_regex.as_deref(), false)?;
        let status_pattern = compile(monitor.status_regex.as_deref(), true)?;

        let scheme = self
            .protocol
            .clone()
            .unwrap_or_else(|| kind.to_ascii_lowercase());
        let path = monitor.path.as_deref().unwrap_or("/").trim_start_matches('/');
        let url = format!("{}://{}/{}", scheme, address, path);
        let host = self
            .host_header
            .as_deref()
            .or(monitor.host_header.as_deref())
            .unwrap_or(address);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::HOST, host)
            .timeout(limit)
            .send()
            .await
            .map_err(|e| Error::HealthCheck(format!("request to {} failed: {}", url, e)))?;
        let status = response.status().as_u16().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| Error::HealthCheck(format!("reading {} failed: {}", url, e)))?;

        if status_pattern.is_match(&status) && body_pattern.is_match(&body) {
            Ok(())
        } else {
            Err(Error::HealthCheck(format!(
                "response from {} (status {}) does not match expected result",
                url, status
            )))
        }
    }
}

/// Compiles a monitor regex. Status patterns must match from the start.
fn compile(pattern: Option<&str>, anchored: bool) -> Result<Regex> {
    let pattern = pattern.filter(|p| !p.is_empty()).unwrap_or(".*");
    let pattern = if anchored {
        format!("^(?:{})", pattern)
    } else {
        pattern.to_string()
    };
    Regex::new(&pattern).map_err(|e| Error::HealthCheck(format!("invalid regex {}: {}", pattern, e)))
}

#[async_trait]
impl HealthProbe for NetworkProbe {
    async fn check(&self, monitor: &HealthMonitor, address: &str, port: u16) -> Result<()> {
        let limit = Duration::from_secs(monitor.timeout.unwrap_or(DEFAULT_CHECK_TIMEOUT));
        match monitor.kind.as_deref() {
            None => {
                info!("no health check present on load balancer");
                Ok(())
            }
            Some("CONNECT") => self.check_port(address, port, limit).await,
            Some(kind @ ("HTTP" | "HTTPS")) => self.check_url(monitor, kind, address, limit).await,
            Some(other) => Err(Error::HealthCheck(format!(
                "unsupported health check type {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub address: String,
    pub load_balancers: Vec<u64>,
    pub wait: WaitPolicy,
    pub attempts: u32,
    /// Upper bound of the random pause after a busy load balancer refused the node.
    pub max_jitter: Duration,
}

impl JoinOptions {
    pub fn new(address: impl Into<String>, load_balancers: Vec<u64>) -> Self {
        Self {
            address: address.into(),
            load_balancers,
            wait: WaitPolicy::default(),
            attempts: 5,
            max_jitter: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub added: Vec<u64>,
    pub already_present: Vec<u64>,
    /// Load balancers whose health check failed.
    pub skipped: Vec<(u64, String)>,
    pub failed: Vec<(u64, String)>,
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

/// Adds `options.address` to each load balancer whose health check it passes.
///
/// # Arguments
///
/// * `api` - load balancer service
/// * `probe` - runs each load balancer's health monitor against the address
/// * `options` - address, load balancers and the retry policy for busy ones
///
/// Per load balancer results, failures included, are collected in the
/// returned `JoinReport`.
pub async fn join_load_balancers<L, P>(api: &L, probe: &P, options: &JoinOptions) -> Result<JoinReport>
where
    L: LoadBalancerApi + ?Sized,
    P: HealthProbe + ?Sized,
{
    let mut report = JoinReport::default();

    for &lb_id in &options.load_balancers {
        let lookup = match api.get_load_balancer(lb_id).await {
            Ok(lb) => api.health_monitor(lb_id).await.map(|monitor| (lb, monitor)),
            Err(e) => Err(e),
        };
        let (lb, monitor) = match lookup {
            Ok(found) => found,
            Err(e) => {
                warn!(lb_id, error = %e, "unable to look up load balancer");
                report.failed.push((lb_id, e.to_string()));
                continue;
            }
        };

        if let Err(e) = probe.check(&monitor, &options.address, lb.port).await {
            warn!(lb_id, error = %e, "health check failed, not adding");
            report.skipped.push((lb_id, e.to_string()));
            continue;
        }

        let node = NewNode {
            address: options.address.clone(),
            port: lb.port,
            condition: NodeCondition::Enabled,
        };
        match add_with_retry(api, lb_id, &node, options).await {
            Ok(true) => {
                info!(lb_id, address = %node.address, port = node.port, "node added");
                report.added.push(lb_id);
            }
            Ok(false) => {
                info!(lb_id, address = %node.address, port = node.port, "node already in load balancer");
                report.already_present.push(lb_id);
            }
            Err(e) => {
                warn!(lb_id, error = %e, "failed to add node");
                report.failed.push((lb_id, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// `Ok(true)` once added, `Ok(false)` if the node was already a member.
async fn add_with_retry<L>(api: &L, lb_id: u64, node: &NewNode, options: &JoinOptions) -> Result<bool>
where
    L: LoadBalancerApi + ?Sized,
{
    let attempts = options.attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        wait_until_active(api, lb_id, options.wait).await?;
        match api.add_node(lb_id, node).await {
            Ok(()) => return Ok(true),
            Err(e) if e.is_duplicate_node() => return Ok(false),
            Err(e) if e.is_pending_update() => {
                info!(lb_id, attempt, "load balancer busy, another server is adding itself. Retrying...");
                last = Some(e);
                sleep(jitter(options.max_jitter)).await;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last.unwrap_or_else(|| {
        Error::Timeout(format!("load balancer {} to accept the node", lb_id))
    }))
}
