//! Command implementations for the CLI.

mod apply;
mod export;
mod join;
mod metric;
mod prune;

use std::path::Path;

use anyhow::{Context, Result};
use asgsync_core::{Credentials, RackspaceClient};
use tracing::debug;

pub use apply::cmd_apply;
pub use export::cmd_export;
pub use join::{cmd_join, JoinArgs};
pub use metric::cmd_fail_metric;
pub use prune::{cmd_prune, PruneArgs};

/// Reads a credentials file and authenticates against it.
async fn connect(credentials: &Path, region: Option<String>) -> Result<RackspaceClient> {
    let credentials = Credentials::from_file(credentials)
        .with_context(|| format!("reading credentials from {}", credentials.display()))?
        .with_region(region);
    debug!(username = %credentials.username, region = ?credentials.region, "authenticating");
    Ok(RackspaceClient::connect(&credentials).await?)
}
