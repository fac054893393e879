//! Agent plugin metric reporting a failed bootstrap.
//!
//! The wrapper around the external autoscaler creates the marker file when
//! group members are missing from the load balancers. A monitoring check
//! alerts on a value of 1.

use std::path::Path;

pub const DEFAULT_FAILURE_MARKER: &str = "/tmp/rax_autoscale_failure";
pub const METRIC_NAME: &str = "rax_autoscale_fail";

pub fn failure_metric(marker: &Path) -> String {
    let value = u8::from(std::fs::File::open(marker).is_ok());
    format!("metric {} int64 {}", METRIC_NAME, value)
}
