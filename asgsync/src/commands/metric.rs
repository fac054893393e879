use std::path::PathBuf;

use asgsync_core::monitor::failure_metric;

pub fn cmd_fail_metric(marker: PathBuf) {
    println!("{}", failure_metric(&marker));
}
