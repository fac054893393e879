//! Core library for reconciling cloud autoscaling groups and their load balancers.

pub mod cloud;
pub mod config;
pub mod credentials;
pub mod desired;
pub mod diff;
pub mod error;
pub mod export;
pub mod join;
pub mod monitor;
pub mod path_utils;
pub mod prompt;
pub mod prune;
pub mod reconcile;
pub mod setup;
pub mod template;

pub use cloud::{AutoscaleApi, ComputeApi, LoadBalancerApi, RackspaceClient, WaitPolicy};
pub use config::{ConfigFile, Settings};
pub use credentials::Credentials;
pub use desired::DesiredGroup;
pub use diff::{diff_group, Difference, GroupDiff};
pub use error::{Error, Result};
pub use export::AutoscalerExport;
pub use join::{join_load_balancers, HealthProbe, JoinOptions, JoinReport, NetworkProbe};
pub use prompt::{Console, Tone};
pub use prune::{prune_dead_nodes, PruneOptions, PruneReport};
pub use reconcile::{Action, Outcome, Plan, Reconciler};
pub use setup::complete_config;
