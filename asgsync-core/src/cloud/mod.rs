//! Remote cloud services: identity, wire types and the HTTP client.

mod api;
mod client;
pub mod identity;
pub mod types;
mod wait;

pub use api::{AutoscaleApi, ComputeApi, LoadBalancerApi};
pub use client::RackspaceClient;
pub use identity::{Session, ServiceCatalog};
pub use wait::{wait_until_active, WaitPolicy};
