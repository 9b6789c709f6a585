//! HTTP gateway for a distributed object-storage metadata grid.
//!
//! Clients issue REST-style calls; the gateway resolves logical names
//! (`namespace/reference/path`) to concrete backend addresses through a
//! two-tier TTL cache, forwards a binary RPC with retry across candidate
//! replicas, and answers a fixed JSON status envelope. Background queues
//! keep the process state fresh: cache expiry, cluster configuration
//! reloads, load-balancer refresh, and the coalesced registration push.
//!
//! The request pipeline is transport-agnostic: [`route::dispatch`] takes
//! a method, a URI, headers and a body and returns a [`reply::Reply`];
//! the [`server`] module is a thin axum adapter around it.

pub mod config;
pub mod counters;
pub mod handlers;
pub mod reply;
pub mod route;
pub mod server;
pub mod state;
pub mod tasks;
pub mod uri;

/// Service type of the directory tier.
pub const SRVTYPE_META1: &str = "meta1";
/// Service type of the container metadata tier.
pub const SRVTYPE_META2: &str = "meta2";

pub use config::ProxyConfig;
pub use state::AppState;
