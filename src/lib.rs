//! Service-registry client lifecycle: registers a running instance with a
//! Eureka-compatible registry, keeps the lease alive with heartbeats and
//! deregisters on shutdown, failing over between zone endpoints.

pub mod config;
pub mod server;
pub mod services;
