//! Ambient plumbing shared by Latchkey services: env config, tracing,
//! request ids, health checks and wire formatting helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
