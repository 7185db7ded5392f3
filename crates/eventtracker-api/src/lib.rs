//! Event tracker HTTP API.
//!
//! Exposes the dual-write coordinator and the query handlers over HTTP.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
