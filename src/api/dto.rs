//! Data Transfer Objects
//!
//! Response types for the HTTP endpoints.

use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Hub status: ok, stopped
    pub hub: String,
    /// Translation provider name
    pub translator: String,
    /// Registered connections
    pub connections: usize,
    pub speakers: usize,
    pub audience: usize,
    /// Distinct audience languages
    pub languages: Vec<String>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
