//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::translation::Translator;
use crate::websocket::{Hub, HubHandle};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the connection hub
    pub hub: HubHandle,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Name of the translation provider, for health output
    pub translator: String,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Start the hub and build the state around it
    pub fn new(config: Config, translator: Arc<dyn Translator>) -> Self {
        let translator_name = translator.name().to_string();
        let hub = Hub::spawn(config.hub.clone(), translator);

        Self {
            hub,
            config: Arc::new(config),
            translator: translator_name,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
