//! # Babelcast
//!
//! Live translation relay: one speaker, many listeners, each hearing the
//! speaker in their own language.
//!
//! ## Features
//!
//! - **Single-owner hub**: one task owns the connection registry, no locks
//! - **Language-aware fan-out**: one translation per target language, only
//!   to listeners who need it
//! - **Backpressure-safe delivery**: per-connection queues; slow or broken
//!   listeners are evicted instead of stalling everyone else
//! - **Pluggable translation**: anything implementing [`Translator`];
//!   AWS Translate built in
//!
//! ## Modules
//!
//! - [`websocket`]: Hub, connection pumps and the upgrade handler
//! - [`translation`]: Translation port and the AWS provider
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use babelcast::translation::{TranslationError, Translator};
//! use babelcast::websocket::{Connection, Hub, HubConfig, Role, Utterance};
//! use std::sync::Arc;
//!
//! struct Shout;
//!
//! #[async_trait::async_trait]
//! impl Translator for Shout {
//!     fn name(&self) -> &str {
//!         "shout"
//!     }
//!
//!     async fn translate(
//!         &self,
//!         text: &str,
//!         _source: &str,
//!         _target: &str,
//!     ) -> Result<String, TranslationError> {
//!         Ok(text.to_uppercase())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Hub::spawn(HubConfig::default(), Arc::new(Shout));
//!
//!     let speaker = Connection::new("host", "en", Role::Speaker);
//!     let speaker_key = speaker.key;
//!     let _speaker_queue = hub.register(speaker).await?;
//!     let mut listener = hub.register(Connection::new("guest", "es", Role::Audience)).await?;
//!
//!     hub.dispatch(speaker_key, Utterance::new("hello", "en")).await?;
//!     println!("{:?}", listener.recv().await);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod translation;
pub mod websocket;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig, TranslationConfig};

pub use translation::{normalize_language_code, AwsTranslator, TranslationError, Translator};

pub use websocket::{
    websocket_handler, Connection, ConnectionKey, FanoutMode, Hub, HubConfig, HubError,
    HubHandle, HubStats, LanguageMatch, Role, Utterance, WireMessage,
};
