//! WebSocket Translation Relay
//!
//! Relays a speaker's utterances to every audience member, translated into
//! each listener's language.
//!
//! ## Architecture
//!
//! - **Hub**: Single task owning the registry; routes utterances
//! - **Pumps**: Per-connection inbound/outbound loops between socket and hub
//! - **Handler**: Handles WebSocket upgrade and connection lifecycle
//! - **Messages**: The JSON wire format
//!
//! ## Usage
//!
//! Clients connect to `/ws?id=<id>&lang=<tag>&role=<speaker|audience>`.
//! A speaker sends `{"text": "...", "language": "en"}`; every audience
//! member whose language differs receives the translation as
//! `{"text": "...", "language": "<their tag>"}`. Audience messages are
//! ignored.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8080/ws?id=guest&lang=es&role=audience');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   console.log(msg.language, msg.text);
//! };
//! ```

mod connection;
mod handler;
mod hub;
mod language;
mod messages;
mod pump;

pub use connection::{Connection, ConnectionKey, ConnectionState, Outbound, Role};
pub use handler::{websocket_handler, ConnectParams};
pub use hub::{FanoutMode, Hub, HubConfig, HubError, HubHandle, HubStats};
pub use language::{primary_subtag, LanguageMatch};
pub use messages::{Utterance, WireMessage};
pub use pump::{inbound_pump, outbound_pump};
