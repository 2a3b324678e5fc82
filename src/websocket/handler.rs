//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;

use super::connection::{Connection, ConnectionState, Role};
use super::hub::HubHandle;
use super::pump::{inbound_pump, outbound_pump};
use crate::api::{ApiError, AppState};

/// Query parameters of `GET /ws`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Advisory client identifier
    #[serde(default)]
    pub id: String,
    /// Language the participant speaks or wants to hear
    pub lang: Option<String>,
    /// "speaker", anything else joins the audience
    #[serde(default)]
    pub role: String,
}

impl ConnectParams {
    /// Build the connection, rejecting a missing or blank language
    pub fn into_connection(self) -> Result<Connection, ApiError> {
        let language = self
            .lang
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ApiError::Validation("missing `lang` query parameter".to_string()))?;

        Ok(Connection::new(self.id, language, Role::from_query(&self.role)))
    }
}

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let conn = params.into_connection()?;
    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, conn)))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: HubHandle, conn: Connection) {
    let mut state = ConnectionState::Connecting;
    let (sender, receiver) = socket.split();

    let queue = match hub.register(conn.clone()).await {
        Ok(queue) => queue,
        Err(e) => {
            tracing::error!(connection_id = %conn.id, error = %e, "Failed to register WebSocket connection");
            transition(&mut state, ConnectionState::Closed, &conn);
            return;
        }
    };
    transition(&mut state, ConnectionState::Registered, &conn);

    let mut send_task = tokio::spawn(outbound_pump(
        sender,
        queue,
        hub.clone(),
        conn.clone(),
        hub.ping_interval(),
    ));
    let mut recv_task = tokio::spawn(inbound_pump(receiver, hub.clone(), conn.clone()));
    transition(&mut state, ConnectionState::Active, &conn);

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Cleanup: the pumps unregister on their own, an aborted one may not have
    transition(&mut state, ConnectionState::Unregistering, &conn);
    hub.unregister(conn.key).await;
    transition(&mut state, ConnectionState::Closed, &conn);
}

fn transition(state: &mut ConnectionState, next: ConnectionState, conn: &Connection) {
    let from = *state;
    if !state.advance(next) {
        return;
    }
    tracing::trace!(connection_id = %conn.id, from = ?from, to = ?next, "Connection state");
    if state.is_closed() {
        tracing::debug!(connection_id = %conn.id, key = %conn.key, "Connection closed");
    }
}
