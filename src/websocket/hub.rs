//! WebSocket Connection Hub
//!
//! Single owner of the connection registry. Every membership change and
//! every routing decision runs on one task that drains a queue of
//! [`HubEvent`]s, one event at a time, so the registry needs no lock.
//! The rest of the program talks to it through a cloneable [`HubHandle`].
//!
//! Payloads never go straight to a socket from here: each connection has a
//! bounded delivery queue drained by its own outbound pump. A recipient
//! whose queue is full or closed is evicted instead of stalling the loop.
//!
//! Translation calls are awaited inside the loop, which holds up every
//! other event while they run. Utterances are therefore fanned out in the
//! order they were sent, and a listener registered mid-translation still
//! sees the next one.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::connection::{Connection, ConnectionKey, Outbound, Role};
use super::language::LanguageMatch;
use super::messages::{Utterance, WireMessage};
use crate::translation::{TranslationError, Translator};

/// How the distinct target languages of one utterance are translated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// One translation at a time
    #[default]
    Sequential,
    /// All target languages at once; delivery still waits for all of them
    Concurrent,
}

impl FromStr for FanoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(FanoutMode::Sequential),
            "concurrent" => Ok(FanoutMode::Concurrent),
            other => Err(format!("unknown fan-out mode: {}", other)),
        }
    }
}

/// Configuration for the connection hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub language_match: LanguageMatch,

    #[serde(default)]
    pub fanout: FanoutMode,

    /// Capacity of the hub's event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Capacity of each connection's delivery queue
    #[serde(default = "default_delivery_queue_capacity")]
    pub delivery_queue_capacity: usize,

    /// Keepalive ping interval in seconds, 0 disables
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_event_queue_capacity() -> usize {
    1024
}

fn default_delivery_queue_capacity() -> usize {
    64
}

fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            language_match: LanguageMatch::default(),
            fanout: FanoutMode::default(),
            event_queue_capacity: default_event_queue_capacity(),
            delivery_queue_capacity: default_delivery_queue_capacity(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

/// Snapshot of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub speakers: usize,
    pub audience: usize,
    /// Distinct audience languages, sorted
    pub languages: Vec<String>,
}

/// Work submitted to the hub loop
enum HubEvent {
    Register {
        conn: Connection,
        sender: mpsc::Sender<Outbound>,
        ack: oneshot::Sender<()>,
    },
    Unregister {
        key: ConnectionKey,
    },
    Dispatch {
        from: ConnectionKey,
        utterance: Utterance,
    },
    BroadcastRaw {
        payload: Outbound,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Why a recipient was dropped
#[derive(Debug, Clone, Copy)]
enum EvictReason {
    /// Delivery queue full: the client is not keeping up
    Backlogged,
    /// Delivery queue closed: the outbound pump is gone
    Closed,
}

struct Member {
    conn: Connection,
    sender: mpsc::Sender<Outbound>,
}

/// The registry and its event loop
pub struct Hub {
    members: HashMap<ConnectionKey, Member>,
    translator: Arc<dyn Translator>,
    config: HubConfig,
    events: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Start the hub loop on the current runtime.
    ///
    /// The loop runs until every [`HubHandle`] has been dropped.
    pub fn spawn(config: HubConfig, translator: Arc<dyn Translator>) -> HubHandle {
        let (tx, rx) = mpsc::channel(config.event_queue_capacity.max(1));

        let handle = HubHandle {
            events: tx,
            delivery_capacity: config.delivery_queue_capacity.max(1),
            ping_interval: match config.ping_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        let hub = Hub {
            members: HashMap::new(),
            translator,
            config,
            events: rx,
        };
        tokio::spawn(hub.run());

        handle
    }

    async fn run(mut self) {
        tracing::debug!(
            translator = %self.translator.name(),
            language_match = ?self.config.language_match,
            fanout = ?self.config.fanout,
            "Hub started"
        );

        while let Some(event) = self.events.recv().await {
            match event {
                HubEvent::Register { conn, sender, ack } => {
                    self.register(conn, sender);
                    let _ = ack.send(());
                }
                HubEvent::Unregister { key } => self.unregister(key),
                HubEvent::Dispatch { from, utterance } => self.dispatch(from, utterance).await,
                HubEvent::BroadcastRaw { payload } => self.broadcast_raw(payload),
                HubEvent::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
            }
        }

        tracing::debug!(connections = self.members.len(), "Hub stopped");
    }

    fn register(&mut self, conn: Connection, sender: mpsc::Sender<Outbound>) {
        tracing::info!(
            connection_id = %conn.id,
            key = %conn.key,
            role = %conn.role,
            language = %conn.language,
            "Client connected"
        );
        self.members.insert(conn.key, Member { conn, sender });
    }

    /// Remove a member; dropping its sender closes the outbound pump's queue
    fn unregister(&mut self, key: ConnectionKey) {
        match self.members.remove(&key) {
            Some(member) => {
                tracing::info!(
                    connection_id = %member.conn.id,
                    key = %key,
                    "Client disconnected"
                );
            }
            None => tracing::trace!(key = %key, "Unregister for unknown connection"),
        }
    }

    fn evict(&mut self, key: ConnectionKey, reason: EvictReason) {
        if let Some(member) = self.members.get(&key) {
            tracing::warn!(
                connection_id = %member.conn.id,
                key = %key,
                reason = ?reason,
                "Evicting client"
            );
        }
        self.unregister(key);
    }

    /// Fan an utterance out to every audience member in another language
    async fn dispatch(&mut self, from: ConnectionKey, utterance: Utterance) {
        match self.members.get(&from) {
            Some(member) if member.conn.role == Role::Speaker => {}
            Some(member) => {
                tracing::debug!(
                    connection_id = %member.conn.id,
                    "Ignoring utterance from audience member"
                );
                return;
            }
            None => {
                tracing::debug!(key = %from, "Ignoring utterance from unregistered connection");
                return;
            }
        }

        let mut targets: Vec<String> = Vec::new();
        let mut recipients: Vec<(ConnectionKey, String)> = Vec::new();
        for member in self.members.values() {
            if member.conn.role != Role::Audience {
                continue;
            }
            if self
                .config
                .language_match
                .matches(&member.conn.language, &utterance.language)
            {
                continue;
            }
            if !targets.contains(&member.conn.language) {
                targets.push(member.conn.language.clone());
            }
            recipients.push((member.conn.key, member.conn.language.clone()));
        }

        if recipients.is_empty() {
            tracing::trace!(language = %utterance.language, "No recipients for utterance");
            return;
        }

        let translations = self.translate_all(&utterance, targets).await;

        let mut payloads: HashMap<&str, String> = HashMap::new();
        for (language, translated) in &translations {
            let msg = WireMessage::new(translated.as_str(), language.as_str());
            match msg.encode() {
                Ok(json) => {
                    payloads.insert(language.as_str(), json);
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize message"),
            }
        }

        let mut delivered = 0usize;
        let mut evicted = Vec::new();
        for (key, language) in recipients {
            let Some(payload) = payloads.get(language.as_str()) else {
                continue;
            };
            match self.deliver(key, Outbound::Text(payload.clone())) {
                Ok(()) => delivered += 1,
                Err(reason) => evicted.push((key, reason)),
            }
        }
        for (key, reason) in evicted {
            self.evict(key, reason);
        }

        tracing::debug!(
            source = %utterance.language,
            delivered,
            languages = translations.len(),
            "Utterance dispatched"
        );
    }

    /// Translate into each target once; failed targets are logged and left out
    async fn translate_all(
        &self,
        utterance: &Utterance,
        targets: Vec<String>,
    ) -> Vec<(String, String)> {
        let results: Vec<Result<String, TranslationError>> = match self.config.fanout {
            FanoutMode::Sequential => {
                let mut results = Vec::with_capacity(targets.len());
                for target in &targets {
                    results.push(
                        self.translator
                            .translate(&utterance.text, &utterance.language, target)
                            .await,
                    );
                }
                results
            }
            FanoutMode::Concurrent => {
                join_all(targets.iter().map(|target| {
                    self.translator
                        .translate(&utterance.text, &utterance.language, target)
                }))
                .await
            }
        };

        targets
            .into_iter()
            .zip(results)
            .filter_map(|(target, result)| match result {
                Ok(text) => Some((target, text)),
                Err(e) => {
                    tracing::warn!(
                        source = %utterance.language,
                        target = %target,
                        error = %e,
                        "Translation error, skipping recipients"
                    );
                    None
                }
            })
            .collect()
    }

    /// Deliver raw bytes to every member regardless of role
    fn broadcast_raw(&mut self, payload: Outbound) {
        let mut evicted = Vec::new();
        for key in self.members.keys() {
            if let Err(reason) = self.deliver(*key, payload.clone()) {
                evicted.push((*key, reason));
            }
        }

        tracing::debug!(
            recipients = self.members.len() - evicted.len(),
            "Raw payload broadcast"
        );

        for (key, reason) in evicted {
            self.evict(key, reason);
        }
    }

    /// Hand a payload to a member's outbound pump without waiting
    fn deliver(&self, key: ConnectionKey, payload: Outbound) -> Result<(), EvictReason> {
        let Some(member) = self.members.get(&key) else {
            return Ok(());
        };
        match member.sender.try_send(payload) {
            Ok(()) => {
                tracing::trace!(connection_id = %member.conn.id, "Payload queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(EvictReason::Backlogged),
            Err(TrySendError::Closed(_)) => Err(EvictReason::Closed),
        }
    }

    fn stats(&self) -> HubStats {
        let mut stats = HubStats {
            connections: self.members.len(),
            ..Default::default()
        };
        let mut languages = BTreeSet::new();
        for member in self.members.values() {
            match member.conn.role {
                Role::Speaker => stats.speakers += 1,
                Role::Audience => {
                    stats.audience += 1;
                    languages.insert(member.conn.language.clone());
                }
            }
        }
        stats.languages = languages.into_iter().collect();
        stats
    }
}

/// Cloneable front door to the hub loop
#[derive(Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    delivery_capacity: usize,
    ping_interval: Option<Duration>,
}

impl HubHandle {
    /// Register a connection.
    ///
    /// Returns the connection's delivery queue once the hub has recorded it;
    /// any dispatch submitted after this returns will consider it.
    pub async fn register(&self, conn: Connection) -> Result<mpsc::Receiver<Outbound>, HubError> {
        let (sender, receiver) = mpsc::channel(self.delivery_capacity);
        let (ack, acked) = oneshot::channel();

        self.send(HubEvent::Register { conn, sender, ack }).await?;
        acked.await.map_err(|_| HubError::Closed)?;

        Ok(receiver)
    }

    /// Remove a connection. Unknown or already removed keys are ignored.
    pub async fn unregister(&self, key: ConnectionKey) {
        if self.send(HubEvent::Unregister { key }).await.is_err() {
            tracing::debug!(key = %key, "Hub gone, nothing to unregister");
        }
    }

    /// Submit an utterance from `from` for translation and fan-out
    pub async fn dispatch(&self, from: ConnectionKey, utterance: Utterance) -> Result<(), HubError> {
        self.send(HubEvent::Dispatch { from, utterance }).await
    }

    /// Send an already-encoded payload to every connection
    pub async fn broadcast_raw(&self, payload: Vec<u8>) -> Result<(), HubError> {
        self.send(HubEvent::BroadcastRaw {
            payload: Outbound::from_bytes(payload),
        })
        .await
    }

    /// Registry snapshot
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> Result<usize, HubError> {
        Ok(self.stats().await?.connections)
    }

    /// Keepalive interval outbound pumps should use
    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub is not running")]
    Closed,
}
