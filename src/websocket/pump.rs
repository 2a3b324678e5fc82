//! Connection Pumps
//!
//! Two loops per connection bridge the socket and the hub. The inbound
//! pump reads frames and turns speaker utterances into hub dispatches; the
//! outbound pump is the only writer on the socket and drains the delivery
//! queue the hub fills. Either one exiting unregisters the connection.
//!
//! Both are generic over `Stream`/`Sink` so they can be driven without a
//! real socket.

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::connection::{Connection, Outbound};
use super::hub::HubHandle;
use super::messages::WireMessage;

/// Read frames until the stream ends or fails, then unregister.
pub async fn inbound_pump<S, E>(mut stream: S, hub: HubHandle, conn: Connection)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !handle_text(&hub, &conn, &text).await {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                tracing::debug!(
                    connection_id = %conn.id,
                    bytes = data.len(),
                    "Binary frame dropped"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Axum answers pings itself
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %conn.id, "Client requested close");
                break;
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %conn.id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
        }
    }

    hub.unregister(conn.key).await;
}

/// Handle one text frame. Returns false if the hub is gone.
async fn handle_text(hub: &HubHandle, conn: &Connection, text: &str) -> bool {
    let utterance = match WireMessage::parse(text) {
        Ok(utterance) => utterance,
        Err(e) => {
            tracing::debug!(
                connection_id = %conn.id,
                error = %e,
                text = %text,
                "Invalid client message"
            );
            return true;
        }
    };

    if !conn.is_speaker() {
        // audience members are receive-only
        tracing::trace!(connection_id = %conn.id, "Ignoring audience message");
        return true;
    }

    tracing::debug!(
        connection_id = %conn.id,
        language = %utterance.language,
        "Utterance received"
    );

    match hub.dispatch(conn.key, utterance).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(connection_id = %conn.id, error = %e, "Dispatch failed");
            false
        }
    }
}

/// Drain the delivery queue into the sink.
///
/// Ends when the hub closes the queue (the connection was unregistered) or
/// a write fails, in which case the connection unregisters itself.
pub async fn outbound_pump<W>(
    mut sink: W,
    mut queue: mpsc::Receiver<Outbound>,
    hub: HubHandle,
    conn: Connection,
    ping_interval: Option<Duration>,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut keepalive = ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let message = tokio::select! {
            item = queue.recv() => match item {
                Some(Outbound::Text(text)) => Message::Text(text),
                Some(Outbound::Binary(data)) => Message::Binary(data),
                None => {
                    tracing::debug!(connection_id = %conn.id, "Delivery queue closed");
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return;
                }
            },
            _ = tick(&mut keepalive) => Message::Ping(Vec::new()),
        };

        if let Err(e) = sink.send(message).await {
            tracing::debug!(
                connection_id = %conn.id,
                error = %e,
                "WebSocket send failed, closing connection"
            );
            let _ = sink.close().await;
            hub.unregister(conn.key).await;
            return;
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::testing::FakeTranslator;
    use crate::websocket::connection::Role;
    use crate::websocket::hub::{Hub, HubConfig};
    use std::sync::Arc;

    fn text(s: &str) -> Result<Message, std::io::Error> {
        Ok(Message::Text(s.to_string()))
    }

    fn decode(outbound: Outbound) -> WireMessage {
        match outbound {
            Outbound::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("Expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inbound_speaker_dispatches_and_skips_garbage() {
        let hub = Hub::spawn(HubConfig::default(), Arc::new(FakeTranslator::new()));

        let speaker = Connection::new("s", "en", Role::Speaker);
        let _speaker_rx = hub.register(speaker.clone()).await.unwrap();
        let mut es_rx = hub
            .register(Connection::new("a", "es", Role::Audience))
            .await
            .unwrap();

        let frames = futures::stream::iter(vec![
            text(r#"{"text":"hello","language":"en"}"#),
            text("definitely not json"),
            Ok(Message::Binary(vec![1, 2, 3])),
            text(r#"{"text":"again","language":"en"}"#),
        ]);
        inbound_pump(frames, hub.clone(), speaker).await;

        let stats = hub.stats().await.unwrap();
        // stream ended, so the speaker is gone
        assert_eq!(stats.speakers, 0);
        assert_eq!(stats.audience, 1);

        assert_eq!(decode(es_rx.try_recv().unwrap()).text, "hola");
        assert_eq!(decode(es_rx.try_recv().unwrap()).text, "[es] again");
        assert!(es_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_inbound_audience_is_receive_only() {
        let translator = Arc::new(FakeTranslator::new());
        let hub = Hub::spawn(HubConfig::default(), translator.clone());

        let listener = Connection::new("a", "es", Role::Audience);
        let mut own_rx = hub.register(listener.clone()).await.unwrap();
        let mut other_rx = hub
            .register(Connection::new("b", "fr", Role::Audience))
            .await
            .unwrap();

        let frames = futures::stream::iter(vec![text(r#"{"text":"hola","language":"es"}"#)]);
        inbound_pump(frames, hub.clone(), listener).await;
        hub.stats().await.unwrap();

        assert!(translator.calls().is_empty());
        assert!(other_rx.try_recv().is_err());
        // own queue closed by the unregister, nothing delivered
        assert!(own_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_inbound_stops_at_read_error() {
        let translator = Arc::new(FakeTranslator::new());
        let hub = Hub::spawn(HubConfig::default(), translator.clone());

        let speaker = Connection::new("s", "en", Role::Speaker);
        let _rx = hub.register(speaker.clone()).await.unwrap();
        let _es = hub
            .register(Connection::new("a", "es", Role::Audience))
            .await
            .unwrap();

        let frames = futures::stream::iter(vec![
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            text(r#"{"text":"hello","language":"en"}"#),
        ]);
        inbound_pump(frames, hub.clone(), speaker).await;

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.connections, 1);
        assert!(translator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_outbound_writes_in_order_then_closes() {
        let hub = Hub::spawn(HubConfig::default(), Arc::new(FakeTranslator::new()));
        let conn = Connection::new("a", "es", Role::Audience);
        let queue = hub.register(conn.clone()).await.unwrap();

        let (sink, mut written) = futures::channel::mpsc::unbounded::<Message>();
        let pump = tokio::spawn(outbound_pump(sink, queue, hub.clone(), conn.clone(), None));

        hub.broadcast_raw(b"first".to_vec()).await.unwrap();
        hub.broadcast_raw(b"second".to_vec()).await.unwrap();
        hub.unregister(conn.key).await;

        pump.await.unwrap();

        assert_eq!(written.next().await, Some(Message::Text("first".to_string())));
        assert_eq!(written.next().await, Some(Message::Text("second".to_string())));
        assert_eq!(written.next().await, Some(Message::Close(None)));
        assert_eq!(written.next().await, None);
    }

    #[tokio::test]
    async fn test_outbound_write_failure_unregisters() {
        let hub = Hub::spawn(HubConfig::default(), Arc::new(FakeTranslator::new()));
        let conn = Connection::new("a", "es", Role::Audience);
        let queue = hub.register(conn.clone()).await.unwrap();

        let (sink, written) = futures::channel::mpsc::unbounded::<Message>();
        drop(written);
        let pump = tokio::spawn(outbound_pump(sink, queue, hub.clone(), conn, None));

        hub.broadcast_raw(b"lost".to_vec()).await.unwrap();
        pump.await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outbound_keepalive_ping() {
        let hub = Hub::spawn(HubConfig::default(), Arc::new(FakeTranslator::new()));
        let conn = Connection::new("a", "es", Role::Audience);
        let queue = hub.register(conn.clone()).await.unwrap();

        let (sink, mut written) = futures::channel::mpsc::unbounded::<Message>();
        let pump = tokio::spawn(outbound_pump(
            sink,
            queue,
            hub.clone(),
            conn.clone(),
            Some(Duration::from_millis(10)),
        ));

        let first = tokio::time::timeout(Duration::from_secs(2), written.next())
            .await
            .unwrap();
        assert_eq!(first, Some(Message::Ping(Vec::new())));

        hub.unregister(conn.key).await;
        pump.await.unwrap();
    }
}
