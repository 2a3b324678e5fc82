//! Connection Model
//!
//! Identity and lifecycle of one network-attached participant.

use std::fmt;
use uuid::Uuid;

/// Hub-assigned key for a registered connection.
///
/// The `id` query parameter a client sends is not guaranteed to be unique,
/// so the hub keys its registry on this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey(Uuid);

impl ConnectionKey {
    /// Allocate a fresh key
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Source of utterances
    Speaker,
    /// Receive-only listener
    Audience,
}

impl Role {
    /// Interpret the `role` query parameter.
    ///
    /// Only the exact string `"speaker"` selects [`Role::Speaker`].
    pub fn from_query(value: &str) -> Self {
        if value == "speaker" {
            Role::Speaker
        } else {
            Role::Audience
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Speaker => "speaker",
            Role::Audience => "audience",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant as seen by the hub
#[derive(Debug, Clone)]
pub struct Connection {
    /// Registry key, unique per upgrade
    pub key: ConnectionKey,
    /// Caller-supplied identifier (logging only)
    pub id: String,
    /// Declared language tag, e.g. "en" or "en-US"
    pub language: String,
    pub role: Role,
}

impl Connection {
    /// Create a connection with a freshly allocated key
    pub fn new(id: impl Into<String>, language: impl Into<String>, role: Role) -> Self {
        Self {
            key: ConnectionKey::new(),
            id: id.into(),
            language: language.into(),
            role,
        }
    }

    pub fn is_speaker(&self) -> bool {
        self.role == Role::Speaker
    }
}

/// A payload queued for a connection's outbound pump.
///
/// Already encoded; the pump writes it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
}

impl Outbound {
    /// Wrap raw bytes, preferring a text frame when they are valid UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Outbound::Text(text),
            Err(e) => Outbound::Binary(e.into_bytes()),
        }
    }
}

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Registered,
    Active,
    Unregistering,
    Closed,
}

impl ConnectionState {
    /// Move to `next` if the transition is allowed.
    ///
    /// States only move forward (a step may be skipped, e.g. a failed
    /// registration goes straight to `Closed`); nothing leaves `Closed`.
    pub fn advance(&mut self, next: ConnectionState) -> bool {
        if *self == ConnectionState::Closed || next <= *self {
            return false;
        }
        *self = next;
        true
    }

    pub fn is_closed(&self) -> bool {
        *self == ConnectionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_query() {
        assert_eq!(Role::from_query("speaker"), Role::Speaker);
        assert_eq!(Role::from_query("audience"), Role::Audience);
        assert_eq!(Role::from_query("Speaker"), Role::Audience);
        assert_eq!(Role::from_query(""), Role::Audience);
    }

    #[test]
    fn test_keys_are_unique_for_same_id() {
        let a = Connection::new("dup", "en", Role::Audience);
        let b = Connection::new("dup", "en", Role::Audience);
        assert_eq!(a.id, b.id);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_outbound_from_bytes() {
        assert_eq!(
            Outbound::from_bytes(b"hello".to_vec()),
            Outbound::Text("hello".to_string())
        );
        assert_eq!(
            Outbound::from_bytes(vec![0xff, 0xfe]),
            Outbound::Binary(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn test_state_machine() {
        let mut state = ConnectionState::Connecting;
        assert!(state.advance(ConnectionState::Registered));
        assert!(state.advance(ConnectionState::Active));
        assert!(!state.advance(ConnectionState::Registered));
        assert!(state.advance(ConnectionState::Unregistering));
        assert!(state.advance(ConnectionState::Closed));
        assert!(state.is_closed());
        assert!(!state.advance(ConnectionState::Active));
        assert!(!state.advance(ConnectionState::Closed));
    }

    #[test]
    fn test_failed_registration_can_close_directly() {
        let mut state = ConnectionState::Connecting;
        assert!(state.advance(ConnectionState::Closed));
    }
}
