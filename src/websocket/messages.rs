//! WebSocket Message Types
//!
//! The relay speaks a single JSON shape in both directions:
//!
//! ```json
//! { "text": "hello", "language": "en" }
//! ```
//!
//! From a speaker, `language` is the language the text is already in.
//! To an audience member, `text` is the translation and `language` echoes
//! the recipient's own language.

use serde::{Deserialize, Serialize};

/// JSON text frame exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub text: String,
    pub language: String,
}

impl WireMessage {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }

    /// Decode an inbound text frame into an utterance
    pub fn parse(frame: &str) -> Result<Utterance, serde_json::Error> {
        let msg: WireMessage = serde_json::from_str(frame)?;
        Ok(Utterance {
            text: msg.text,
            language: msg.language,
        })
    }

    /// Encode for an outbound text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A speaker's message on its way through the hub.
///
/// Lives only for one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// Language `text` is written in
    pub language: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}
