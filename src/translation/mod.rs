//! Translation Port
//!
//! The hub only knows the [`Translator`] trait. Concrete providers live in
//! submodules; [`AwsTranslator`] is the production one.
//!
//! Implementations are expected to enforce their own deadline: the hub
//! awaits each call without a timeout of its own.

mod aws;
#[cfg(test)]
pub(crate) mod testing;

pub use aws::{AwsTranslator, TRANSLATE_TARGET};

use async_trait::async_trait;
use thiserror::Error;

/// Something that turns text in one language into another
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider name for logs and health output
    fn name(&self) -> &str;

    /// Translate `text` from `source` to `target`.
    ///
    /// Tags may carry a region suffix ("en-US"); normalising them is the
    /// implementation's job.
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Reduce a language tag to the two/three letter code most providers want.
///
/// "en-US" -> "en", "ZH_tw" -> "zh", "fil" -> "fil".
pub fn normalize_language_code(tag: &str) -> String {
    crate::websocket::primary_subtag(tag).to_ascii_lowercase()
}

/// Errors from a translation provider
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation credentials not configured (missing {0})")]
    MissingCredentials(&'static str),

    #[error("Invalid translation endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("No translation returned")]
    EmptyResult,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Request signing failed: {0}")]
    Signing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code("en-US"), "en");
        assert_eq!(normalize_language_code("ZH_tw"), "zh");
        assert_eq!(normalize_language_code("fr"), "fr");
        assert_eq!(normalize_language_code("fil"), "fil");
    }
}
