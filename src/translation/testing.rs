//! In-memory translator for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use super::{TranslationError, Translator};

/// Deterministic translator: a tiny dictionary, otherwise `"[target] text"`
#[derive(Default)]
pub(crate) struct FakeTranslator {
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeTranslator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail every call whose target is one of `targets`
    pub(crate) fn failing_for(mut self, targets: &[&str]) -> Self {
        self.failing = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// (text, source, target) of every call so far
    pub(crate) fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn expected(text: &str, target: &str) -> String {
        match (text, target) {
            ("hello", "es") => "hola".to_string(),
            ("hello", "fr") => "bonjour".to_string(),
            _ => format!("[{}] {}", target, text),
        }
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), source.to_string(), target.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(target) {
            return Err(TranslationError::Provider {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(Self::expected(text, target))
    }
}
