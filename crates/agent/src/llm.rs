use anyhow::Result;
use async_trait::async_trait;

use crate::intent::ClassifiedIntent;

/// External intent classification (a language-model call). `history` is a
/// short window of recent dialogue turns for transports that keep one; the
/// stock webhook transport stores no transcript (the context holds shown
/// items, cart, and pending checkout, not turns) and passes an empty slice.
/// A failure here is survivable: the orchestrator falls back to a generic
/// conversational response.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str, history: &[String]) -> Result<ClassifiedIntent>;
}
