use serde::{Deserialize, Serialize};

/// One increment of assistant output extracted from the stream.
///
/// Either field may be empty, but the decoder never emits an event with
/// both empty. Reasoning is expected to precede content within one reply;
/// enforcing that ordering is the consumer's concern, not the decoder's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEvent {
    pub content: String,
    #[serde(rename = "reasoning_content")]
    pub reasoning: String,
}

impl DeltaEvent {
    /// Constructs a content-only event.
    #[must_use]
    pub fn content(fragment: impl Into<String>) -> Self {
        Self {
            content: fragment.into(),
            reasoning: String::new(),
        }
    }

    /// Constructs a reasoning-only event.
    #[must_use]
    pub fn reasoning(fragment: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            reasoning: fragment.into(),
        }
    }

    /// Returns true when neither fragment carries text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}
