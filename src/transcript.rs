use std::fmt;

use fastgpt_api::{ChatMessage, DeltaEvent};

use crate::citation::CitationIndex;
use crate::error::EngineError;

/// Identifier for one conversational turn, stable for the engine's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One selectable value of an interactive choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub key: String,
    pub value: String,
}

/// A typed sub-unit of a turn's content, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Text {
        content: String,
    },
    Reasoning {
        content: String,
        duration_seconds: Option<f64>,
    },
    Interactive {
        prompt: String,
        options: Vec<ChoiceOption>,
        resolved_value: Option<String>,
    },
}

impl Item {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn reasoning(content: impl Into<String>) -> Self {
        Self::Reasoning {
            content: content.into(),
            duration_seconds: None,
        }
    }

    /// Returns the accumulated text for text-bearing items.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text { content } | Self::Reasoning { content, .. } => Some(content),
            Self::Interactive { .. } => None,
        }
    }

    #[must_use]
    pub fn is_unresolved_interactive(&self) -> bool {
        matches!(
            self,
            Self::Interactive {
                resolved_value: None,
                ..
            }
        )
    }
}

/// One citable document attached to an assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub id: String,
    /// Storage-layer alias (`_id`) also accepted by citation lookup.
    pub secondary_id: Option<String>,
    pub source_name: String,
    pub title: String,
    pub body: String,
    pub score: Option<f64>,
}

impl Source {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secondary_id: None,
            source_name: String::new(),
            title: String::new(),
            body: String::new(),
            score: None,
        }
    }
}

/// One logical user or assistant contribution to the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    id: TurnId,
    role: Role,
    items: Vec<Item>,
    sources: Vec<Source>,
    citations: CitationIndex,
    duration_seconds: Option<f64>,
    failure: Option<String>,
    streaming: bool,
}

impl Turn {
    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Derived citation lookup, rebuilt on every source (re)attachment.
    #[must_use]
    pub fn citations(&self) -> &CitationIndex {
        &self.citations
    }

    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    /// Terminal failure note left by a transport error, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn combined_text(&self) -> String {
        let mut parts = Vec::new();
        for item in &self.items {
            if let Item::Text { content } = item {
                parts.push(content.as_str());
            }
        }
        parts.join("\n")
    }
}

/// Ordered conversation state: the single shared mutable resource.
///
/// All mutation funnels through the engine's one lock; see the engine for
/// the single-writer discipline.
#[derive(Debug, Default)]
pub struct TranscriptModel {
    turns: Vec<Turn>,
    next_turn_id: u64,
}

impl TranscriptModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Appends a completed user turn holding a single text item.
    pub fn append_user_turn(&mut self, text: impl Into<String>) -> TurnId {
        let id = self.allocate_turn_id();
        self.turns.push(Turn {
            id,
            role: Role::User,
            items: vec![Item::text(text)],
            sources: Vec::new(),
            citations: CitationIndex::default(),
            duration_seconds: None,
            failure: None,
            streaming: false,
        });
        id
    }

    /// Appends the empty assistant turn that subsequent deltas target.
    pub fn append_empty_assistant_turn(&mut self) -> TurnId {
        let id = self.allocate_turn_id();
        self.turns.push(Turn {
            id,
            role: Role::Assistant,
            items: vec![Item::text("")],
            sources: Vec::new(),
            citations: CitationIndex::default(),
            duration_seconds: None,
            failure: None,
            streaming: true,
        });
        id
    }

    /// Appends a non-streaming turn shell for bulk history loading.
    pub fn append_loaded_turn(&mut self, role: Role) -> TurnId {
        let id = self.allocate_turn_id();
        self.turns.push(Turn {
            id,
            role,
            items: Vec::new(),
            sources: Vec::new(),
            citations: CitationIndex::default(),
            duration_seconds: None,
            failure: None,
            streaming: false,
        });
        id
    }

    /// Folds one delta event into the turn's trailing items.
    ///
    /// Reasoning is assumed to precede content within one streamed answer:
    /// a reasoning fragment extends a trailing reasoning item, or replaces
    /// the initial empty text placeholder; once content has started, late
    /// reasoning fragments are dropped. Content extends the trailing text
    /// item, opening a new one after reasoning ends.
    pub fn apply_delta(&mut self, id: TurnId, event: &DeltaEvent) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        if !turn.streaming {
            return Err(EngineError::precondition(
                "cannot apply deltas to a turn that is no longer streaming",
            ));
        }

        if !event.reasoning.is_empty() {
            let placeholder_only =
                matches!(turn.items.as_slice(), [Item::Text { content }] if content.is_empty());
            if placeholder_only {
                turn.items[0] = Item::reasoning(event.reasoning.clone());
            } else {
                match turn.items.last_mut() {
                    Some(Item::Reasoning { content, .. }) => content.push_str(&event.reasoning),
                    _ => {
                        tracing::debug!(turn = %id, "dropping reasoning fragment after content started");
                    }
                }
            }
        }

        if !event.content.is_empty() {
            match turn.items.last_mut() {
                Some(Item::Text { content }) => content.push_str(&event.content),
                Some(Item::Reasoning { .. }) | None => {
                    turn.items.push(Item::text(event.content.clone()));
                }
                Some(Item::Interactive { .. }) => {
                    tracing::debug!(turn = %id, "dropping content fragment after interactive prompt");
                }
            }
        }

        Ok(())
    }

    /// Replaces a turn's items wholesale and attaches its source list.
    ///
    /// Used when loading a finished turn from storage; the turn leaves
    /// streaming state and its citation index is rebuilt.
    pub fn replace_turn_items(
        &mut self,
        id: TurnId,
        items: Vec<Item>,
        sources: Vec<Source>,
    ) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        turn.items = items;
        turn.citations = CitationIndex::from_sources(&sources);
        turn.sources = sources;
        turn.streaming = false;
        Ok(())
    }

    /// Attaches (or idempotently re-attaches) a turn's source list.
    pub fn attach_sources(&mut self, id: TurnId, sources: Vec<Source>) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        turn.citations = CitationIndex::from_sources(&sources);
        turn.sources = sources;
        Ok(())
    }

    pub fn set_duration_seconds(&mut self, id: TurnId, seconds: f64) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        turn.duration_seconds = Some(seconds);
        Ok(())
    }

    /// Resolves the trailing unresolved interactive prompt with `value`.
    pub fn resolve_interactive(&mut self, id: TurnId, value: &str) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        match turn.items.last_mut() {
            Some(Item::Interactive {
                resolved_value: resolved_value @ None,
                ..
            }) => {
                *resolved_value = Some(value.to_owned());
                Ok(())
            }
            _ => Err(EngineError::precondition(
                "trailing item is not an unresolved interactive prompt",
            )),
        }
    }

    /// Marks a streaming turn complete.
    pub fn mark_finished(&mut self, id: TurnId) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        turn.streaming = false;
        Ok(())
    }

    /// Marks a streaming turn failed, leaving partial content in place.
    pub fn mark_failed(&mut self, id: TurnId, error: impl Into<String>) -> Result<(), EngineError> {
        let turn = self.turn_mut(id)?;
        turn.streaming = false;
        turn.failure = Some(error.into());
        Ok(())
    }

    /// Character length of a text-bearing item, or `None` when the item is
    /// missing or interactive. Lengths are counted in characters so reveal
    /// prefixes never split a multi-byte sequence.
    #[must_use]
    pub fn item_char_len(&self, id: TurnId, item_index: usize) -> Option<usize> {
        self.turn(id)?
            .items
            .get(item_index)?
            .content()
            .map(|content| content.chars().count())
    }

    /// Model-facing context messages for the next request: each turn's
    /// text items flattened into one message per turn.
    #[must_use]
    pub fn context_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.combined_text()),
                Role::Assistant => ChatMessage::assistant(turn.combined_text()),
            })
            .collect()
    }

    fn allocate_turn_id(&mut self) -> TurnId {
        self.next_turn_id += 1;
        TurnId(self.next_turn_id)
    }

    fn turn_mut(&mut self, id: TurnId) -> Result<&mut Turn, EngineError> {
        self.turns
            .iter_mut()
            .find(|turn| turn.id == id)
            .ok_or(EngineError::TurnNotFound(id))
    }
}
