//! Gate deciding whether the next user input must be an option choice.

use crate::error::EngineError;
use crate::transcript::{ChoiceOption, Item, TranscriptModel};

/// Input mode derived from the transcript; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Free-text entry is allowed.
    Idle,
    /// The trailing assistant item is an unresolved choice prompt: the
    /// next input must be one of its options.
    AwaitingChoice,
}

/// Derives the gate from the last item of the last turn.
#[must_use]
pub fn derive(model: &TranscriptModel) -> GateState {
    match model.last_turn().and_then(|turn| turn.items().last()) {
        Some(item) if item.is_unresolved_interactive() => GateState::AwaitingChoice,
        _ => GateState::Idle,
    }
}

/// Options of the pending choice prompt, when one is awaiting input.
#[must_use]
pub fn pending_options(model: &TranscriptModel) -> Option<&[ChoiceOption]> {
    match model.last_turn()?.items().last()? {
        Item::Interactive {
            options,
            resolved_value: None,
            ..
        } => Some(options),
        _ => None,
    }
}

/// Checks that `value` names one of the pending options.
pub fn validate_choice(model: &TranscriptModel, value: &str) -> Result<(), EngineError> {
    let options = pending_options(model).ok_or_else(|| {
        EngineError::precondition("no interactive prompt is awaiting a choice")
    })?;
    if options.iter().any(|option| option.value == value) {
        Ok(())
    } else {
        Err(EngineError::precondition(format!(
            "\"{value}\" is not one of the offered options"
        )))
    }
}

/// Rejects free-text input while a choice prompt is pending.
pub fn ensure_free_text_allowed(model: &TranscriptModel) -> Result<(), EngineError> {
    match derive(model) {
        GateState::Idle => Ok(()),
        GateState::AwaitingChoice => Err(EngineError::precondition(
            "an interactive prompt is awaiting a choice",
        )),
    }
}
