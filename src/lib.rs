//! Client-side engine for streamed, multi-turn chat.
//!
//! The engine owns the conversation transcript, folds streamed delta
//! frames into it, gates input while an interactive prompt awaits a
//! choice, and paces the visual reveal of arriving text. Rendering and
//! persistence live elsewhere; callers observe the engine through
//! [`ChatEngine::snapshot`] and [`ChatEngine::subscribe`].

pub mod citation;
pub mod engine;
pub mod error;
pub mod history;
pub mod interactive;
pub mod reveal;
pub mod transcript;
pub mod transport;
pub mod transports;

pub use citation::CitationIndex;
pub use engine::{
    ChatEngine, EngineConfig, ItemSnapshot, SendOutcome, SendReceipt, TranscriptSnapshot,
    TurnSnapshot,
};
pub use error::EngineError;
pub use history::{HistoryRecord, RecordRole, SourceRecord};
pub use interactive::GateState;
pub use reveal::RevealConfig;
pub use transcript::{ChoiceOption, Item, Role, Source, TranscriptModel, Turn, TurnId};
pub use transport::{ByteChunkStream, StreamTransport, TransportError};
pub use transports::FastgptTransport;
