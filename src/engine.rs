//! Conversation orchestration: exchanges, stale-stream discard, snapshots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use fastgpt_api::{ChatCompletionRequest, ChatMessage, ChatRole, DeltaFrameDecoder};
use futures_util::StreamExt;
use tokio::sync::watch;

use crate::error::EngineError;
use crate::history::HistoryRecord;
use crate::interactive::{self, GateState};
use crate::reveal::{RevealConfig, RevealScheduler, RevealState};
use crate::transcript::{ChoiceOption, Item, Role, TranscriptModel, TurnId};
use crate::transport::StreamTransport;

/// Conversation identity and tuning for one engine instance.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub app_id: String,
    pub chat_id: String,
    pub share_id: Option<String>,
    pub out_link_uid: Option<String>,
    pub reveal: RevealConfig,
}

/// How an exchange ended, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// Transport failure after the exchange started; the assistant turn is
    /// marked failed and keeps whatever content arrived.
    Failed(String),
    /// A newer exchange (or a reset) started while this one streamed; the
    /// assistant turn is frozen with its partial content.
    Superseded,
}

/// Result of one send or choice submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Absent for choice submissions, which add no visible user turn.
    pub user_turn: Option<TurnId>,
    pub assistant_turn: TurnId,
    pub outcome: SendOutcome,
}

/// Read-only view of the conversation for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnapshot {
    pub turns: Vec<TurnSnapshot>,
    pub gate: GateState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnSnapshot {
    pub id: TurnId,
    pub role: Role,
    pub items: Vec<ItemSnapshot>,
    pub source_count: usize,
    pub duration_seconds: Option<f64>,
    pub failure: Option<String>,
    pub streaming: bool,
}

/// One item with both its authoritative text and the revealed prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSnapshot {
    Text {
        authoritative: String,
        displayed: String,
        cursor_visible: bool,
    },
    Reasoning {
        authoritative: String,
        displayed: String,
        cursor_visible: bool,
        duration_seconds: Option<f64>,
    },
    Interactive {
        prompt: String,
        options: Vec<ChoiceOption>,
        resolved_value: Option<String>,
    },
}

/// Transcript and reveal positions behind the engine's single lock.
#[derive(Debug, Default)]
struct EngineShared {
    transcript: TranscriptModel,
    reveal: RevealState,
}

/// Client-side conversation engine.
///
/// All methods take `&self`; the engine owns its synchronization. Exactly
/// one exchange streams at a time: starting a new one bumps the epoch,
/// which any in-flight exchange observes and abandons.
pub struct ChatEngine {
    shared: Arc<Mutex<EngineShared>>,
    transport: Arc<dyn StreamTransport>,
    config: EngineConfig,
    epoch: watch::Sender<u64>,
    changes: Arc<watch::Sender<u64>>,
    scheduler: Mutex<RevealScheduler>,
}

impl ChatEngine {
    #[must_use]
    pub fn new(transport: Arc<dyn StreamTransport>, config: EngineConfig) -> Self {
        let (epoch, _) = watch::channel(0);
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Mutex::new(EngineShared::default())),
            transport,
            config,
            epoch,
            changes: Arc::new(changes),
            scheduler: Mutex::new(RevealScheduler::default()),
        }
    }

    /// Receiver that ticks whenever the renderable state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        let shared = lock_unpoisoned(&self.shared);
        interactive::derive(&shared.transcript)
    }

    #[must_use]
    pub fn pending_options(&self) -> Vec<ChoiceOption> {
        let shared = lock_unpoisoned(&self.shared);
        interactive::pending_options(&shared.transcript)
            .map(<[_]>::to_vec)
            .unwrap_or_default()
    }

    /// Citation ordinal for an id cited within a turn's text.
    #[must_use]
    pub fn citation_ordinal(&self, turn: TurnId, id: &str) -> Option<usize> {
        let shared = lock_unpoisoned(&self.shared);
        shared.transcript.turn(turn)?.citations().ordinal(id)
    }

    /// Sends free-text user input and streams the assistant reply.
    ///
    /// Returns `Ok` with a failed outcome on transport errors once the
    /// exchange has started; only gate violations surface as `Err`.
    pub async fn send_user_message(&self, text: &str) -> Result<SendReceipt, EngineError> {
        let (user_turn, assistant_turn, messages) = {
            let mut shared = lock_unpoisoned(&self.shared);
            interactive::ensure_free_text_allowed(&shared.transcript)?;
            let user_turn = shared.transcript.append_user_turn(text);
            let messages = shared.transcript.context_messages();
            let assistant_turn = shared.transcript.append_empty_assistant_turn();
            (user_turn, assistant_turn, messages)
        };
        self.notify_changed();

        let outcome = self.run_exchange(assistant_turn, messages).await?;
        Ok(SendReceipt {
            user_turn: Some(user_turn),
            assistant_turn,
            outcome,
        })
    }

    /// Submits one of the pending interactive options.
    ///
    /// The submission travels as a single hidden user message; no visible
    /// user turn is added.
    pub async fn select_interactive_option(&self, value: &str) -> Result<SendReceipt, EngineError> {
        let (assistant_turn, messages) = {
            let mut shared = lock_unpoisoned(&self.shared);
            interactive::validate_choice(&shared.transcript, value)?;
            let prompt_turn = shared
                .transcript
                .last_turn()
                .map(|turn| turn.id())
                .ok_or_else(|| EngineError::precondition("transcript is empty"))?;
            shared.transcript.resolve_interactive(prompt_turn, value)?;

            let reply = ChatMessage {
                data_id: Some(uuid::Uuid::new_v4().to_string()),
                hide_in_ui: Some(false),
                role: ChatRole::User,
                content: value.to_string(),
            };
            let assistant_turn = shared.transcript.append_empty_assistant_turn();
            (assistant_turn, vec![reply])
        };
        self.notify_changed();

        let outcome = self.run_exchange(assistant_turn, messages).await?;
        Ok(SendReceipt {
            user_turn: None,
            assistant_turn,
            outcome,
        })
    }

    /// Replaces the conversation with stored turns, displayed in full.
    pub fn load_history_turns(&self, records: Vec<HistoryRecord>) -> Result<(), EngineError> {
        self.bump_epoch();
        lock_unpoisoned(&self.scheduler).cancel_all();

        let mut shared = lock_unpoisoned(&self.shared);
        shared.reveal.clear();
        shared.transcript.clear();
        for record in records {
            let turn = shared.transcript.append_loaded_turn(record.role());
            let items = record.items();
            let sources = record.sources();
            let duration = record.duration_seconds;
            shared.transcript.replace_turn_items(turn, items, sources)?;
            if let Some(seconds) = duration {
                shared.transcript.set_duration_seconds(turn, seconds)?;
            }
        }
        drop(shared);
        self.notify_changed();
        Ok(())
    }

    /// Abandons any in-flight stream and empties the transcript.
    pub fn clear_conversation(&self) {
        self.bump_epoch();
        lock_unpoisoned(&self.scheduler).cancel_all();

        let mut shared = lock_unpoisoned(&self.shared);
        shared.reveal.clear();
        shared.transcript.clear();
        drop(shared);
        self.notify_changed();
    }

    /// Consistent view of every turn, with displayed prefixes resolved.
    #[must_use]
    pub fn snapshot(&self) -> TranscriptSnapshot {
        let shared = lock_unpoisoned(&self.shared);
        let turns = shared
            .transcript
            .turns()
            .iter()
            .map(|turn| TurnSnapshot {
                id: turn.id(),
                role: turn.role(),
                items: turn
                    .items()
                    .iter()
                    .enumerate()
                    .map(|(index, item)| snapshot_item(&shared.reveal, (turn.id(), index), item))
                    .collect(),
                source_count: turn.sources().len(),
                duration_seconds: turn.duration_seconds(),
                failure: turn.failure().map(str::to_owned),
                streaming: turn.is_streaming(),
            })
            .collect();
        TranscriptSnapshot {
            turns,
            gate: interactive::derive(&shared.transcript),
        }
    }

    async fn run_exchange(
        &self,
        assistant_turn: TurnId,
        messages: Vec<ChatMessage>,
    ) -> Result<SendOutcome, EngineError> {
        let mut epoch_rx = self.epoch.subscribe();
        let my_epoch = self.bump_epoch();
        let _ = epoch_rx.borrow_and_update();

        let mut request = ChatCompletionRequest::new(
            self.config.app_id.clone(),
            self.config.chat_id.clone(),
            messages,
        );
        if let Some(share_id) = self.config.share_id.as_deref() {
            request.share_id = share_id.to_string();
        }
        if let Some(out_link_uid) = self.config.out_link_uid.as_deref() {
            request.out_link_uid = out_link_uid.to_string();
        }

        let started = Instant::now();

        let mut bytes = tokio::select! {
            biased;
            _ = epoch_rx.changed() => {
                return self.freeze_superseded(assistant_turn);
            }
            result = self.transport.stream_completion(request) => match result {
                Ok(bytes) => bytes,
                Err(error) => {
                    let message = error.message().to_string();
                    self.fail_turn(assistant_turn, &message)?;
                    return Ok(SendOutcome::Failed(message));
                }
            },
        };

        let mut decoder = DeltaFrameDecoder::default();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = epoch_rx.changed() => {
                    return self.freeze_superseded(assistant_turn);
                }
                chunk = bytes.next() => chunk,
            };

            match chunk {
                Some(Ok(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        if !self.apply_event(my_epoch, assistant_turn, &event)? {
                            return self.freeze_superseded(assistant_turn);
                        }
                    }
                }
                Some(Err(error)) => {
                    let message = error.message().to_string();
                    self.fail_turn(assistant_turn, &message)?;
                    return Ok(SendOutcome::Failed(message));
                }
                None => break,
            }
        }

        for event in decoder.finish() {
            if !self.apply_event(my_epoch, assistant_turn, &event)? {
                return self.freeze_superseded(assistant_turn);
            }
        }

        {
            let mut shared = lock_unpoisoned(&self.shared);
            shared
                .transcript
                .set_duration_seconds(assistant_turn, started.elapsed().as_secs_f64())?;
            shared.transcript.mark_finished(assistant_turn)?;
            self.snap_turn(&mut shared, assistant_turn);
        }
        self.notify_changed();
        tracing::debug!(turn = %assistant_turn, "exchange completed");
        Ok(SendOutcome::Completed)
    }

    /// Applies one delta unless the exchange has been superseded.
    ///
    /// The epoch is re-checked under the shared lock: a chunk already in
    /// hand when an interrupting send bumps the epoch must not mutate the
    /// abandoned turn. Returns false when the delta was discarded as stale.
    fn apply_event(
        &self,
        epoch: u64,
        assistant_turn: TurnId,
        event: &fastgpt_api::DeltaEvent,
    ) -> Result<bool, EngineError> {
        let animate_key = {
            let mut shared = lock_unpoisoned(&self.shared);
            if *self.epoch.borrow() != epoch {
                return Ok(false);
            }
            shared.transcript.apply_delta(assistant_turn, event)?;
            let turn = shared
                .transcript
                .turn(assistant_turn)
                .ok_or(EngineError::TurnNotFound(assistant_turn))?;
            let last_index = turn.items().len().saturating_sub(1);
            let key = (assistant_turn, last_index);
            shared.reveal.ensure(key);
            key
        };
        self.notify_changed();

        let mut scheduler = lock_unpoisoned(&self.scheduler);
        if !scheduler.is_animating(animate_key) {
            let (tick, blink) = self.spawn_reveal_tasks(animate_key);
            scheduler.register(animate_key, tick, blink);
        }
        Ok(true)
    }

    fn spawn_reveal_tasks(
        &self,
        key: (TurnId, usize),
    ) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        let config = self.config.reveal;

        let shared = Arc::clone(&self.shared);
        let changes = Arc::clone(&self.changes);
        let tick = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let done = {
                    let mut guard = lock_unpoisoned(&shared);
                    let Some(target) = guard.transcript.item_char_len(key.0, key.1) else {
                        break;
                    };
                    let streaming = guard
                        .transcript
                        .turn(key.0)
                        .is_some_and(|turn| turn.is_streaming());
                    let displayed = guard.reveal.advance(key, target, &config);
                    if !streaming && displayed >= target {
                        guard.reveal.snap(key, target);
                        true
                    } else {
                        false
                    }
                };
                changes.send_modify(|revision| *revision += 1);
                if done {
                    break;
                }
            }
        });

        let shared = Arc::clone(&self.shared);
        let changes = Arc::clone(&self.changes);
        let blink = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.blink);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                {
                    let mut guard = lock_unpoisoned(&shared);
                    let streaming = guard
                        .transcript
                        .turn(key.0)
                        .is_some_and(|turn| turn.is_streaming());
                    if !streaming {
                        guard.reveal.hide_cursor(key);
                        break;
                    }
                    guard.reveal.toggle_cursor(key);
                }
                changes.send_modify(|revision| *revision += 1);
            }
        });

        (tick, blink)
    }

    /// Freezes a turn whose stream was abandoned by a newer exchange.
    fn freeze_superseded(&self, assistant_turn: TurnId) -> Result<SendOutcome, EngineError> {
        let mut shared = lock_unpoisoned(&self.shared);
        if shared.transcript.turn(assistant_turn).is_some() {
            self.snap_turn(&mut shared, assistant_turn);
            shared.transcript.mark_finished(assistant_turn)?;
        }
        drop(shared);
        self.notify_changed();
        tracing::debug!(turn = %assistant_turn, "exchange superseded");
        Ok(SendOutcome::Superseded)
    }

    fn fail_turn(&self, assistant_turn: TurnId, message: &str) -> Result<(), EngineError> {
        let mut shared = lock_unpoisoned(&self.shared);
        self.snap_turn(&mut shared, assistant_turn);
        shared.transcript.mark_failed(assistant_turn, message)?;
        drop(shared);
        self.notify_changed();
        tracing::warn!(turn = %assistant_turn, error = message, "exchange failed");
        Ok(())
    }

    /// Snaps every item of a turn to its authoritative length.
    fn snap_turn(&self, shared: &mut EngineShared, turn: TurnId) {
        let targets: Vec<(usize, usize)> = shared
            .transcript
            .turn(turn)
            .map(|turn| {
                turn.items()
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| {
                        item.content().map(|text| (index, text.chars().count()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let mut scheduler = lock_unpoisoned(&self.scheduler);
        for (index, target) in targets {
            shared.reveal.snap((turn, index), target);
            scheduler.cancel((turn, index));
        }
    }

    fn bump_epoch(&self) -> u64 {
        let mut bumped = 0;
        self.epoch.send_modify(|epoch| {
            *epoch += 1;
            bumped = *epoch;
        });
        bumped
    }

    fn notify_changed(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }
}

fn snapshot_item(reveal: &RevealState, key: (TurnId, usize), item: &Item) -> ItemSnapshot {
    match item {
        Item::Text { content } => ItemSnapshot::Text {
            authoritative: content.clone(),
            displayed: displayed_prefix(content, reveal.displayed_len(key)),
            cursor_visible: reveal.cursor_visible(key),
        },
        Item::Reasoning {
            content,
            duration_seconds,
        } => ItemSnapshot::Reasoning {
            authoritative: content.clone(),
            displayed: displayed_prefix(content, reveal.displayed_len(key)),
            cursor_visible: reveal.cursor_visible(key),
            duration_seconds: *duration_seconds,
        },
        Item::Interactive {
            prompt,
            options,
            resolved_value,
        } => ItemSnapshot::Interactive {
            prompt: prompt.clone(),
            options: options.clone(),
            resolved_value: resolved_value.clone(),
        },
    }
}

/// Character-prefix view of `content`; items never animated display fully.
fn displayed_prefix(content: &str, displayed: Option<usize>) -> String {
    match displayed {
        Some(chars) => content.chars().take(chars).collect(),
        None => content.to_string(),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
