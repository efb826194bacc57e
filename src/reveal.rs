//! Timed reveal of streamed text and the cursor blink that rides along.
//!
//! Authoritative content lives in the transcript; this module only tracks
//! how much of each item is displayed. The displayed prefix is measured in
//! characters and advances on a fixed tick, speeding up when the backlog
//! grows so display can never fall unboundedly behind arrival.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::transcript::TurnId;

/// Timing knobs for the reveal effect.
#[derive(Debug, Clone, Copy)]
pub struct RevealConfig {
    /// Interval between reveal steps.
    pub tick: Duration,
    /// Backlog (in chars) above which the step doubles.
    pub accel_gap: usize,
    /// Backlog above which the step triples.
    pub sprint_gap: usize,
    /// Cursor blink half-period.
    pub blink: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            accel_gap: 100,
            sprint_gap: 200,
            blink: Duration::from_millis(500),
        }
    }
}

impl RevealConfig {
    /// Characters revealed per tick for a given backlog.
    #[must_use]
    pub fn step_for_gap(&self, gap: usize) -> usize {
        if gap > self.sprint_gap {
            3
        } else if gap > self.accel_gap {
            2
        } else {
            1
        }
    }
}

/// Displayed-prefix position within one item, in characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevealCursor {
    displayed: usize,
}

impl RevealCursor {
    #[must_use]
    pub fn displayed(&self) -> usize {
        self.displayed
    }

    /// Advances one tick toward `target`, never overshooting.
    pub fn advance(&mut self, target: usize, config: &RevealConfig) -> usize {
        if self.displayed < target {
            let gap = target - self.displayed;
            self.displayed = (self.displayed + config.step_for_gap(gap)).min(target);
        }
        self.displayed
    }

    /// Jumps straight to `target` on a terminal transition.
    pub fn snap(&mut self, target: usize) {
        self.displayed = target;
    }

    #[must_use]
    pub fn is_caught_up(&self, target: usize) -> bool {
        self.displayed >= target
    }
}

#[derive(Debug, Default)]
struct ItemReveal {
    cursor: RevealCursor,
    cursor_visible: bool,
}

/// Reveal positions for every item currently animating, keyed by turn and
/// item index. Lives under the engine's shared lock next to the transcript.
#[derive(Debug, Default)]
pub struct RevealState {
    items: HashMap<(TurnId, usize), ItemReveal>,
}

impl RevealState {
    pub fn ensure(&mut self, key: (TurnId, usize)) {
        self.items.entry(key).or_default();
    }

    /// Displayed character count for an item, or `None` when the item was
    /// never animated (history loads display in full).
    #[must_use]
    pub fn displayed_len(&self, key: (TurnId, usize)) -> Option<usize> {
        self.items.get(&key).map(|item| item.cursor.displayed())
    }

    #[must_use]
    pub fn cursor_visible(&self, key: (TurnId, usize)) -> bool {
        self.items
            .get(&key)
            .is_some_and(|item| item.cursor_visible)
    }

    /// Advances an item one tick; returns the new displayed length.
    pub fn advance(&mut self, key: (TurnId, usize), target: usize, config: &RevealConfig) -> usize {
        let item = self.items.entry(key).or_default();
        item.cursor.advance(target, config)
    }

    pub fn snap(&mut self, key: (TurnId, usize), target: usize) {
        let item = self.items.entry(key).or_default();
        item.cursor.snap(target);
        item.cursor_visible = false;
    }

    pub fn toggle_cursor(&mut self, key: (TurnId, usize)) {
        if let Some(item) = self.items.get_mut(&key) {
            item.cursor_visible = !item.cursor_visible;
        }
    }

    pub fn hide_cursor(&mut self, key: (TurnId, usize)) {
        if let Some(item) = self.items.get_mut(&key) {
            item.cursor_visible = false;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    #[must_use]
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug)]
struct ItemTasks {
    _tick: TaskGuard,
    _blink: TaskGuard,
}

/// Owner of the per-item tick and blink tasks. Dropping the scheduler, or
/// cancelling an item, aborts its tasks; nothing here blocks.
#[derive(Debug, Default)]
pub struct RevealScheduler {
    tasks: HashMap<(TurnId, usize), ItemTasks>,
}

impl RevealScheduler {
    /// Registers the task pair driving one item, replacing (and thereby
    /// aborting) any previous pair for the same key.
    pub fn register(&mut self, key: (TurnId, usize), tick: JoinHandle<()>, blink: JoinHandle<()>) {
        self.tasks.insert(
            key,
            ItemTasks {
                _tick: TaskGuard::new(tick),
                _blink: TaskGuard::new(blink),
            },
        );
    }

    pub fn cancel(&mut self, key: (TurnId, usize)) {
        self.tasks.remove(&key);
    }

    /// Aborts every registered task. Used when a newer exchange supersedes
    /// the stream being animated, or when the conversation resets.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    #[must_use]
    pub fn is_animating(&self, key: (TurnId, usize)) -> bool {
        self.tasks.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::{RevealConfig, RevealCursor, RevealState};
    use crate::transcript::TranscriptModel;

    #[test]
    fn step_scales_with_backlog() {
        let config = RevealConfig::default();

        assert_eq!(config.step_for_gap(1), 1);
        assert_eq!(config.step_for_gap(100), 1);
        assert_eq!(config.step_for_gap(101), 2);
        assert_eq!(config.step_for_gap(200), 2);
        assert_eq!(config.step_for_gap(201), 3);
        assert_eq!(config.step_for_gap(5_000), 3);
    }

    #[test]
    fn advance_is_monotonic_and_never_overshoots() {
        let config = RevealConfig::default();
        let mut cursor = RevealCursor::default();

        let mut previous = 0;
        while !cursor.is_caught_up(7) {
            let displayed = cursor.advance(7, &config);
            assert!(displayed > previous);
            assert!(displayed <= 7);
            previous = displayed;
        }
        assert_eq!(cursor.displayed(), 7);

        // Caught up: further ticks are no-ops.
        assert_eq!(cursor.advance(7, &config), 7);
    }

    #[test]
    fn large_backlog_drains_faster() {
        let config = RevealConfig::default();
        let mut slow = RevealCursor::default();
        let mut fast = RevealCursor::default();

        for _ in 0..10 {
            slow.advance(50, &config);
            fast.advance(500, &config);
        }
        assert_eq!(slow.displayed(), 10);
        assert_eq!(fast.displayed(), 30);
    }

    #[test]
    fn snap_hides_cursor_and_completes_reveal() {
        let mut model = TranscriptModel::new();
        let turn = model.append_empty_assistant_turn();
        let key = (turn, 0);

        let mut state = RevealState::default();
        state.ensure(key);
        state.toggle_cursor(key);
        assert!(state.cursor_visible(key));

        state.snap(key, 42);
        assert_eq!(state.displayed_len(key), Some(42));
        assert!(!state.cursor_visible(key));
    }

    #[test]
    fn unanimated_items_have_no_reveal_entry() {
        let mut model = TranscriptModel::new();
        let turn = model.append_user_turn("hello");

        let state = RevealState::default();
        assert_eq!(state.displayed_len((turn, 0)), None);
        assert!(!state.cursor_visible((turn, 0)));
    }
}
