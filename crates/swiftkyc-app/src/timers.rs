//! Deferred work driven by explicit `now_ms` ticks.

use swiftkyc_core::SessionId;
use swiftkyc_ui::View;

/// Interval between progress animation steps.
pub const PROGRESS_TICK_MS: u64 = 300;

/// Delay before the detail view is reloaded after a moderation action.
pub const DETAIL_REFRESH_DELAY_MS: u64 = 400;

/// Work a timer performs when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Advance the upload progress bar.
    ProgressTick,
    /// Show the upload step again.
    RedisplayUpload,
    /// Reload the moderation detail for a session.
    RefreshDetail(SessionId),
}

/// Handle for cancelling one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct ScheduledTimer {
    id: TimerId,
    due_ms: u64,
    owner: View,
    event: TimerEvent,
}

/// Timers tagged with the view that owns them.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    next_id: u64,
    entries: Vec<ScheduledTimer>,
}

impl TimerQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at `due_ms` on behalf of `owner`.
    pub fn schedule(&mut self, due_ms: u64, owner: View, event: TimerEvent) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.entries.push(ScheduledTimer {
            id,
            due_ms,
            owner,
            event,
        });
        id
    }

    /// Cancels one timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Cancels every timer owned by `owner`; returns how many were removed.
    pub fn cancel_owned_by(&mut self, owner: View) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.owner != owner);
        before - self.entries.len()
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns the earliest timer due at `now_ms`.
    ///
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(View, TimerEvent)> {
        let position = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= now_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.id))
            .map(|(position, _)| position)?;
        let entry = self.entries.remove(position);
        Some((entry.owner, entry.event))
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.due_ms).min()
    }

    /// Returns `true` when an equal event is pending.
    pub fn contains(&self, event: &TimerEvent) -> bool {
        self.entries.iter().any(|entry| &entry.event == event)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
