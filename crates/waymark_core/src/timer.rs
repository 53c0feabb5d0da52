//! Single-shot timers and the debounce primitive
//!
//! Timers are plain data: the owner schedules tasks with a deadline and the host
//! calls back with the current time. Nothing runs on its own, so cancelling a
//! timer is just removing its entry and `clear()` leaves nothing behind.

use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a scheduled timer
    pub struct TimerId;
}

struct TimerEntry<T> {
    deadline: Duration,
    seq: u64,
    task: T,
}

/// A set of pending single-shot timers carrying tasks of type `T`
pub struct Timers<T> {
    entries: SlotMap<TimerId, TimerEntry<T>>,
    next_seq: u64,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            next_seq: 0,
        }
    }

    /// Schedule `task` to fire `delay` after `now`
    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(TimerEntry {
            deadline: now + delay,
            seq,
            task,
        })
    }

    /// Remove a pending timer, returning its task if it had not fired yet
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.entries.remove(id).map(|entry| entry.task)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.contains_key(id)
    }

    /// Earliest deadline among pending timers
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    /// Remove and return every timer due at `now`, in deadline order
    pub fn take_due(&mut self, now: Duration) -> Vec<(TimerId, T)> {
        let mut due: Vec<(TimerId, Duration, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, entry)| (id, entry.deadline, entry.seq))
            .collect();
        due.sort_by_key(|&(_, deadline, seq)| (deadline, seq));

        due.into_iter()
            .filter_map(|(id, _, _)| self.entries.remove(id).map(|entry| (id, entry.task)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cancel-and-reschedule: the pending timer (if any) is dropped and `task`
/// is scheduled a full `window` from `now`
pub fn debounce<T>(
    timers: &mut Timers<T>,
    pending: Option<TimerId>,
    now: Duration,
    window: Duration,
    task: T,
) -> TimerId {
    if let Some(id) = pending {
        timers.cancel(id);
    }
    timers.schedule(now, window, task)
}

/// Owner-side state for one debounced action
#[derive(Debug, Clone, Copy, Default)]
pub struct Debouncer {
    pending: Option<TimerId>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: None,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register a trigger; bursts collapse into one firing
    pub fn trigger<T>(&mut self, timers: &mut Timers<T>, now: Duration, task: T) -> TimerId {
        let id = debounce(timers, self.pending, now, self.window, task);
        self.pending = Some(id);
        id
    }

    /// Whether `id` is this debouncer's timer; clears the pending slot if so
    pub fn fired(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel<T>(&mut self, timers: &mut Timers<T>) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
