//! The active-timers set
//!
//! Every periodic or delayed callback of a session is a `Timer` in one
//! `Scheduler`. The host feeds it the current clock; due timers come out in
//! due-time order. Pausing freezes every timer with its remaining delay, and
//! the whole set is torn down as one unit on game over or menu.

use serde::{Deserialize, Serialize};

/// Which schedule a timer drives. Declaration order breaks due-time ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    Fall,
    Countdown,
    SpeedRamp,
    Spawn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    kind: TimerKind,
    due_ms: f64,
    period_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrozenTimer {
    kind: TimerKind,
    remaining_ms: f64,
    period_ms: Option<f64>,
}

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Firing {
    pub kind: TimerKind,
    /// When it was scheduled to fire (may be earlier than the host clock)
    pub at_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    active: Vec<Timer>,
    frozen: Vec<FrozenTimer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once after `delay_ms`; replaces any timer of the same kind
    pub fn arm_once(&mut self, kind: TimerKind, now_ms: f64, delay_ms: f64) {
        self.insert(Timer {
            kind,
            due_ms: now_ms + delay_ms.max(0.0),
            period_ms: None,
        });
    }

    /// Fire every `period_ms`, first after one period; replaces any timer of the same kind
    pub fn arm_repeating(&mut self, kind: TimerKind, now_ms: f64, period_ms: f64) {
        let period = period_ms.max(1.0);
        self.insert(Timer {
            kind,
            due_ms: now_ms + period,
            period_ms: Some(period),
        });
    }

    fn insert(&mut self, timer: Timer) {
        self.cancel(timer.kind);
        self.active.push(timer);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.active.retain(|t| t.kind != kind);
        self.frozen.retain(|t| t.kind != kind);
    }

    /// Drop every timer, running or frozen
    pub fn cancel_all(&mut self) {
        self.active.clear();
        self.frozen.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.active.iter().any(|t| t.kind == kind) || self.frozen.iter().any(|t| t.kind == kind)
    }

    /// Delay until `kind` fires (None if not armed or frozen)
    pub fn due_in(&self, kind: TimerKind, now_ms: f64) -> Option<f64> {
        self.active
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| (t.due_ms - now_ms).max(0.0))
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.frozen.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        !self.frozen.is_empty()
    }

    /// Suspend all timers, remembering how long each had left
    pub fn freeze(&mut self, now_ms: f64) {
        for timer in self.active.drain(..) {
            self.frozen.push(FrozenTimer {
                kind: timer.kind,
                remaining_ms: (timer.due_ms - now_ms).max(0.0),
                period_ms: timer.period_ms,
            });
        }
    }

    /// Re-arm frozen timers with their remaining delays
    pub fn thaw(&mut self, now_ms: f64) {
        for frozen in self.frozen.drain(..) {
            self.active.push(Timer {
                kind: frozen.kind,
                due_ms: now_ms + frozen.remaining_ms,
                period_ms: frozen.period_ms,
            });
        }
    }

    /// Take the earliest timer due at or before `now_ms`.
    /// Repeating timers are re-armed one period after their due time.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Firing> {
        let index = self
            .active
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .total_cmp(&b.due_ms)
                    .then_with(|| a.kind.cmp(&b.kind))
            })
            .map(|(i, _)| i)?;

        let timer = self.active[index];
        let firing = Firing {
            kind: timer.kind,
            at_ms: timer.due_ms,
        };
        match timer.period_ms {
            Some(period) => self.active[index].due_ms += period,
            None => {
                self.active.swap_remove(index);
            }
        }
        Some(firing)
    }

    /// Drop the backlog of one kind, which then fires next at `now_ms`
    /// (one-shot) or one period from `now_ms` (repeating)
    pub fn skip_backlog(&mut self, kind: TimerKind, now_ms: f64) {
        self.rebase(now_ms, |k| k == kind);
    }

    /// Drop the backlog of every timer
    pub fn resync(&mut self, now_ms: f64) {
        self.rebase(now_ms, |_| true);
    }

    fn rebase(&mut self, now_ms: f64, mut selected: impl FnMut(TimerKind) -> bool) {
        for timer in &mut self.active {
            if timer.due_ms < now_ms && selected(timer.kind) {
                timer.due_ms = match timer.period_ms {
                    Some(period) => now_ms + period,
                    None => now_ms,
                };
            }
        }
    }
}
