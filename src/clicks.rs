//! Single- vs double-click disambiguation for restaurant cards.
//!
//! Each card owns a [`ClickDisambiguator`]. The first click schedules a
//! deferred single-click effect; a second click before the timer fires cancels
//! it and turns into a double click. Deadlines come from an injected [`Timer`]
//! so the machine can be driven without wall-clock waits.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

pub trait Timer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle;

    /// Returns false when the handle already fired or was never scheduled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickState {
    #[default]
    Idle,
    PendingSingle(TimerHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The single-click effect runs when this handle fires.
    Scheduled(TimerHandle),
    DoubleClick,
}

#[derive(Debug)]
pub struct ClickDisambiguator {
    state: ClickState,
    delay: Duration,
}

impl Default for ClickDisambiguator {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_DELAY)
    }
}

impl ClickDisambiguator {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: ClickState::Idle,
            delay,
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    pub fn click<T: Timer>(&mut self, timer: &mut T) -> ClickOutcome {
        match self.state {
            ClickState::Idle => {
                let handle = timer.schedule(self.delay);
                self.state = ClickState::PendingSingle(handle);
                ClickOutcome::Scheduled(handle)
            }
            ClickState::PendingSingle(handle) => {
                timer.cancel(handle);
                self.state = ClickState::Idle;
                ClickOutcome::DoubleClick
            }
        }
    }

    /// Consumes a timer event. True means the single-click effect should run.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        match self.state {
            ClickState::PendingSingle(pending) if pending == handle => {
                self.state = ClickState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drops any pending single click, e.g. when the card goes away.
    pub fn reset<T: Timer>(&mut self, timer: &mut T) {
        if let ClickState::PendingSingle(handle) = self.state {
            timer.cancel(handle);
        }
        self.state = ClickState::Idle;
    }
}

/// Deterministic timer driven by explicit `advance` calls.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerHandle, Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward and returns the handles that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerHandle> {
        self.now += by;
        let mut due: Vec<(Duration, TimerHandle)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= self.now)
            .map(|(handle, deadline)| (*deadline, *handle))
            .collect();
        due.sort();
        for (_, handle) in &due {
            self.pending.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.insert(handle, self.now + delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }
}

/// Runtime timer: each schedule spawns a sleep that reports its handle on a
/// channel. Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct TokioTimer {
    next_id: u64,
    fired: mpsc::UnboundedSender<TimerHandle>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerHandle>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let timer = Self {
            next_id: 0,
            fired,
            tasks: HashMap::new(),
        };
        (timer, receiver)
    }

    /// Forgets the task of a handle whose event was received.
    pub fn acknowledge(&mut self, handle: TimerHandle) {
        self.tasks.remove(&handle);
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone only when the event loop has shut down.
            let _ = fired.send(handle);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.tasks.remove(&handle) {
            Some(task) => {
                let was_pending = !task.is_finished();
                task.abort();
                debug!(?handle, was_pending, "click timer cancelled");
                was_pending
            }
            None => false,
        }
    }
}
