//! Deferred work tagged with edit-session epochs.
//!
//! Some recomputation has to run after the renderer's current transform or
//! render cycle settles. Such work is queued here and run by the engine's
//! `settle()` call, which the host issues after the current synchronous turn.
//!
//! Each task carries the epoch that was current when it was scheduled. A new
//! edit session, pan, reset or clear bumps the epoch, and tasks from older
//! epochs are discarded instead of run.

use std::collections::VecDeque;

/// Monotonic edit-session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(pub u64);

/// Work the engine can defer until the render cycle settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Re-run transform-change reconciliation.
    Reconcile,
    /// Capture the renderer's current selection as the logical region.
    Recapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    epoch: Epoch,
    task: DeferredTask,
}

/// FIFO of epoch-tagged deferred tasks.
#[derive(Debug, Default)]
pub struct Scheduler {
    epoch: Epoch,
    queue: VecDeque<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session; everything queued so far becomes stale.
    pub fn begin_session(&mut self) -> Epoch {
        self.epoch = Epoch(self.epoch.0 + 1);
        self.epoch
    }

    /// Queue a task under the current epoch. Identical tasks already queued
    /// for the same epoch are coalesced.
    pub fn schedule(&mut self, task: DeferredTask) {
        let entry = Scheduled {
            epoch: self.epoch,
            task,
        };
        if !self.queue.contains(&entry) {
            self.queue.push_back(entry);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take everything queued so far, split into live and stale tasks.
    ///
    /// Tasks scheduled while the caller runs the live ones land in the queue
    /// for the next drain.
    pub fn drain(&mut self) -> (Vec<DeferredTask>, usize) {
        let current = self.epoch;
        let mut live = Vec::new();
        let mut stale = 0;
        for entry in self.queue.drain(..) {
            if entry.epoch == current {
                live.push(entry.task);
            } else {
                stale += 1;
            }
        }
        (live, stale)
    }
}
