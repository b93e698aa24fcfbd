//! Virtual-time scheduler for simulation ticks.
//!
//! The clock holds at most one pending tick. Arming a new tick always cancels the
//! previous handle, so a stale timer can never fire after pause, reset or a
//! tick-rate change. Time only moves forward.

use tracing::{debug, warn};

use crate::models::{MultiplierStep, SimulationConfig};

/// Identifies one armed tick. Handles are never reused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimerHandle(u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClockState {
    Running,
    Paused,
}

#[derive(Clone, Copy, Debug)]
struct PendingTick {
    handle: TimerHandle,
    due_ms: u64,
}

#[derive(Clone, Debug)]
pub struct SimulationClock {
    config: SimulationConfig,
    defaults: SimulationConfig,
    now_ms: u64,
    pending: Option<PendingTick>,
    next_handle: u64,
}

impl SimulationClock {
    pub fn new(defaults: SimulationConfig, start_ms: u64) -> Self {
        let defaults = SimulationConfig {
            tick_rate: defaults.tick_rate.max(1),
            ..defaults
        };
        Self {
            config: defaults,
            defaults,
            now_ms: start_ms,
            pending: None,
            next_handle: 0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> ClockState {
        if self.config.is_paused {
            ClockState::Paused
        } else {
            ClockState::Running
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.map(|pending| pending.due_ms)
    }

    pub fn schedule_next(&mut self, from_ms: u64) -> TimerHandle {
        self.cancel();
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let due_ms = from_ms.saturating_add(self.config.tick_rate);
        self.pending = Some(PendingTick { handle, due_ms });
        debug!(handle = handle.0, due_ms, "tick armed");
        handle
    }

    pub fn cancel(&mut self) -> Option<TimerHandle> {
        let cancelled = self.pending.take().map(|pending| pending.handle);
        if let Some(handle) = cancelled {
            debug!(handle = handle.0, "tick cancelled");
        }
        cancelled
    }

    /// Moves the clock to the popped tick's due time.
    pub fn poll_due(&mut self, target_ms: u64) -> Option<u64> {
        let pending = self.pending?;
        if pending.due_ms > target_ms {
            return None;
        }
        self.pending = None;
        self.advance_to(pending.due_ms);
        Some(pending.due_ms)
    }

    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    // Resuming leaves the immediate tick and re-arming to the caller.
    pub fn toggle_pause(&mut self) -> ClockState {
        self.config.is_paused = !self.config.is_paused;
        if self.config.is_paused {
            self.cancel();
        }
        self.state()
    }

    pub fn set_multiplier(&mut self, requested: u32) -> MultiplierStep {
        let step = MultiplierStep::nearest(requested);
        if step.value() != requested {
            warn!(
                requested,
                applied = step.value(),
                "multiplier outside step set; clamped to nearest step"
            );
        }
        self.config.user_multiplier = step;
        step
    }

    pub fn set_tick_rate(&mut self, tick_rate_ms: u64) -> bool {
        if tick_rate_ms == 0 {
            warn!("tick rate must be > 0; keeping {}ms", self.config.tick_rate);
            return false;
        }
        self.config.tick_rate = tick_rate_ms;
        if self.pending.is_some() {
            self.schedule_next(self.now_ms);
        }
        true
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.config = self.defaults;
        if self.state() == ClockState::Running {
            self.schedule_next(self.now_ms);
        }
    }

    pub fn dispose(&mut self) {
        self.cancel();
    }
}
