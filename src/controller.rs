use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::bottleneck::BottleneckCatalog;
use crate::clock::{ClockState, SimulationClock};
use crate::config::validate_settings;
use crate::error::Result;
use crate::events::Publish;
use crate::formula;
use crate::history::HistoryBuffer;
use crate::jitter::{build_jitter, JitterSource};
use crate::models::{
    Bottleneck, MetricDataPoint, SimSettings, SimulationConfig, SystemMetrics, BASE_USERS,
};
use crate::state::Snapshot;

pub trait SnapshotObserver {
    fn on_publish(&mut self, reason: Publish, snapshot: &Snapshot);
}

/// Lets the caller keep a handle on an observer it has subscribed.
impl<T: SnapshotObserver> SnapshotObserver for Rc<RefCell<T>> {
    fn on_publish(&mut self, reason: Publish, snapshot: &Snapshot) {
        self.borrow_mut().on_publish(reason, snapshot);
    }
}

/// Composition root: the clock drives ticks, each tick runs the formula, feeds the history
/// and re-evaluates the bottleneck catalog, then publishes a snapshot.
pub struct SimulationController {
    clock: SimulationClock,
    catalog: BottleneckCatalog,
    history: HistoryBuffer,
    metrics: SystemMetrics,
    active: Vec<Bottleneck>,
    base_users: u32,
    jitter: Box<dyn JitterSource>,
    observers: Vec<Box<dyn SnapshotObserver>>,
    ticks: u64,
    disposed: bool,
}

impl SimulationController {
    pub fn new(
        config: SimulationConfig,
        catalog: BottleneckCatalog,
        base_users: u32,
        mut jitter: Box<dyn JitterSource>,
        start_ms: u64,
    ) -> Self {
        let metrics = formula::compute(base_users, jitter.as_mut());
        Self {
            clock: SimulationClock::new(config, start_ms),
            catalog,
            history: HistoryBuffer::new(),
            metrics,
            active: Vec::new(),
            base_users,
            jitter,
            observers: Vec::new(),
            ticks: 0,
            disposed: false,
        }
    }

    pub fn with_jitter(jitter: Box<dyn JitterSource>, start_ms: u64) -> Self {
        Self::new(
            SimulationConfig::default(),
            BottleneckCatalog::default(),
            BASE_USERS,
            jitter,
            start_ms,
        )
    }

    pub fn from_settings(settings: &SimSettings, start_ms: u64) -> Result<Self> {
        validate_settings(settings)?;
        let catalog = match &settings.bottlenecks {
            Some(entries) => BottleneckCatalog::new(entries.clone())?,
            None => BottleneckCatalog::default(),
        };
        let jitter = build_jitter(settings.jitter, settings.seed)?;
        Ok(Self::new(
            settings.simulation_config()?,
            catalog,
            settings.base_users,
            jitter,
            start_ms,
        ))
    }

    pub fn subscribe(&mut self, observer: Box<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    // No-op once ticking.
    pub fn start(&mut self) -> Snapshot {
        if !self.disposed
            && self.clock.state() == ClockState::Running
            && self.clock.next_due_ms().is_none()
        {
            let now = self.clock.now_ms();
            info!(
                multiplier = self.clock.config().user_multiplier.value(),
                tick_rate_ms = self.clock.config().tick_rate,
                "simulation started"
            );
            self.tick(now);
            self.clock.schedule_next(now);
        }
        self.snapshot()
    }

    pub fn toggle_pause(&mut self) -> Snapshot {
        if self.disposed {
            return self.snapshot();
        }
        match self.clock.toggle_pause() {
            ClockState::Paused => {
                info!(tick = self.ticks, "simulation paused");
                self.publish(Publish::Paused);
            }
            ClockState::Running => {
                info!(tick = self.ticks, "simulation resumed");
                let now = self.clock.now_ms();
                self.publish(Publish::Resumed);
                self.tick(now);
                self.clock.schedule_next(now);
            }
        }
        self.snapshot()
    }

    pub fn set_user_multiplier(&mut self, requested: u32) -> Snapshot {
        if self.disposed {
            return self.snapshot();
        }
        let step = self.clock.set_multiplier(requested);
        info!(multiplier = step.value(), "multiplier changed");
        self.publish(Publish::MultiplierChanged);
        self.snapshot()
    }

    pub fn set_tick_rate(&mut self, tick_rate_ms: u64) -> Snapshot {
        if self.disposed {
            return self.snapshot();
        }
        if self.clock.set_tick_rate(tick_rate_ms) {
            info!(tick_rate_ms, "tick rate changed");
            self.publish(Publish::TickRateChanged);
        }
        self.snapshot()
    }

    /// Metrics keep their last value until the next scheduled tick.
    pub fn reset(&mut self) -> Snapshot {
        if self.disposed {
            return self.snapshot();
        }
        self.clock.reset();
        self.history.reset();
        self.active.clear();
        info!("simulation reset");
        self.publish(Publish::Reset);
        self.snapshot()
    }

    /// Fires every tick due at or before `now_ms`, each stamped with its own due time.
    pub fn advance_to(&mut self, now_ms: u64) -> u64 {
        let mut fired = 0;
        while let Some(due_ms) = self.clock.poll_due(now_ms) {
            self.tick(due_ms);
            self.clock.schedule_next(due_ms);
            fired += 1;
        }
        self.clock.advance_to(now_ms);
        fired
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> u64 {
        let target = self.clock.now_ms().saturating_add(delta_ms);
        self.advance_to(target)
    }

    pub fn dispose(&mut self) {
        if !self.disposed {
            self.clock.dispose();
            self.disposed = true;
            info!(ticks = self.ticks, "simulation disposed");
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let config = *self.clock.config();
        Snapshot {
            tick: self.ticks,
            metrics: self.metrics,
            config,
            history: self.history.to_vec(),
            active_bottlenecks: self.active.clone(),
            all_bottlenecks: self.catalog.entries().to_vec(),
            status: self.metrics.status(),
            stress: config.user_multiplier.stress(),
            next_bottleneck_at: self.next_bottleneck_at(),
        }
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SimulationConfig {
        self.clock.config()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn active_bottlenecks(&self) -> &[Bottleneck] {
        &self.active
    }

    pub fn catalog(&self) -> &BottleneckCatalog {
        &self.catalog
    }

    pub fn base_users(&self) -> u32 {
        self.base_users
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.clock.next_due_ms()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn tick(&mut self, at_ms: u64) {
        let multiplier = self.clock.config().user_multiplier.value();
        let spread = self.jitter.uniform(0.95, 1.05);
        let users = (f64::from(self.base_users) * f64::from(multiplier) * spread).round() as u32;

        self.metrics = formula::compute(users, self.jitter.as_mut());
        self.history.append(MetricDataPoint {
            timestamp: at_ms,
            value: self.metrics.response_time as f64,
        });

        let active = self.catalog.evaluate(users);
        for bottleneck in &active {
            if !self.active.iter().any(|current| current.id == bottleneck.id) {
                info!(
                    id = %bottleneck.id,
                    severity = %bottleneck.severity,
                    triggers_at = bottleneck.triggers_at,
                    users,
                    "bottleneck activated"
                );
            }
        }
        self.active = active;
        self.ticks += 1;

        debug!(
            tick = self.ticks,
            at_ms,
            users,
            response_ms = self.metrics.response_time,
            error_rate = self.metrics.error_rate,
            "tick"
        );
        self.publish(Publish::Tick);
    }

    fn next_bottleneck_at(&self) -> Option<u32> {
        self.catalog
            .entries()
            .iter()
            .filter(|entry| !self.active.iter().any(|active| active.id == entry.id))
            .map(|entry| entry.triggers_at)
            .min()
    }

    fn publish(&mut self, reason: Publish) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.on_publish(reason, &snapshot);
        }
    }
}
