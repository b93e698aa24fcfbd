use crate::controller::SnapshotObserver;
use crate::events::Publish;
use crate::state::{RunMetadata, RunReport, RunSummary, Snapshot, TickSample};

/// Aggregates every tick of a run into a [`RunReport`].
#[derive(Debug, Default)]
pub struct RunRecorder {
    store_samples: bool,
    samples: Vec<TickSample>,
    response_times: Vec<u64>,
    total_throughput: u64,
    peak_error_rate: f64,
    peak_cpu: u8,
    peak_memory: u8,
    triggered: Vec<(u32, String)>,
}

impl RunRecorder {
    pub fn new(store_samples: bool) -> Self {
        Self {
            store_samples,
            ..Self::default()
        }
    }

    pub fn ticks(&self) -> u64 {
        self.response_times.len() as u64
    }

    fn record(&mut self, snapshot: &Snapshot) {
        let metrics = &snapshot.metrics;
        self.response_times.push(metrics.response_time);
        self.total_throughput = self.total_throughput.saturating_add(metrics.throughput);
        self.peak_error_rate = self.peak_error_rate.max(metrics.error_rate);
        self.peak_cpu = self.peak_cpu.max(metrics.cpu_usage);
        self.peak_memory = self.peak_memory.max(metrics.memory_usage);

        for bottleneck in &snapshot.active_bottlenecks {
            if !self.triggered.iter().any(|(_, id)| *id == bottleneck.id) {
                self.triggered
                    .push((bottleneck.triggers_at, bottleneck.id.clone()));
            }
        }

        if self.store_samples {
            self.samples.push(TickSample {
                tick: snapshot.tick,
                timestamp: snapshot
                    .history
                    .last()
                    .map(|point| point.timestamp)
                    .unwrap_or(0),
                metrics: *metrics,
                status: snapshot.status,
                active_bottlenecks: snapshot
                    .active_bottlenecks
                    .iter()
                    .map(|bottleneck| bottleneck.id.clone())
                    .collect(),
            });
        }
    }

    pub fn summary(&self) -> RunSummary {
        let ticks = self.ticks();
        if ticks == 0 {
            return RunSummary::default();
        }

        let mut sorted = self.response_times.clone();
        sorted.sort_unstable();
        let total_response = sorted
            .iter()
            .fold(0u64, |acc, value| acc.saturating_add(*value));

        let mut triggered = self.triggered.clone();
        triggered.sort();

        RunSummary {
            ticks,
            avg_response_ms: total_response / ticks,
            p95_response_ms: nearest_rank_percentile(&sorted, 95.0),
            p99_response_ms: nearest_rank_percentile(&sorted, 99.0),
            peak_response_ms: sorted.last().copied().unwrap_or(0),
            peak_error_rate: self.peak_error_rate,
            peak_cpu: self.peak_cpu,
            peak_memory: self.peak_memory,
            avg_throughput: self.total_throughput / ticks,
            bottlenecks_triggered: triggered.into_iter().map(|(_, id)| id).collect(),
        }
    }

    pub fn finish(&self, metadata: RunMetadata, final_snapshot: Snapshot) -> RunReport {
        RunReport {
            metadata,
            samples: self.samples.clone(),
            summary: self.summary(),
            final_snapshot,
        }
    }
}

impl SnapshotObserver for RunRecorder {
    fn on_publish(&mut self, reason: Publish, snapshot: &Snapshot) {
        if reason == Publish::Tick {
            self.record(snapshot);
        }
    }
}

fn nearest_rank_percentile(sorted: &[u64], percentile: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SimulationController;
    use crate::jitter::ConstantJitter;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn percentile_uses_nearest_rank() {
        let sorted: Vec<u64> = (1..=20).collect();
        assert_eq!(nearest_rank_percentile(&sorted, 95.0), Some(19));
        assert_eq!(nearest_rank_percentile(&sorted, 99.0), Some(20));
        assert_eq!(nearest_rank_percentile(&[], 95.0), None);
    }

    #[test]
    fn empty_run_has_default_summary() {
        let recorder = RunRecorder::new(true);
        let summary = recorder.summary();
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.p95_response_ms, None);
    }

    #[test]
    fn records_only_ticks_and_orders_triggered_bottlenecks() {
        let recorder = Rc::new(RefCell::new(RunRecorder::new(true)));
        let mut controller =
            SimulationController::with_jitter(Box::new(ConstantJitter::zero()), 0);
        controller.subscribe(Box::new(recorder.clone()));
        controller.start();
        controller.set_user_multiplier(100);
        controller.advance_by(1000);
        controller.set_user_multiplier(250);
        controller.advance_by(1000);
        controller.reset();

        let recorder = recorder.borrow();
        let summary = recorder.summary();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.peak_error_rate, 50.0);
        assert_eq!(summary.peak_cpu, 100);
        assert_eq!(
            summary.bottlenecks_triggered,
            vec!["db-connections", "no-cache", "memory-leak", "single-thread"]
        );
        assert_eq!(recorder.samples.len(), 3);
        assert_eq!(recorder.samples[0].metrics.active_users, 10);
        assert_eq!(recorder.samples[1].timestamp, 1000);
        assert_eq!(recorder.samples[2].metrics.active_users, 2375);
    }

    #[test]
    fn samples_are_skipped_when_not_stored() {
        let recorder = Rc::new(RefCell::new(RunRecorder::new(false)));
        let mut controller =
            SimulationController::with_jitter(Box::new(ConstantJitter::zero()), 0);
        controller.subscribe(Box::new(recorder.clone()));
        controller.start();
        controller.advance_by(2000);
        assert!(recorder.borrow().samples.is_empty());
        assert_eq!(recorder.borrow().summary().ticks, 3);
        assert_eq!(recorder.borrow().summary().avg_response_ms, 52);
    }
}
