use serde::Serialize;

use crate::models::{
    Bottleneck, MetricDataPoint, SimulationConfig, StressLevel, SystemMetrics, SystemStatus,
};

/// Read-only view of the simulation handed to observers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tick: u64,
    pub metrics: SystemMetrics,
    pub config: SimulationConfig,
    pub history: Vec<MetricDataPoint>,
    pub active_bottlenecks: Vec<Bottleneck>,
    pub all_bottlenecks: Vec<Bottleneck>,
    pub status: SystemStatus,
    pub stress: StressLevel,
    pub next_bottleneck_at: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSample {
    pub tick: u64,
    pub timestamp: u64,
    pub metrics: SystemMetrics,
    pub status: SystemStatus,
    pub active_bottlenecks: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub mode: String,
    pub base_users: u32,
    pub multiplier: u32,
    pub tick_rate_ms: u64,
    pub jitter: String,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ticks: u64,
    pub avg_response_ms: u64,
    pub p95_response_ms: Option<u64>,
    pub p99_response_ms: Option<u64>,
    pub peak_response_ms: u64,
    pub peak_error_rate: f64,
    pub peak_cpu: u8,
    pub peak_memory: u8,
    pub avg_throughput: u64,
    pub bottlenecks_triggered: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub samples: Vec<TickSample>,
    pub summary: RunSummary,
    pub final_snapshot: Snapshot,
}

/// One-shot evaluation of the load model, as printed by `compute`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub load_factor: f64,
    pub metrics: SystemMetrics,
    pub status: SystemStatus,
    pub cpu_status: SystemStatus,
    pub memory_status: SystemStatus,
    pub active_bottlenecks: Vec<String>,
    pub next_bottleneck_at: Option<u32>,
}
