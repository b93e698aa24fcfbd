use std::fmt::Write as _;

use tracing::warn;

use crate::bottleneck::BottleneckCatalog;
use crate::cli::FormatArg;
use crate::controller::SnapshotObserver;
use crate::error::{Error, Result};
use crate::events::Publish;
use crate::models::{MultiplierStep, SimSettings, SystemMetrics, SystemStatus};
use crate::state::{MetricsReport, RunReport, Snapshot};

pub trait Formatter {
    fn write(&self, report: &RunReport) -> Result<String>;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        write_metadata(&mut out, report);
        out.push_str("Ticks:\n");
        for sample in &report.samples {
            let active: Vec<&str> = sample
                .active_bottlenecks
                .iter()
                .map(String::as_str)
                .collect();
            out.push_str(&tick_line(sample.tick, &sample.metrics, sample.status, &active));
            out.push('\n');
        }
        write_summary(&mut out, report);
        Ok(out)
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        write_metadata(&mut out, report);
        write_summary(&mut out, report);
        Ok(out)
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        let mut out = to_json_pretty(report)?;
        out.push('\n');
        Ok(out)
    }
}

pub fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}

fn write_metadata(out: &mut String, report: &RunReport) {
    let meta = &report.metadata;
    out.push_str("Metadata:\n");
    let _ = writeln!(out, "mode: {}", meta.mode);
    let _ = writeln!(out, "jitter: {}", meta.jitter);
    let _ = writeln!(out, "base_users: {}", meta.base_users);
    let _ = writeln!(out, "multiplier: {}x", meta.multiplier);
    let _ = writeln!(out, "tick_rate_ms: {}", meta.tick_rate_ms);
}

fn write_summary(out: &mut String, report: &RunReport) {
    let summary = &report.summary;
    out.push_str("Summary:\n");
    let _ = writeln!(out, "ticks: {}", summary.ticks);
    let _ = writeln!(out, "avg_response: {}ms", summary.avg_response_ms);
    let _ = writeln!(out, "p95_response: {}", optional_ms(summary.p95_response_ms));
    let _ = writeln!(out, "p99_response: {}", optional_ms(summary.p99_response_ms));
    let _ = writeln!(out, "peak_response: {}ms", summary.peak_response_ms);
    let _ = writeln!(out, "peak_error_rate: {:.2}%", summary.peak_error_rate);
    let _ = writeln!(out, "peak_cpu: {}%", summary.peak_cpu);
    let _ = writeln!(out, "peak_memory: {}%", summary.peak_memory);
    let _ = writeln!(out, "avg_throughput: {}", summary.avg_throughput);
    let _ = writeln!(
        out,
        "bottlenecks_triggered: {}",
        join_or_none(summary.bottlenecks_triggered.iter().map(String::as_str))
    );

    let last = &report.final_snapshot;
    out.push_str("Final:\n");
    let _ = writeln!(out, "status: {}", last.status);
    let _ = writeln!(out, "stress: {}", last.stress);
    let _ = writeln!(
        out,
        "active_bottlenecks: {}",
        join_or_none(last.active_bottlenecks.iter().map(|entry| entry.id.as_str()))
    );
    let _ = writeln!(
        out,
        "next_bottleneck_at: {}",
        optional_users(last.next_bottleneck_at)
    );
}

/// Closing line of a live JSON stream, shaped like the per-publication lines.
pub fn report_event_line(report: &RunReport) -> Result<String> {
    let event = serde_json::json!({
        "event": "report",
        "report": report,
    });
    serde_json::to_string(&event)
        .map_err(|err| Error::Runtime(format!("failed to encode JSON: {}", err)))
}

pub fn tick_line(tick: u64, metrics: &SystemMetrics, status: SystemStatus, active: &[&str]) -> String {
    let mut line = format!(
        "#{} users={} rps={} latency={}ms errors={:.2}% cpu={}% mem={}% throughput={} status={}",
        tick,
        metrics.active_users,
        metrics.requests_per_second,
        metrics.response_time,
        metrics.error_rate,
        metrics.cpu_usage,
        metrics.memory_usage,
        metrics.throughput,
        status
    );
    if !active.is_empty() {
        let _ = write!(line, " bottlenecks={}", active.join(","));
    }
    line
}

pub fn format_metrics_report(report: &MetricsReport, format: FormatArg) -> Result<String> {
    if format == FormatArg::Json {
        let mut out = to_json_pretty(report)?;
        out.push('\n');
        return Ok(out);
    }

    let metrics = &report.metrics;
    let mut out = String::new();
    let _ = writeln!(out, "users: {}", metrics.active_users);
    let _ = writeln!(out, "load_factor: {:.2}", report.load_factor);
    let _ = writeln!(out, "requests_per_second: {}", metrics.requests_per_second);
    let _ = writeln!(out, "response_time: {}ms", metrics.response_time);
    let _ = writeln!(out, "error_rate: {:.2}%", metrics.error_rate);
    let _ = writeln!(out, "cpu: {}% ({})", metrics.cpu_usage, report.cpu_status);
    let _ = writeln!(out, "memory: {}% ({})", metrics.memory_usage, report.memory_status);
    let _ = writeln!(out, "throughput: {}", metrics.throughput);
    let _ = writeln!(out, "status: {}", report.status);
    let _ = writeln!(
        out,
        "active_bottlenecks: {}",
        join_or_none(report.active_bottlenecks.iter().map(String::as_str))
    );
    let _ = writeln!(
        out,
        "next_bottleneck_at: {}",
        optional_users(report.next_bottleneck_at)
    );
    Ok(out)
}

pub fn format_catalog(catalog: &BottleneckCatalog, users: Option<u32>) -> String {
    let mut out = String::new();
    for entry in catalog.sorted_by_threshold() {
        let _ = write!(
            out,
            "{} {} ({}): {}",
            entry.triggers_at, entry.id, entry.severity, entry.name
        );
        if users.is_some_and(|users| entry.is_active(users)) {
            out.push_str(" [active]");
        }
        out.push('\n');
    }
    if let Some(users) = users {
        match catalog.next_threshold(users) {
            Some(next) => {
                let _ = writeln!(out, "Next bottleneck at: {} users", next);
            }
            None => out.push_str("All bottlenecks active\n"),
        }
    }
    out
}

pub fn format_settings(settings: &SimSettings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base users: {}", settings.base_users);
    let _ = writeln!(out, "Multiplier: {}x", settings.multiplier);
    let _ = writeln!(out, "Tick rate: {}ms", settings.tick_rate_ms);
    let _ = writeln!(out, "Ticks: {}", settings.ticks);
    let _ = writeln!(
        out,
        "Jitter: {}",
        settings.jitter.label_with_seed(settings.seed)
    );
    match &settings.bottlenecks {
        Some(entries) => {
            let _ = writeln!(out, "Bottlenecks: custom ({})", entries.len());
        }
        None => out.push_str("Bottlenecks: default\n"),
    }
    out
}

pub fn format_multipliers() -> String {
    let mut out = String::new();
    for value in MultiplierStep::STEPS {
        if let Ok(step) = MultiplierStep::new(value) {
            let _ = writeln!(out, "{} {}", step, step.stress());
        }
    }
    out
}

/// Prints publications as they happen during a real-time run.
pub struct LiveObserver {
    format: FormatArg,
}

impl LiveObserver {
    pub fn new(format: FormatArg) -> Self {
        Self { format }
    }

    fn render(&self, reason: Publish, snapshot: &Snapshot) -> Option<String> {
        match self.format {
            FormatArg::Json => {
                let event = serde_json::json!({
                    "event": reason.to_string(),
                    "snapshot": snapshot,
                });
                match serde_json::to_string(&event) {
                    Ok(line) => Some(line),
                    Err(err) => {
                        warn!("failed to encode snapshot: {}", err);
                        None
                    }
                }
            }
            FormatArg::Summary => None,
            FormatArg::Human => match reason {
                Publish::Tick => {
                    let active: Vec<&str> = snapshot
                        .active_bottlenecks
                        .iter()
                        .map(|entry| entry.id.as_str())
                        .collect();
                    Some(tick_line(
                        snapshot.tick,
                        &snapshot.metrics,
                        snapshot.status,
                        &active,
                    ))
                }
                Publish::MultiplierChanged => Some(format!(
                    "-- multiplier {} ({} stress)",
                    snapshot.config.user_multiplier, snapshot.stress
                )),
                Publish::TickRateChanged => {
                    Some(format!("-- tick rate {}ms", snapshot.config.tick_rate))
                }
                other => Some(format!("-- {}", other)),
            },
        }
    }
}

impl SnapshotObserver for LiveObserver {
    fn on_publish(&mut self, reason: Publish, snapshot: &Snapshot) {
        if let Some(line) = self.render(reason, snapshot) {
            println!("{}", line);
        }
    }
}

fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| Error::Runtime(format!("failed to encode JSON: {}", err)))
}

fn optional_ms(value: Option<u64>) -> String {
    match value {
        Some(value) => format!("{}ms", value),
        None => "n/a".to_string(),
    }
}

fn optional_users(value: Option<u32>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let items: Vec<&str> = items.collect();
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(",")
    }
}
