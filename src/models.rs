use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub const BASE_USERS: u32 = 10;
pub const DEFAULT_TICK_RATE_MS: u64 = 1000;
pub const DEFAULT_TICKS: u64 = 30;

/// One recomputation of the simulated system. Replaced wholesale every tick.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub active_users: u32,
    pub requests_per_second: u64,
    /// Milliseconds.
    pub response_time: u64,
    /// Percent, two decimals.
    pub error_rate: f64,
    pub cpu_usage: u8,
    pub memory_usage: u8,
    pub throughput: u64,
}

impl SystemMetrics {
    pub fn status(&self) -> SystemStatus {
        if self.error_rate > 10.0 || self.response_time > 500 || self.cpu_usage > 90 {
            return SystemStatus::Critical;
        }
        if self.error_rate > 2.0 || self.response_time > 200 || self.cpu_usage > 70 {
            return SystemStatus::Warning;
        }
        SystemStatus::Healthy
    }

    pub fn cpu_status(&self) -> SystemStatus {
        SystemStatus::for_gauge(self.cpu_usage)
    }

    pub fn memory_status(&self) -> SystemStatus {
        SystemStatus::for_gauge(self.memory_usage)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct MetricDataPoint {
    pub timestamp: u64,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    #[serde(alias = "triggers_at")]
    pub triggers_at: u32,
    pub solution: String,
}

impl Bottleneck {
    pub fn is_active(&self, users: u32) -> bool {
        users >= self.triggers_at
    }
}

/// A position on the fixed multiplier scale.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MultiplierStep(u32);

impl MultiplierStep {
    pub const STEPS: [u32; 9] = [1, 5, 10, 25, 50, 100, 250, 500, 1000];

    pub const MIN: MultiplierStep = MultiplierStep(1);

    pub fn new(value: u32) -> Result<Self> {
        if Self::STEPS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidMultiplier(value))
        }
    }

    /// Closest valid step; ties resolve to the lower step.
    pub fn nearest(value: u32) -> Self {
        let mut best = Self::STEPS[0];
        for step in Self::STEPS {
            if step.abs_diff(value) < best.abs_diff(value) {
                best = step;
            }
        }
        Self(best)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        Self::STEPS
            .iter()
            .position(|step| *step == self.0)
            .unwrap_or(0)
    }

    pub fn step_up(self) -> Self {
        let idx = (self.index() + 1).min(Self::STEPS.len() - 1);
        Self(Self::STEPS[idx])
    }

    pub fn step_down(self) -> Self {
        Self(Self::STEPS[self.index().saturating_sub(1)])
    }

    pub fn stress(self) -> StressLevel {
        if self.0 >= 500 {
            StressLevel::Critical
        } else if self.0 >= 100 {
            StressLevel::Warning
        } else {
            StressLevel::Normal
        }
    }
}

impl Default for MultiplierStep {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for MultiplierStep {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MultiplierStep> for u32 {
    fn from(value: MultiplierStep) -> Self {
        value.0
    }
}

impl fmt::Display for MultiplierStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub user_multiplier: MultiplierStep,
    pub tick_rate: u64,
    pub is_paused: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            user_multiplier: MultiplierStep::MIN,
            tick_rate: DEFAULT_TICK_RATE_MS,
            is_paused: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Warning,
    Critical,
}

impl SystemStatus {
    fn for_gauge(value: u8) -> Self {
        if value > 90 {
            SystemStatus::Critical
        } else if value > 70 {
            SystemStatus::Warning
        } else {
            SystemStatus::Healthy
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SystemStatus::Healthy => "healthy",
            SystemStatus::Warning => "warning",
            SystemStatus::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StressLevel::Normal => "normal",
            StressLevel::Warning => "warning",
            StressLevel::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum JitterConfig {
    #[default]
    Entropy,
    Seeded,
    Zero,
}

impl JitterConfig {
    pub fn label_with_seed(&self, seed: Option<u64>) -> String {
        match (self, seed) {
            (JitterConfig::Seeded, Some(seed)) => format!("seeded({})", seed),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for JitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JitterConfig::Entropy => "entropy",
            JitterConfig::Seeded => "seeded",
            JitterConfig::Zero => "zero",
        };
        f.write_str(label)
    }
}

/// Startup settings, loaded from a config file and overlaid with CLI flags.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimSettings {
    #[serde(default = "default_base_users")]
    pub base_users: u32,
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub jitter: JitterConfig,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub bottlenecks: Option<Vec<Bottleneck>>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            base_users: default_base_users(),
            tick_rate_ms: default_tick_rate_ms(),
            multiplier: default_multiplier(),
            ticks: default_ticks(),
            jitter: JitterConfig::default(),
            seed: None,
            bottlenecks: None,
        }
    }
}

impl SimSettings {
    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        Ok(SimulationConfig {
            user_multiplier: MultiplierStep::new(self.multiplier)?,
            tick_rate: self.tick_rate_ms,
            is_paused: false,
        })
    }
}

fn default_base_users() -> u32 {
    BASE_USERS
}

fn default_tick_rate_ms() -> u64 {
    DEFAULT_TICK_RATE_MS
}

fn default_multiplier() -> u32 {
    1
}

fn default_ticks() -> u64 {
    DEFAULT_TICKS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(error_rate: f64, response_time: u64, cpu_usage: u8) -> SystemMetrics {
        SystemMetrics {
            active_users: 10,
            requests_per_second: 20,
            response_time,
            error_rate,
            cpu_usage,
            memory_usage: 0,
            throughput: 20,
        }
    }

    #[test]
    fn status_thresholds_are_exclusive() {
        assert_eq!(metrics(2.0, 200, 70).status(), SystemStatus::Healthy);
        assert_eq!(metrics(2.01, 52, 3).status(), SystemStatus::Warning);
        assert_eq!(metrics(0.1, 201, 3).status(), SystemStatus::Warning);
        assert_eq!(metrics(0.1, 52, 71).status(), SystemStatus::Warning);
        assert_eq!(metrics(10.0, 500, 90).status(), SystemStatus::Warning);
        assert_eq!(metrics(10.5, 52, 3).status(), SystemStatus::Critical);
        assert_eq!(metrics(0.1, 501, 3).status(), SystemStatus::Critical);
        assert_eq!(metrics(0.1, 52, 91).status(), SystemStatus::Critical);
    }

    #[test]
    fn gauge_status_uses_resource_thresholds() {
        let mut sample = metrics(0.1, 52, 95);
        sample.memory_usage = 71;
        assert_eq!(sample.cpu_status(), SystemStatus::Critical);
        assert_eq!(sample.memory_status(), SystemStatus::Warning);
    }

    #[test]
    fn multiplier_rejects_values_outside_step_set() {
        assert!(MultiplierStep::new(100).is_ok());
        let err = MultiplierStep::new(7).unwrap_err();
        assert_eq!(
            err.to_string(),
            "multiplier must be one of 1, 5, 10, 25, 50, 100, 250, 500, 1000 (got 7)"
        );
    }

    #[test]
    fn multiplier_nearest_prefers_lower_step_on_ties() {
        assert_eq!(MultiplierStep::nearest(0).value(), 1);
        assert_eq!(MultiplierStep::nearest(3).value(), 1);
        assert_eq!(MultiplierStep::nearest(4).value(), 5);
        assert_eq!(MultiplierStep::nearest(75).value(), 50);
        assert_eq!(MultiplierStep::nearest(76).value(), 100);
        assert_eq!(MultiplierStep::nearest(u32::MAX).value(), 1000);
    }

    #[test]
    fn multiplier_steps_saturate_at_both_ends() {
        assert_eq!(MultiplierStep::MIN.step_down(), MultiplierStep::MIN);
        let top = MultiplierStep::new(1000).unwrap();
        assert_eq!(top.step_up(), top);
        assert_eq!(MultiplierStep::new(25).unwrap().step_up().value(), 50);
    }

    #[test]
    fn stress_level_follows_multiplier() {
        assert_eq!(MultiplierStep::new(50).unwrap().stress(), StressLevel::Normal);
        assert_eq!(MultiplierStep::new(100).unwrap().stress(), StressLevel::Warning);
        assert_eq!(MultiplierStep::new(500).unwrap().stress(), StressLevel::Critical);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: SimSettings = toml::from_str("multiplier = 25").unwrap();
        assert_eq!(settings.base_users, 10);
        assert_eq!(settings.tick_rate_ms, 1000);
        assert_eq!(settings.multiplier, 25);
        assert_eq!(settings.jitter, JitterConfig::Entropy);
        assert!(settings.bottlenecks.is_none());
    }

    #[test]
    fn jitter_label_includes_seed_only_when_seeded() {
        assert_eq!(JitterConfig::Seeded.label_with_seed(Some(42)), "seeded(42)");
        assert_eq!(JitterConfig::Zero.label_with_seed(Some(42)), "zero");
        assert_eq!(JitterConfig::Entropy.label_with_seed(None), "entropy");
    }
}
