//! Closed-form load model: user count in, simulated metrics out.
//!
//! Below `BASE_CAPACITY` users the system degrades gracefully; above it latency grows
//! super-linearly, errors grow quadratically and throughput saturates then declines.

use crate::jitter::JitterSource;
use crate::models::SystemMetrics;

pub const BASE_CAPACITY: f64 = 100.0;
pub const BASE_RESPONSE_MS: f64 = 50.0;
pub const MAX_ERROR_RATE: f64 = 50.0;
pub const MAX_THROUGHPUT: f64 = BASE_CAPACITY * 5.0;

pub fn load_factor(users: u32) -> f64 {
    f64::from(users) / BASE_CAPACITY
}

pub fn compute<J: JitterSource + ?Sized>(users: u32, jitter: &mut J) -> SystemMetrics {
    let load = load_factor(users);
    let overload = (load - 1.0).max(0.0);
    let over_capacity = load > 1.0;

    let rps = f64::from(users) * jitter.uniform(2.0, 5.0);

    let response_time = if over_capacity {
        BASE_RESPONSE_MS + load.powf(2.5) * 50.0 + jitter.uniform(0.0, 100.0)
    } else {
        BASE_RESPONSE_MS + load * 20.0 + jitter.uniform(0.0, 10.0)
    };

    let error_rate = if over_capacity {
        (overload.powi(2) * 5.0 + jitter.uniform(0.0, 5.0)).min(MAX_ERROR_RATE)
    } else {
        0.1 + jitter.uniform(0.0, 0.2)
    };

    let cpu_usage = (load * 30.0 + overload * 40.0 + jitter.uniform(0.0, 5.0)).min(100.0);
    let memory_usage = (load * 25.0 + overload * 35.0 + jitter.uniform(0.0, 3.0)).min(100.0);

    let success_ratio = 1.0 - error_rate / 100.0;
    let throughput = if over_capacity {
        MAX_THROUGHPUT * success_ratio / load.sqrt()
    } else {
        rps * success_ratio
    };

    SystemMetrics {
        active_users: users,
        requests_per_second: to_count(rps),
        response_time: to_count(response_time),
        error_rate: round_to(sanitize(error_rate), 2),
        cpu_usage: to_percent(cpu_usage),
        memory_usage: to_percent(memory_usage),
        throughput: to_count(throughput),
    }
}

/// Rounds to the nearest integer, half away from zero.
fn to_count(value: f64) -> u64 {
    sanitize(value).round() as u64
}

fn to_percent(value: f64) -> u8 {
    sanitize(value).round().min(100.0) as u8
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else if value == f64::INFINITY {
        f64::MAX
    } else {
        0.0
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}
