// ABOUTME: Derived container metrics computed from a raw stats sample.
// ABOUTME: CPU percentage, memory usage net of page cache, and primary-interface network counters.

use crate::engine::types::Document;
use serde::Serialize;
use serde_json::Value;

/// Interface whose counters are reported.
const PRIMARY_INTERFACE: &str = "eth0";

/// Metrics for one container, derived from a single stats sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_used: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub network_rx: u64,
    pub network_tx: u64,
}

impl ContainerStats {
    /// Compute metrics from a stats document.
    ///
    /// Missing counters count as zero, so a partially populated sample (a
    /// container that just started, say) yields zeros rather than an error.
    pub fn from_sample(sample: &Document) -> Self {
        let cpu_total = u64_at(sample, &["cpu_stats", "cpu_usage", "total_usage"]);
        let precpu_total = u64_at(sample, &["precpu_stats", "cpu_usage", "total_usage"]);
        let system = u64_at(sample, &["cpu_stats", "system_cpu_usage"]);
        let presystem = u64_at(sample, &["precpu_stats", "system_cpu_usage"]);

        let cpu_percent = cpu_percent(
            cpu_total.saturating_sub(precpu_total),
            system.saturating_sub(presystem),
            online_cpus(sample),
        );

        let usage = u64_at(sample, &["memory_stats", "usage"]);
        let cache = value_at(sample, &["memory_stats", "stats", "cache"])
            .or_else(|| value_at(sample, &["memory_stats", "stats", "inactive_file"]))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let memory_used = usage.saturating_sub(cache);
        let memory_limit = u64_at(sample, &["memory_stats", "limit"]);
        let memory_percent = if memory_limit == 0 {
            0.0
        } else {
            memory_used as f64 / memory_limit as f64 * 100.0
        };

        Self {
            cpu_percent,
            memory_used,
            memory_limit,
            memory_percent,
            network_rx: u64_at(sample, &["networks", PRIMARY_INTERFACE, "rx_bytes"]),
            network_tx: u64_at(sample, &["networks", PRIMARY_INTERFACE, "tx_bytes"]),
        }
    }
}

fn cpu_percent(cpu_delta: u64, system_delta: u64, online_cpus: u64) -> f64 {
    if cpu_delta == 0 || system_delta == 0 {
        return 0.0;
    }
    cpu_delta as f64 / system_delta as f64 * online_cpus as f64 * 100.0
}

/// `online_cpus`, else the length of the per-CPU usage array, else 1.
fn online_cpus(sample: &Document) -> u64 {
    let reported = u64_at(sample, &["cpu_stats", "online_cpus"]);
    if reported > 0 {
        return reported;
    }
    value_at(sample, &["cpu_stats", "cpu_usage", "percpu_usage"])
        .and_then(Value::as_array)
        .map(|cpus| cpus.len() as u64)
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

fn value_at<'a>(doc: &'a Document, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(doc.get(*first)?, |value, key| value.get(*key))
}

fn u64_at(doc: &Document, path: &[&str]) -> u64 {
    value_at(doc, path).and_then(Value::as_u64).unwrap_or(0)
}
