use std::time::Duration;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchStats {
    pub iterations: u32,
    pub mean_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Runs per second, the inverse of the mean latency.
    pub throughput: f64,
    pub samples_per_sec: f64,
}

impl BenchStats {
    pub fn from_latencies(batch_size: usize, latencies: &[Duration]) -> Self {
        let secs = latencies.iter().map(Duration::as_secs_f64).collect::<Vec<_>>();
        let mean = if secs.is_empty() {
            0.0
        } else {
            secs.iter().sum::<f64>() / secs.len() as f64
        };
        let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = secs.iter().copied().fold(0.0, f64::max);
        let throughput = if mean > 0.0 { 1.0 / mean } else { f64::INFINITY };

        Self {
            iterations: latencies.len() as u32,
            mean_latency_ms: mean * 1e3,
            min_latency_ms: if min.is_finite() { min * 1e3 } else { 0.0 },
            max_latency_ms: max * 1e3,
            throughput,
            samples_per_sec: throughput * batch_size as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BenchOutcome {
    Ok(BenchStats),
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchResult {
    pub batch_size: usize,
    #[serde(flatten)]
    pub outcome: BenchOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchReport {
    pub signature: String,
    pub results: Vec<BenchResult>,
}

impl BenchReport {
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, BenchOutcome::Failed { .. }))
            .count()
    }
}
