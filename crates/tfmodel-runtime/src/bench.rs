use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use tfmodel_core::{BackendModel, BatchSize, FeedBuilder, SignatureSpec, UnknownDTypePolicy};
use tracing::{debug, error, info};

use crate::{BenchOutcome, BenchReport, BenchResult, BenchStats};

pub const DEFAULT_BATCH_SIZES: [usize; 5] = [1, 10, 1000, 10000, 100000];

#[derive(Clone, Debug)]
pub struct BenchPolicy {
    pub batch_sizes: Vec<BatchSize>,
    /// Timed runs per batch size.
    pub iterations: u32,
    /// Untimed runs before timing starts.
    pub warmup: u32,
    pub unknown_dtype: UnknownDTypePolicy,
}

impl Default for BenchPolicy {
    fn default() -> Self {
        Self {
            batch_sizes: DEFAULT_BATCH_SIZES
                .iter()
                .filter_map(|&n| BatchSize::new(n))
                .collect(),
            iterations: 1,
            warmup: 0,
            unknown_dtype: UnknownDTypePolicy::default(),
        }
    }
}

pub struct Benchmark {
    policy: BenchPolicy,
}

impl Benchmark {
    pub fn new(policy: BenchPolicy) -> Self {
        Self { policy }
    }

    /// Runs `signature` once per configured batch size. A failing batch size is
    /// recorded in the report and the next one is tried.
    pub fn run(&self, model: &mut dyn BackendModel, signature: &str) -> Result<BenchReport> {
        ensure!(self.policy.iterations > 0, "iterations must be at least 1");
        ensure!(!self.policy.batch_sizes.is_empty(), "no batch sizes to benchmark");

        let sig = model
            .spec()
            .signature(signature)
            .cloned()
            .with_context(|| format!("signature not found: {signature}"))?;

        let mut results = Vec::with_capacity(self.policy.batch_sizes.len());
        for &batch_size in &self.policy.batch_sizes {
            let outcome = match self.run_batch(model, &sig, batch_size) {
                Ok(stats) => {
                    info!(
                        batch_size = batch_size.get(),
                        latency_ms = stats.mean_latency_ms,
                        throughput = stats.throughput,
                        samples_per_sec = stats.samples_per_sec,
                        "benchmark finished"
                    );
                    BenchOutcome::Ok(stats)
                }
                Err(err) => {
                    let msg = format!("{err:#}");
                    error!(batch_size = batch_size.get(), error = %msg, "benchmark failed");
                    BenchOutcome::Failed { error: msg }
                }
            };
            results.push(BenchResult {
                batch_size: batch_size.get(),
                outcome,
            });
        }

        Ok(BenchReport {
            signature: sig.name,
            results,
        })
    }

    fn run_batch(
        &self,
        model: &mut dyn BackendModel,
        sig: &SignatureSpec,
        batch_size: BatchSize,
    ) -> Result<BenchStats> {
        let feed = FeedBuilder::new(batch_size)
            .unknown_dtype(self.policy.unknown_dtype)
            .build(&sig.inputs)?;
        debug!(batch_size = batch_size.get(), inputs = feed.len(), "built synthetic feed");

        // Session setup and feed conversion stay outside the timed runs.
        model.prepare(&sig.name, &feed)?;

        for _ in 0..self.policy.warmup {
            model.infer(&sig.name, &feed)?;
        }

        let mut latencies: Vec<Duration> = Vec::with_capacity(self.policy.iterations as usize);
        for _ in 0..self.policy.iterations {
            let t0 = Instant::now();
            model.infer(&sig.name, &feed)?;
            latencies.push(t0.elapsed());
        }

        Ok(BenchStats::from_latencies(batch_size.get(), &latencies))
    }
}
