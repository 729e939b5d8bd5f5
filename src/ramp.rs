//! The load-ramp measurement state machine.
//!
//! For one named test the controller visits load levels `start`,
//! `start + step`, ... clamped so the final level is always exactly 100.
//! Each level moves through the same states:
//!
//! ```text
//! Starting ──> Settling ──> Sampling (repeat times) ──> Tearing-Down ──> Committed
//!    │            │                  │                       │
//!    │     load exited first   load dead before sample,      │ not killed by
//!    │            │            or sampler failure            │ the signal
//!    └────────────┴──────────────────┴───────────────────────┴──> run aborted
//! ```
//!
//! A row reaches the result stream only after the load process was observed
//! alive through the whole sampling window and confirmed killed by the
//! termination signal, so the output never contains a half-measured level.
//! Fixed-load tests reuse the machine with a start level of 100, which makes
//! them a one-iteration ramp.

use std::io::Write;

use tokio::time;

use crate::config::Config;
use crate::error::BenchError;
use crate::load::{ExitInfo, LoadKind, LoadProfile, LoadRun};
use crate::sampler;
use crate::writer::RowWriter;

/// Drives the per-level measurement loop for one named test.
pub struct Ramp<'a> {
    config: &'a Config,
}

impl<'a> Ramp<'a> {
    pub fn new(config: &'a Config) -> Self {
        Ramp { config }
    }

    /// Run the ramp for `test` starting at `start_load`, emitting one row
    /// per committed level.
    pub async fn run<W: Write>(
        &self,
        test: &str,
        kind: LoadKind,
        start_load: u32,
        writer: &mut RowWriter<W>,
    ) -> Result<(), BenchError> {
        let config = self.config;

        for load in levels(start_load, config.load_step) {
            tracing::info!(
                "test: {}, load: {}, threads: {}, settle: {}s",
                test,
                load,
                config.threads,
                config.settle.as_secs()
            );

            let profile = LoadProfile {
                kind,
                load,
                threads: config.threads,
                method: config.method.clone(),
            };
            let mut run = LoadRun::spawn(&config.stress_ng, &profile)?;

            let sums = match self.observe(&mut run).await {
                Ok(sums) => sums,
                Err(err) => {
                    run.abandon().await;
                    return Err(err);
                }
            };

            let exit = run.terminate().await?;
            verify_killed(&exit, run.program())?;

            let mut row = vec![test.to_string(), config.threads.to_string(), load.to_string()];
            row.extend(mean_fields(&sums, config.repeat));
            writer.write_row(&row)?;
        }

        Ok(())
    }

    /// Settle, then collect `repeat` samples while the load process runs.
    /// Returns the per-metric sums.
    async fn observe(&self, run: &mut LoadRun) -> Result<Vec<f64>, BenchError> {
        let config = self.config;

        // The load process must outlive the settle window. It finishing
        // first means the environment or the configuration is broken.
        if let Ok(exit) = time::timeout(config.settle, run.wait()).await {
            exit?;
            return Err(BenchError::PrematureExit {
                program: run.program().to_string(),
            });
        }

        let mut sums = vec![0.0; config.metrics.len()];
        for _ in 0..config.repeat {
            if !run.is_alive()? {
                return Err(BenchError::PrematureExit {
                    program: run.program().to_string(),
                });
            }
            let sample = sampler::sample(
                &config.turbostat,
                &config.metrics,
                config.interval,
                config.strict_metrics,
            )
            .await?;
            for (sum, value) in sums.iter_mut().zip(sample) {
                *sum += value;
            }
        }
        Ok(sums)
    }
}

/// Load levels visited by a ramp: `start`, then steps of `step` until the
/// sequence clamps at 100. Every ramp visits at least one level and the
/// final level is always exactly 100, even when `step` does not divide the
/// range evenly or exceeds it.
fn levels(start: u32, step: u32) -> Levels {
    Levels {
        next: Some(start.min(100)),
        step,
    }
}

struct Levels {
    next: Option<u32>,
    step: u32,
}

impl Iterator for Levels {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next?;
        self.next = if current >= 100 {
            None
        } else {
            Some((current + self.step).min(100))
        };
        Some(current)
    }
}

/// Per-metric means formatted for the result stream.
fn mean_fields(sums: &[f64], repeat: u32) -> Vec<String> {
    sums.iter()
        .map(|sum| format!("{:.2}", sum / f64::from(repeat)))
        .collect()
}

/// A load process asked to stop must die from the termination signal. A
/// natural exit code here means the generator was no longer doing its job.
fn verify_killed(exit: &ExitInfo, program: &str) -> Result<(), BenchError> {
    if exit.signaled {
        Ok(())
    } else {
        Err(BenchError::NotSignaled {
            program: program.to_string(),
            code: exit.code,
        })
    }
}
