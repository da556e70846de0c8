//! Independent replicate runs of one configuration, for Monte Carlo estimates of outbreak
//! statistics.
//!
//! A single run is a sequential Markov chain and is never split. Replicates on the other hand
//! share nothing: replicate `i` gets its own [`RandomSource`] seeded with `base_seed + i`, so the
//! replicates can be spread over worker threads and the results do not depend on how many
//! threads were used.
use std::thread;

use log::{debug, info};
use serde::Serialize;

use crate::error::SirError;
use crate::parameters::SimulationConfig;
use crate::random::RandomSource;
use crate::simulator::StochasticSirSimulator;
use crate::time_series::TimeSeries;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicateOptions {
    pub count: usize,
    pub base_seed: u64,
    pub threads: usize,
}

impl Default for ReplicateOptions {
    fn default() -> Self {
        ReplicateOptions {
            count: 100,
            base_seed: 0,
            threads: thread::available_parallelism().map_or(1, usize::from),
        }
    }
}

impl ReplicateOptions {
    fn validate(&self) -> Result<(), SirError> {
        if self.count == 0 {
            return Err(SirError::configuration(
                "replicates",
                "at least one replicate is required",
            ));
        }
        if self.threads == 0 {
            return Err(SirError::configuration(
                "threads",
                "at least one worker thread is required",
            ));
        }
        Ok(())
    }
}

/// One row per replicate.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ReplicateSummary {
    pub replicate: usize,
    pub seed: u64,
    pub cumulative_incidence: u64,
    pub peak_infected: u64,
    pub peak_time: f64,
    pub extinction_time: Option<f64>,
    pub final_susceptible: u64,
    pub final_infected: u64,
    pub final_recovered: u64,
}

impl ReplicateSummary {
    fn from_series(replicate: usize, seed: u64, series: &TimeSeries) -> Self {
        let (peak_infected, peak_time) = series
            .peak()
            .map_or((0, 0.0), |peak| (peak.infected, peak.time));
        let (final_susceptible, final_infected, final_recovered) = series
            .last()
            .map_or((0, 0, 0), |last| {
                (last.susceptible, last.infected, last.recovered)
            });
        ReplicateSummary {
            replicate,
            seed,
            cumulative_incidence: series.cumulative_incidence(),
            peak_infected,
            peak_time,
            extinction_time: series.extinction_time(),
            final_susceptible,
            final_infected,
            final_recovered,
        }
    }
}

/// Aggregates over a set of replicates.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OutbreakStatistics {
    pub replicates: usize,
    pub mean_cumulative_incidence: f64,
    pub min_cumulative_incidence: u64,
    pub max_cumulative_incidence: u64,
    pub mean_peak_infected: f64,
    /// Fraction of replicates whose infected count reached zero at some grid point up to and
    /// including the horizon. Runs that start with no infections count as extinct.
    pub extinction_fraction: f64,
}

impl OutbreakStatistics {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_summaries(summaries: &[ReplicateSummary]) -> Option<Self> {
        if summaries.is_empty() {
            return None;
        }
        let n = summaries.len() as f64;
        let total_incidence: u64 = summaries.iter().map(|s| s.cumulative_incidence).sum();
        let total_peak: u64 = summaries.iter().map(|s| s.peak_infected).sum();
        let extinct = summaries
            .iter()
            .filter(|s| s.extinction_time.is_some())
            .count();
        Some(OutbreakStatistics {
            replicates: summaries.len(),
            mean_cumulative_incidence: total_incidence as f64 / n,
            min_cumulative_incidence: summaries
                .iter()
                .map(|s| s.cumulative_incidence)
                .min()?,
            max_cumulative_incidence: summaries
                .iter()
                .map(|s| s.cumulative_incidence)
                .max()?,
            mean_peak_infected: total_peak as f64 / n,
            extinction_fraction: extinct as f64 / n,
        })
    }
}

fn run_replicate(
    simulator: &StochasticSirSimulator,
    replicate: usize,
    base_seed: u64,
) -> Result<ReplicateSummary, SirError> {
    let seed = base_seed.wrapping_add(replicate as u64);
    let series = simulator.run(&RandomSource::new(seed))?;
    Ok(ReplicateSummary::from_series(replicate, seed, &series))
}

/// Runs `options.count` replicates of `config` over `options.threads` worker threads. The
/// summaries are returned in replicate order.
///
/// # Errors
///
/// Returns a `SirError::ConfigurationError` if `config` or `options` is invalid.
pub fn run_replicates(
    config: &SimulationConfig,
    options: &ReplicateOptions,
) -> Result<Vec<ReplicateSummary>, SirError> {
    options.validate()?;
    let simulator = StochasticSirSimulator::new(config.clone())?;
    let ReplicateOptions {
        count, base_seed, ..
    } = *options;
    let threads = options.threads.min(count);
    info!("running {count} replicates on {threads} threads (base seed {base_seed})");

    let batches = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let simulator = &simulator;
                scope.spawn(move || {
                    debug!("worker {worker} starting");
                    (worker..count)
                        .step_by(threads)
                        .map(|replicate| run_replicate(simulator, replicate, base_seed))
                        .collect::<Result<Vec<_>, SirError>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect::<Result<Vec<_>, SirError>>()
    })?;

    let mut summaries: Vec<ReplicateSummary> = batches.into_iter().flatten().collect();
    summaries.sort_unstable_by_key(|summary| summary.replicate);
    Ok(summaries)
}
