//! The discrete-time stochastic SIR model.
//!
//! Over each step of width `dt`, every susceptible person independently escapes infection from
//! each of the `I_t` infected people with probability `1 - p`, and every infected person
//! independently recovers with probability `r`. The counts of new infections and new recoveries
//! are therefore binomial draws conditional on the state at the start of the step:
//!
//! * `new_infections ~ Binomial(S_t, 1 - (1 - p)^I_t)`
//! * `new_recoveries ~ Binomial(I_t, r)`
//!
//! The two draws come from the disjoint pools `S_t` and `I_t`, so a person cannot be infected
//! and recover in the same step, and `S + I + R` is conserved exactly.
use log::{debug, info, trace};
use rand_distr::Binomial;

use crate::define_rng;
use crate::error::SirError;
use crate::parameters::SimulationConfig;
use crate::random::RandomSource;
use crate::time_series::{StateRecord, TimeSeries};

define_rng!(InfectionRng);
define_rng!(RecoveryRng);

/// Per-step probability that a susceptible person is infected when `infected` people are
/// infectious. Saturates at 1 if `(1 - p)^infected` underflows.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn force_of_infection(contact_probability: f64, infected: u64) -> f64 {
    let escape = (1.0 - contact_probability).powf(infected as f64);
    (1.0 - escape).clamp(0.0, 1.0)
}

/// Draws from `Binomial(trials, probability)` on the given stream. No entropy is consumed when
/// the outcome is certain to be zero.
fn sample_binomial<R: crate::random::RngId>(
    rng: &RandomSource,
    rng_id: R,
    trials: u64,
    probability: f64,
) -> Result<u64, SirError>
where
    R::RngType: crate::rand::Rng,
{
    if trials == 0 || probability == 0.0 {
        return Ok(0);
    }
    let distribution = Binomial::new(trials, probability)?;
    Ok(rng.sample_distr(rng_id, distribution))
}

#[derive(Clone, Debug)]
pub struct StochasticSirSimulator {
    config: SimulationConfig,
    contact_probability: f64,
    recovery_probability: f64,
}

impl StochasticSirSimulator {
    /// Validates `config` and prepares a simulator for it.
    ///
    /// # Errors
    ///
    /// Returns a `SirError::ConfigurationError` if `config` is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, SirError> {
        config.validate()?;
        Ok(StochasticSirSimulator {
            contact_probability: config.contact_probability(),
            recovery_probability: config.recovery_probability(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn initial_record(&self) -> StateRecord {
        StateRecord {
            time: 0.0,
            susceptible: self.config.initial_susceptible(),
            infected: self.config.initial_infected,
            recovered: self.config.initial_recovered,
            new_infections: self.config.initial_infected,
            new_recoveries: self.config.initial_recovered,
        }
    }

    /// Advances `state` by one step, producing the record for grid point `step`.
    fn step(
        &self,
        rng: &RandomSource,
        state: &StateRecord,
        step: usize,
    ) -> Result<StateRecord, SirError> {
        let foi = force_of_infection(self.contact_probability, state.infected);
        let new_infections = sample_binomial(rng, InfectionRng, state.susceptible, foi)?;
        let new_recoveries =
            sample_binomial(rng, RecoveryRng, state.infected, self.recovery_probability)?;

        Ok(StateRecord {
            time: self.config.time_at(step),
            susceptible: state.susceptible - new_infections,
            infected: state.infected + new_infections - new_recoveries,
            recovered: state.recovered + new_recoveries,
            new_infections,
            new_recoveries,
        })
    }

    /// Runs the model from `t = 0` to the horizon. The result is fully determined by the seed
    /// of `rng`.
    ///
    /// # Errors
    ///
    /// Returns a `SirError::SamplingError` if a binomial draw rejects its parameters, which
    /// cannot happen for a validated config.
    pub fn run(&self, rng: &RandomSource) -> Result<TimeSeries, SirError> {
        let num_steps = self.config.num_steps();
        debug!(
            "starting run: {num_steps} steps, p = {}, r = {}, seed = {}",
            self.contact_probability,
            self.recovery_probability,
            rng.base_seed()
        );

        let mut series = TimeSeries::with_capacity(self.config.dt, num_steps + 1);
        let mut state = self.initial_record();
        series.push(state);

        for step in 1..=num_steps {
            state = self.step(rng, &state, step)?;
            trace!(
                "t = {}: S = {}, I = {}, R = {} (+{} infections, +{} recoveries)",
                state.time,
                state.susceptible,
                state.infected,
                state.recovered,
                state.new_infections,
                state.new_recoveries
            );
            series.push(state);
        }

        info!(
            "run complete: {} records, cumulative incidence {}, final state S = {}, I = {}, R = {}",
            series.len(),
            series.cumulative_incidence(),
            state.susceptible,
            state.infected,
            state.recovered
        );
        Ok(series)
    }
}

/// Validates `config` and runs it once with `rng`.
///
/// # Errors
///
/// Returns a `SirError::ConfigurationError` before any sampling if `config` is invalid.
pub fn simulate(config: &SimulationConfig, rng: &RandomSource) -> Result<TimeSeries, SirError> {
    StochasticSirSimulator::new(config.clone())?.run(rng)
}
