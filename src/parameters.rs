//! Inputs to a simulation run.
//!
//! A [`SimulationConfig`] is an immutable value: build one from the defaults with
//! [`SimulationConfigBuilder`], load one from a JSON file, then [`validate`](SimulationConfig::validate)
//! it before handing it to the simulator. Unspecified JSON fields take the defaults below.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use derive_builder::Builder;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::SirError;

/// Upper bound on the number of grid steps a single run may take. The whole series is held in
/// memory, one `StateRecord` per step.
pub const MAX_STEPS: usize = 10_000_000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Population size `N`.
    #[builder(default = "100")]
    pub population: u64,

    /// Number of people infected at `t = 0`.
    #[builder(default = "1")]
    pub initial_infected: u64,

    /// Number of people already recovered at `t = 0`.
    #[builder(default = "0")]
    pub initial_recovered: u64,

    /// Basic reproduction number.
    #[builder(default = "3.0")]
    pub r0: f64,

    /// Mean duration of infectiousness.
    #[builder(default = "2.0")]
    pub infectious_period: f64,

    /// Width of one step of the time grid.
    #[builder(default = "0.1")]
    pub dt: f64,

    /// Time horizon. The grid runs from `0` to `max_time` inclusive.
    #[builder(default = "100.0")]
    pub max_time: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfigBuilder::default()
            .build()
            .expect("all fields have defaults")
    }
}

impl SimulationConfig {
    /// Reads a configuration from a JSON file. The result is not validated.
    ///
    /// # Errors
    ///
    /// Returns a `SirError` if the file cannot be opened or does not parse.
    pub fn from_json_file(path: &Path) -> Result<Self, SirError> {
        debug!("loading simulation config from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Initial number of susceptible people, `N - I0 - R0`. Saturates at zero for an
    /// unvalidated config whose initial counts exceed the population.
    #[must_use]
    pub fn initial_susceptible(&self) -> u64 {
        self.population
            .saturating_sub(self.initial_infected)
            .saturating_sub(self.initial_recovered)
    }

    /// Probability that a given susceptible is infected by a given infected person during one
    /// step: `p = r0 * dt / (infectious_period * N)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contact_probability(&self) -> f64 {
        self.r0 * self.dt / (self.infectious_period * self.population as f64)
    }

    /// Probability that a given infected person recovers during one step:
    /// `r = dt / infectious_period`.
    #[must_use]
    pub fn recovery_probability(&self) -> f64 {
        self.dt / self.infectious_period
    }

    /// Number of steps on the grid, `max_time / dt` rounded to the nearest integer. A run
    /// produces `num_steps() + 1` records.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn num_steps(&self) -> usize {
        (self.max_time / self.dt).round() as usize
    }

    /// Time of the given grid step, computed from the step counter rather than by accumulation.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_at(&self, step: usize) -> f64 {
        step as f64 * self.dt
    }

    /// Checks every field and the derived probabilities.
    ///
    /// # Errors
    ///
    /// Returns a `SirError::ConfigurationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), SirError> {
        if self.population == 0 {
            return Err(SirError::configuration(
                "population",
                "must be a positive integer",
            ));
        }
        match self.initial_infected.checked_add(self.initial_recovered) {
            Some(seeded) if seeded <= self.population => {}
            _ => {
                return Err(SirError::configuration(
                    "initial_infected",
                    format!(
                        "initial_infected ({}) + initial_recovered ({}) exceeds population ({})",
                        self.initial_infected, self.initial_recovered, self.population
                    ),
                ))
            }
        }
        if !self.r0.is_finite() || self.r0 < 0.0 {
            return Err(SirError::configuration(
                "r0",
                format!("must be a non-negative number, got {}", self.r0),
            ));
        }
        if !self.infectious_period.is_finite() || self.infectious_period <= 0.0 {
            return Err(SirError::configuration(
                "infectious_period",
                format!("must be a positive number, got {}", self.infectious_period),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SirError::configuration(
                "dt",
                format!("must be a positive number, got {}", self.dt),
            ));
        }
        if !self.max_time.is_finite() || self.max_time < 0.0 {
            return Err(SirError::configuration(
                "max_time",
                format!("must be a non-negative number, got {}", self.max_time),
            ));
        }
        #[allow(clippy::cast_precision_loss)]
        let max_steps = MAX_STEPS as f64;
        if (self.max_time / self.dt).round() > max_steps {
            return Err(SirError::configuration(
                "max_time",
                format!(
                    "max_time / dt ({}) exceeds the maximum of {MAX_STEPS} steps",
                    self.max_time / self.dt
                ),
            ));
        }

        let r = self.recovery_probability();
        if r > 1.0 {
            return Err(SirError::configuration(
                "dt",
                format!(
                    "dt ({}) is larger than infectious_period ({}), recovery probability {r} exceeds 1",
                    self.dt, self.infectious_period
                ),
            ));
        }
        let p = self.contact_probability();
        if p > 1.0 {
            return Err(SirError::configuration(
                "dt",
                format!(
                    "dt ({}) is too large for r0 ({}), infectious_period ({}) and population ({}), contact probability {p} exceeds 1",
                    self.dt, self.r0, self.infectious_period, self.population
                ),
            ));
        }

        debug!("validated config: p = {p}, r = {r}, {} steps", self.num_steps());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.population, 100);
        assert_eq!(config.initial_susceptible(), 99);
        assert_eq!(config.num_steps(), 1000);
        config.validate().unwrap();
    }

    #[test]
    fn derived_probabilities() {
        let config = SimulationConfig::default();
        assert_relative_eq!(config.contact_probability(), 0.0015);
        assert_relative_eq!(config.recovery_probability(), 0.05);
    }

    #[test]
    fn grid_time_does_not_drift() {
        let config = SimulationConfig::default();
        assert_eq!(config.time_at(1000), 100.0);
        assert_eq!(config.time_at(0), 0.0);
    }

    #[test]
    fn horizon_rounds_to_nearest_step() {
        let config = SimulationConfigBuilder::default()
            .dt(0.3)
            .max_time(1.0)
            .build()
            .unwrap();
        assert_eq!(config.num_steps(), 3);
    }

    #[test]
    fn rejects_horizon_with_too_many_steps() {
        let config = SimulationConfigBuilder::default()
            .dt(1.0)
            .max_time(4.0e9)
            .build()
            .unwrap();
        assert_eq!(config.validate().unwrap_err().field(), Some("max_time"));

        #[allow(clippy::cast_precision_loss)]
        let config = SimulationConfigBuilder::default()
            .dt(1.0)
            .max_time(MAX_STEPS as f64 + 1.0)
            .build()
            .unwrap();
        assert_eq!(config.validate().unwrap_err().field(), Some("max_time"));
    }

    #[test]
    fn accepts_horizon_at_step_limit() {
        #[allow(clippy::cast_precision_loss)]
        let config = SimulationConfigBuilder::default()
            .dt(1.0)
            .max_time(MAX_STEPS as f64)
            .build()
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.num_steps(), MAX_STEPS);
    }

    #[test]
    fn rejects_empty_population() {
        let config = SimulationConfigBuilder::default()
            .population(0)
            .initial_infected(0)
            .build()
            .unwrap();
        assert_eq!(config.validate().unwrap_err().field(), Some("population"));
    }

    #[test]
    fn rejects_counts_exceeding_population() {
        let config = SimulationConfigBuilder::default()
            .population(10)
            .initial_infected(6)
            .initial_recovered(5)
            .build()
            .unwrap();
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("initial_infected")
        );
    }

    #[test]
    fn rejects_overflowing_counts() {
        let config = SimulationConfigBuilder::default()
            .initial_infected(u64::MAX)
            .initial_recovered(1)
            .build()
            .unwrap();
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("initial_infected")
        );
    }

    #[test]
    fn rejects_invalid_reals() {
        let cases = [
            (SimulationConfigBuilder::default().r0(-0.5).build(), "r0"),
            (SimulationConfigBuilder::default().r0(f64::NAN).build(), "r0"),
            (
                SimulationConfigBuilder::default()
                    .infectious_period(0.0)
                    .build(),
                "infectious_period",
            ),
            (SimulationConfigBuilder::default().dt(0.0).build(), "dt"),
            (SimulationConfigBuilder::default().dt(-1.0).build(), "dt"),
            (
                SimulationConfigBuilder::default().max_time(-1.0).build(),
                "max_time",
            ),
            (
                SimulationConfigBuilder::default()
                    .max_time(f64::INFINITY)
                    .build(),
                "max_time",
            ),
        ];
        for (config, field) in cases {
            assert_eq!(config.unwrap().validate().unwrap_err().field(), Some(field));
        }
    }

    #[test]
    fn rejects_probabilities_above_one() {
        let config = SimulationConfigBuilder::default()
            .population(1)
            .initial_infected(1)
            .r0(10.0)
            .infectious_period(0.01)
            .dt(1.0)
            .build()
            .unwrap();
        assert_eq!(config.validate().unwrap_err().field(), Some("dt"));

        // dt <= infectious_period, but the population is too small for the contact rate
        let config = SimulationConfigBuilder::default()
            .population(2)
            .initial_infected(1)
            .r0(10.0)
            .infectious_period(1.0)
            .dt(0.5)
            .build()
            .unwrap();
        assert!(config.recovery_probability() <= 1.0);
        assert!(config.contact_probability() > 1.0);
        assert_eq!(config.validate().unwrap_err().field(), Some("dt"));
    }

    #[test]
    fn zero_r0_is_allowed() {
        let config = SimulationConfigBuilder::default().r0(0.0).build().unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn load_from_json_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"population": 500, "r0": 1.5}}"#).unwrap();

        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.population, 500);
        assert_relative_eq!(config.r0, 1.5);
        assert_eq!(config.initial_infected, 1);
        assert_relative_eq!(config.dt, 0.1);
    }

    #[test]
    fn load_from_json_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"populaton": 500}}"#).unwrap();

        let result = SimulationConfig::from_json_file(file.path());
        assert!(matches!(result, Err(SirError::JsonError(_))));
    }

    #[test]
    fn load_missing_file() {
        let result = SimulationConfig::from_json_file(Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(SirError::IoError(_))));
    }
}
