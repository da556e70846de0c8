//! A discrete-time stochastic SIR simulator
//!
//! `chain-binomial` simulates an epidemic in a closed population split into Susceptible,
//! Infected and Recovered compartments. Time advances over a fixed grid of width `dt`; within
//! each step the number of new infections and new recoveries are binomial draws conditional on
//! the state at the start of the step (the "chain binomial" formulation).
//!
//! A run is built from three pieces:
//! * A [`SimulationConfig`] holding the population, the initial counts and the epidemiological
//!   parameters. It is validated once, before any sampling.
//! * A [`RandomSource`], seeded for reproducible runs or from system entropy otherwise. Each kind
//!   of draw uses its own named random stream.
//! * The [`StochasticSirSimulator`], which produces a [`TimeSeries`] with one [`StateRecord`] per
//!   grid point.
//!
//! ```rust
//! use chain_binomial::prelude::*;
//!
//! let config = SimulationConfigBuilder::default()
//!     .population(1000)
//!     .initial_infected(5)
//!     .build()
//!     .unwrap();
//! let series = simulate(&config, &RandomSource::new(42)).unwrap();
//! assert_eq!(series.len(), config.num_steps() + 1);
//! ```
//!
//! Many independent runs of the same configuration can be spread over threads with
//! [`replicates::run_replicates`], and results are written as CSV by [`report`]. The
//! `chain-binomial` binary wires all of this to the command line (see [`runner`]).
pub mod error;
pub mod hashing;
pub mod log;
pub mod parameters;
pub mod prelude;
pub mod random;
pub mod replicates;
pub mod report;
pub mod runner;
pub mod simulator;
pub mod time_series;

pub use error::SirError;
pub use parameters::{SimulationConfig, SimulationConfigBuilder};
pub use random::{RandomSource, RngId};
pub use simulator::{simulate, StochasticSirSimulator};
pub use time_series::{StateRecord, TimeSeries};

// Re-exports used by `define_rng!`
pub use paste;
pub use rand;
