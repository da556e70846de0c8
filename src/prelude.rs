pub use crate::define_rng;
pub use crate::error::SirError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{SimulationConfig, SimulationConfigBuilder};
pub use crate::random::RandomSource;
pub use crate::replicates::{run_replicates, OutbreakStatistics, ReplicateOptions};
pub use crate::report::{write_time_series, ReportOptions};
pub use crate::simulator::{simulate, StochasticSirSimulator};
pub use crate::time_series::{StateRecord, TimeSeries};
