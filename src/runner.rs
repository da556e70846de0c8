use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, ArgMatches, Args, Command, FromArgMatches as _};
use log::{info, LevelFilter};

use crate::error::SirError;
use crate::log::{set_log_level, set_module_filters};
use crate::parameters::SimulationConfig;
use crate::random::RandomSource;
use crate::replicates::{run_replicates, OutbreakStatistics, ReplicateOptions, ReplicateSummary};
use crate::report::{write_report, write_rows, write_time_series, ReportOptions};
use crate::simulator::StochasticSirSimulator;
use crate::time_series::TimeSeries;

/// Default cli arguments for the runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed. A seed is drawn from system entropy if not given
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a JSON simulation config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for report output. Reports go to stdout if not given
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional prefix for report files
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Enable logging at a level (e.g. `info`) or with a comma separated list of
    /// `module=level` filters
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Model arguments. Each one overrides the value from the config file (or the default).
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Population size
    #[arg(long)]
    pub population: Option<u64>,

    /// Number of people infected at t = 0
    #[arg(long)]
    pub initial_infected: Option<u64>,

    /// Number of people recovered at t = 0
    #[arg(long)]
    pub initial_recovered: Option<u64>,

    /// Basic reproduction number
    #[arg(long)]
    pub r0: Option<f64>,

    /// Mean duration of infectiousness
    #[arg(long)]
    pub infectious_period: Option<f64>,

    /// Time step
    #[arg(long)]
    pub dt: Option<f64>,

    /// Time horizon
    #[arg(long)]
    pub max_time: Option<f64>,

    /// Run this many independent replicates and report one summary row per replicate
    #[arg(long)]
    pub replicates: Option<usize>,

    /// Number of worker threads for replicates. Defaults to the available parallelism
    #[arg(long, requires = "replicates")]
    pub threads: Option<usize>,
}

impl ModelArgs {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(population) = self.population {
            config.population = population;
        }
        if let Some(initial_infected) = self.initial_infected {
            config.initial_infected = initial_infected;
        }
        if let Some(initial_recovered) = self.initial_recovered {
            config.initial_recovered = initial_recovered;
        }
        if let Some(r0) = self.r0 {
            config.r0 = r0;
        }
        if let Some(infectious_period) = self.infectious_period {
            config.infectious_period = infectious_period;
        }
        if let Some(dt) = self.dt {
            config.dt = dt;
        }
        if let Some(max_time) = self.max_time {
            config.max_time = max_time;
        }
    }
}

/// What a run produced, after it has been written out.
#[derive(Debug)]
pub enum RunOutput {
    TimeSeries(TimeSeries),
    Replicates(Vec<ReplicateSummary>),
}

fn create_cli() -> Command {
    let cli = Command::new("chain-binomial")
        .about("Simulates a discrete-time stochastic SIR epidemic");
    let cli = BaseArgs::augment_args(cli);
    ModelArgs::augment_args(cli)
}

fn parse_level(level: &str) -> Result<LevelFilter, SirError> {
    LevelFilter::from_str(level.trim()).map_err(|_| {
        SirError::configuration("log_level", format!("unknown log level `{level}`"))
    })
}

/// Parses `--log-level`: either a bare level that applies globally, or `module=level` entries,
/// separated by commas. Returns the global level (if one was given) and the module filters.
fn parse_log_levels(
    log_level: &str,
) -> Result<(Option<LevelFilter>, Vec<(String, LevelFilter)>), SirError> {
    let mut global = None;
    let mut modules = Vec::new();
    for entry in log_level.split(',').filter(|entry| !entry.trim().is_empty()) {
        match entry.split_once('=') {
            Some((module, level)) => modules.push((module.trim().to_string(), parse_level(level)?)),
            None => global = Some(parse_level(entry)?),
        }
    }
    Ok((global, modules))
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_logging(args: &BaseArgs) -> Result<(), SirError> {
    let (global, modules) = match &args.log_level {
        Some(log_level) => parse_log_levels(log_level)?,
        None => (None, Vec::new()),
    };
    let global = global
        .unwrap_or(LevelFilter::Off)
        .max(verbosity_level(args.verbose));
    if global == LevelFilter::Off && modules.is_empty() {
        return Ok(());
    }
    set_log_level(global);
    if !modules.is_empty() {
        let filters: Vec<(&String, LevelFilter)> =
            modules.iter().map(|(module, level)| (module, *level)).collect();
        set_module_filters(&filters);
        for (module, level) in &modules {
            info!("Logging enabled for {module} at level {level}");
        }
    }
    Ok(())
}

/// Builds the simulation config: defaults, then the config file, then `model_args`.
fn build_config(args: &BaseArgs, model_args: &ModelArgs) -> Result<SimulationConfig, SirError> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading simulation config from: {}", path.display());
            SimulationConfig::from_json_file(path)?
        }
        None => SimulationConfig::default(),
    };
    model_args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn report_options(args: &BaseArgs) -> Option<ReportOptions> {
    args.output_dir.as_ref().map(|directory| {
        let mut options = ReportOptions::new();
        options
            .directory(directory.clone())
            .file_prefix(args.prefix.clone())
            .overwrite(args.force_overwrite);
        options
    })
}

/// Runs a simulation with default cli arguments, writing CSV to stdout unless an output
/// directory is given.
///
/// # Errors
///
/// Returns an error if argument parsing, configuration or writing the output fails
pub fn run_with_args() -> Result<RunOutput, Box<dyn std::error::Error>> {
    let matches = create_cli().get_matches();
    run_with_matches(&matches)
}

/// Like [`run_with_args`], but parses the given arguments instead of the process's. The first
/// item is the program name.
///
/// # Errors
///
/// Returns an error if argument parsing, configuration or writing the output fails
pub fn run_with_args_from<I, T>(args: I) -> Result<RunOutput, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = create_cli().try_get_matches_from(args)?;
    run_with_matches(&matches)
}

fn run_with_matches(matches: &ArgMatches) -> Result<RunOutput, Box<dyn std::error::Error>> {
    let base_args = BaseArgs::from_arg_matches(matches)?;
    let model_args = ModelArgs::from_arg_matches(matches)?;
    let stdout = io::stdout();
    Ok(run_with_args_internal(
        &base_args,
        &model_args,
        stdout.lock(),
    )?)
}

fn run_with_args_internal<W: Write>(
    args: &BaseArgs,
    model_args: &ModelArgs,
    stdout: W,
) -> Result<RunOutput, SirError> {
    configure_logging(args)?;
    let config = build_config(args, model_args)?;
    let seed = args
        .random_seed
        .unwrap_or_else(|| RandomSource::from_entropy().base_seed());
    info!("Random seed: {seed}");
    let report_options = report_options(args);

    match model_args.replicates {
        Some(count) => {
            let mut options = ReplicateOptions {
                count,
                base_seed: seed,
                ..ReplicateOptions::default()
            };
            if let Some(threads) = model_args.threads {
                options.threads = threads;
            }
            let summaries = run_replicates(&config, &options)?;
            let statistics = OutbreakStatistics::from_summaries(&summaries);
            if let Some(statistics) = &statistics {
                info!("Outbreak statistics: {statistics:?}");
            }
            match &report_options {
                Some(report_options) => {
                    write_report(report_options, "replicates", &summaries)?;
                    write_report(report_options, "statistics", statistics)?;
                }
                None => write_rows(stdout, &summaries)?,
            }
            Ok(RunOutput::Replicates(summaries))
        }
        None => {
            let series = StochasticSirSimulator::new(config)?.run(&RandomSource::new(seed))?;
            match &report_options {
                Some(report_options) => {
                    write_report(report_options, "time_series", series.iter())?;
                }
                None => write_time_series(stdout, &series)?,
            }
            Ok(RunOutput::TimeSeries(series))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn seeded(seed: u64) -> BaseArgs {
        BaseArgs {
            random_seed: Some(seed),
            ..BaseArgs::default()
        }
    }

    #[test]
    fn test_run_with_random_seed() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        run_with_args_internal(&seeded(42), &ModelArgs::default(), &mut first).unwrap();
        run_with_args_internal(&seeded(42), &ModelArgs::default(), &mut second).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_model_args_override_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{"population": 50, "max_time": 5.0}"#).unwrap();

        let args = BaseArgs {
            config: Some(config_path),
            ..seeded(1)
        };
        let model_args = ModelArgs {
            max_time: Some(2.0),
            ..ModelArgs::default()
        };
        let output = run_with_args_internal(&args, &model_args, io::sink()).unwrap();
        let RunOutput::TimeSeries(series) = output else {
            panic!("expected a time series");
        };
        assert_eq!(series.len(), 21);
        assert_eq!(series.first().unwrap().susceptible, 49);
    }

    #[test]
    fn test_invalid_config_names_field() {
        let model_args = ModelArgs {
            dt: Some(-1.0),
            ..ModelArgs::default()
        };
        let error = run_with_args_internal(&seeded(1), &model_args, io::sink()).unwrap_err();
        assert_eq!(error.field(), Some("dt"));
    }

    #[test]
    fn test_run_with_output_dir() {
        let temp_dir = tempdir().unwrap();
        let args = BaseArgs {
            output_dir: Some(temp_dir.path().to_path_buf()),
            prefix: "run_".to_string(),
            ..seeded(7)
        };
        let mut stdout = Vec::new();
        run_with_args_internal(&args, &ModelArgs::default(), &mut stdout).unwrap();
        assert!(stdout.is_empty());
        assert!(temp_dir.path().join("run_time_series.csv").exists());

        // A second run refuses to clobber the first...
        let error =
            run_with_args_internal(&args, &ModelArgs::default(), io::sink()).unwrap_err();
        assert!(matches!(error, SirError::ReportError(_)));

        // ...unless asked to.
        let args = BaseArgs {
            force_overwrite: true,
            ..args
        };
        run_with_args_internal(&args, &ModelArgs::default(), io::sink()).unwrap();
    }

    #[test]
    fn test_run_replicates() {
        let temp_dir = tempdir().unwrap();
        let args = BaseArgs {
            output_dir: Some(temp_dir.path().to_path_buf()),
            ..seeded(3)
        };
        let model_args = ModelArgs {
            replicates: Some(6),
            threads: Some(2),
            ..ModelArgs::default()
        };
        let output = run_with_args_internal(&args, &model_args, io::sink()).unwrap();
        let RunOutput::Replicates(summaries) = output else {
            panic!("expected replicate summaries");
        };
        assert_eq!(summaries.len(), 6);
        assert_eq!(summaries[0].seed, 3);

        let replicates = fs::read_to_string(temp_dir.path().join("replicates.csv")).unwrap();
        assert_eq!(replicates.lines().count(), 7);
        let statistics = fs::read_to_string(temp_dir.path().join("statistics.csv")).unwrap();
        assert!(statistics.starts_with("replicates,mean_cumulative_incidence"));
    }

    #[test]
    fn test_parse_log_levels() {
        let (global, modules) = parse_log_levels("info").unwrap();
        assert_eq!(global, Some(LevelFilter::Info));
        assert!(modules.is_empty());

        let (global, modules) =
            parse_log_levels("chain_binomial=Debug, chain_binomial::simulator=trace").unwrap();
        assert_eq!(global, None);
        assert_eq!(
            modules,
            vec![
                ("chain_binomial".to_string(), LevelFilter::Debug),
                ("chain_binomial::simulator".to_string(), LevelFilter::Trace),
            ]
        );

        let error = parse_log_levels("loud").unwrap_err();
        assert_eq!(error.field(), Some("log_level"));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_level(0), LevelFilter::Off);
        assert_eq!(verbosity_level(1), LevelFilter::Info);
        assert_eq!(verbosity_level(2), LevelFilter::Debug);
        assert_eq!(verbosity_level(5), LevelFilter::Trace);
    }

    #[test]
    fn test_cli_parses_flags() {
        let matches = create_cli()
            .try_get_matches_from([
                "chain-binomial",
                "-r",
                "9",
                "--population",
                "500",
                "--r0",
                "1.5",
                "-vv",
            ])
            .unwrap();
        let base_args = BaseArgs::from_arg_matches(&matches).unwrap();
        let model_args = ModelArgs::from_arg_matches(&matches).unwrap();
        assert_eq!(base_args.random_seed, Some(9));
        assert_eq!(base_args.verbose, 2);
        assert_eq!(model_args.population, Some(500));
        assert_eq!(model_args.r0, Some(1.5));
        assert_eq!(model_args.replicates, None);
    }

    #[test]
    fn test_cli_threads_requires_replicates() {
        let result = create_cli().try_get_matches_from(["chain-binomial", "--threads", "4"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );

        let matches = create_cli()
            .try_get_matches_from(["chain-binomial", "--replicates", "3", "--threads", "4"])
            .unwrap();
        let model_args = ModelArgs::from_arg_matches(&matches).unwrap();
        assert_eq!(model_args.replicates, Some(3));
        assert_eq!(model_args.threads, Some(4));
    }

    #[test]
    fn test_cli_rejects_bad_value() {
        let result = run_with_args_from(["chain-binomial", "--population", "many"]);
        assert!(result.is_err());
    }
}
