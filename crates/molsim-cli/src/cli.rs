use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "molsim - A headless runner for the molsim particle-dynamics engine.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Advance a saved system through a fixed number of dynamics steps.
    Run(RunArgs),
    /// Relax a saved system by steepest descent.
    Minimize(MinimizeArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input state file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output state file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Number of dynamics steps to run.
    #[arg(short = 'n', long, required = true, value_name = "INT")]
    pub steps: u64,

    /// Set the temperature in Kelvin before the first step.
    #[arg(short = 't', long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Override the integration time step in femtoseconds.
    #[arg(long, value_name = "FS")]
    pub time_step: Option<f64>,

    /// Seed for velocity assignment, for reproducible runs.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Skip the automatic relaxation of overlapping atoms before the run.
    #[arg(long)]
    pub no_auto_minimize: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S heat-bath.target=300
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `minimize` subcommand.
#[derive(Args, Debug)]
pub struct MinimizeArgs {
    /// Path to the input state file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output state file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of descent steps.
    #[arg(short = 'n', long, required = true, value_name = "INT")]
    pub steps: usize,

    /// Override the distance, in Angstroms, the whole system travels per step.
    #[arg(long, value_name = "FLOAT")]
    pub step_length: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S box.boundary=periodic
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::parse_from([
            "molsim", "-vv", "run", "-i", "in.toml", "-o", "out.toml", "-c", "sim.toml", "-n",
            "500", "-t", "300", "-S", "heat-bath.interval=50",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.steps, 500);
        assert_eq!(args.temperature, Some(300.0));
        assert_eq!(args.set_values, vec!["heat-bath.interval=50".to_string()]);
        assert!(!args.no_auto_minimize);
    }

    #[test]
    fn minimize_config_is_optional() {
        let cli = Cli::parse_from([
            "molsim", "minimize", "-i", "in.toml", "-o", "out.toml", "-n", "20",
        ]);
        let Commands::Minimize(args) = cli.command else {
            panic!("Expected 'minimize' subcommand");
        };
        assert!(args.config.is_none());
        assert_eq!(args.steps, 20);
        assert!(args.step_length.is_none());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from([
            "molsim", "-q", "-v", "minimize", "-i", "a", "-o", "b", "-n", "1",
        ]);
        assert!(result.is_err());
    }
}
