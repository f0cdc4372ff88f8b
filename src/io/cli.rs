//! Command-line interface for batch registration and median aggregation

use crate::aggregation::stack::{aggregate_median, median_from_results};
use crate::io::configuration::{DEFAULT_ENGINE, DEFAULT_JOBS};
use crate::io::error::{Result, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::registration::batch::{BatchConfig, BatchReport, register_batch};
use crate::registration::invoker::RegistrationEngine;
use crate::registration::parameters::ParameterChain;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "volreg")]
#[command(
    author,
    version,
    about = "Register 3-D volumes to a seed volume and aggregate them into a median volume"
)]
/// Command-line arguments for the registration pipeline
pub struct Cli {
    /// Pipeline stage to run
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress bars and informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Pipeline stages
#[derive(Subcommand)]
pub enum Command {
    /// Register every volume of a directory to the seed
    Register(RegisterArgs),
    /// Aggregate existing registration results into a median volume
    Median(MedianArgs),
    /// Register, then aggregate the volumes that registered successfully
    Run(RunArgs),
}

/// Arguments of the registration stage
#[derive(Args)]
pub struct RegisterArgs {
    /// Directory containing the volumes to register
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory receiving one subdirectory per registered volume
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Fixed volume every other volume is aligned to
    #[arg(short, long, value_name = "FILE")]
    pub seed: PathBuf,

    /// Parameter files in the order they should be applied
    #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
    pub parameters: Vec<PathBuf>,

    /// Mask restricting registration to part of the fixed volume
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Only register volumes whose file name contains this keyword
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Number of registrations to run concurrently
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Registration engine executable
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_ENGINE)]
    pub engine: PathBuf,

    /// Kill a registration after this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl RegisterArgs {
    /// Engine configured from the executable and timeout flags
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero
    pub fn engine(&self) -> Result<RegistrationEngine> {
        let timeout = match self.timeout {
            Some(0) => {
                return Err(invalid_parameter(
                    "timeout",
                    &0,
                    &"must be at least one second",
                ));
            }
            other => other.map(Duration::from_secs),
        };
        Ok(RegistrationEngine::new(&self.engine).with_timeout(timeout))
    }

    /// Batch configuration from the directory, seed and filter flags
    ///
    /// # Errors
    ///
    /// Returns an error if no parameter file was given
    pub fn batch_config(&self) -> Result<BatchConfig> {
        let parameters = ParameterChain::new(self.parameters.clone())?;
        let mut config = BatchConfig::new(&self.input, &self.output, parameters, &self.seed);
        config.fixed_mask.clone_from(&self.mask);
        config.keyword.clone_from(&self.keyword);
        config.jobs = self.jobs;
        Ok(config)
    }
}

/// Arguments of the aggregation stage
#[derive(Args)]
pub struct MedianArgs {
    /// Registration output directory holding one subdirectory per volume
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Parameter files used for registration, in the order they were applied
    #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
    pub parameters: Vec<PathBuf>,

    /// Backing file of the stacked volumes (.npy)
    #[arg(short, long, value_name = "FILE")]
    pub memmap: PathBuf,

    /// Median volume destination; `.tif` is appended when missing
    #[arg(short, long, value_name = "FILE")]
    pub dest: PathBuf,
}

/// Arguments of a full registration and aggregation run
#[derive(Args)]
pub struct RunArgs {
    /// Registration stage arguments
    #[command(flatten)]
    pub register: RegisterArgs,

    /// Backing file of the stacked volumes (.npy)
    #[arg(short, long, value_name = "FILE")]
    pub memmap: PathBuf,

    /// Median volume destination; `.tif` is appended when missing
    #[arg(short, long, value_name = "FILE")]
    pub dest: PathBuf,
}

/// Runs the selected pipeline stage with optional progress display
pub struct Pipeline {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl Pipeline {
    /// Create a pipeline for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            progress_manager,
        }
    }

    /// Run the stage selected on the command line
    ///
    /// Failed registrations are reported but do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns an error if arguments are invalid, a directory cannot be read or
    /// created, or aggregation fails (including when nothing was registered)
    pub fn process(&mut self) -> Result<()> {
        let Self {
            cli,
            progress_manager,
        } = self;

        match &cli.command {
            Command::Register(args) => {
                Self::register(args, progress_manager.as_mut())?;
            }
            Command::Median(args) => {
                let parameters = ParameterChain::new(args.parameters.clone())?;
                aggregate_median(
                    &args.output,
                    &parameters,
                    &args.memmap,
                    &args.dest,
                    progress_manager.as_ref(),
                )?;
            }
            Command::Run(args) => {
                let report = Self::register(&args.register, progress_manager.as_mut())?;
                median_from_results(
                    &report.results(),
                    &args.memmap,
                    &args.dest,
                    progress_manager.as_ref(),
                )?;
            }
        }

        Ok(())
    }

    fn register(
        args: &RegisterArgs,
        progress_manager: Option<&mut ProgressManager>,
    ) -> Result<BatchReport> {
        let engine = args.engine()?;
        let config = args.batch_config()?;
        let report = register_batch(&engine, &config, progress_manager)?;

        for failed in &report.failed {
            log::warn!("Skipped {}: {}", failed.moving.display(), failed.error);
        }
        Ok(report)
    }
}
