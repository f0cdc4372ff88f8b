//! Registration of every volume in a directory to a common seed

use crate::io::configuration::DEFAULT_JOBS;
use crate::io::error::{Result, VolregError, invalid_parameter};
use crate::io::paths::{ensure_dir, list_dir_filtered, same_file, volume_stem};
use crate::io::progress::ProgressManager;
use crate::registration::invoker::{RegistrationEngine, RegistrationJob, RegistrationResult};
use crate::registration::parameters::ParameterChain;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Inputs of one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding the moving volumes
    pub input_dir: PathBuf,
    /// Directory receiving one subdirectory per moving volume
    pub output_dir: PathBuf,
    /// Parameter files in application order
    pub parameters: ParameterChain,
    /// Fixed volume every other volume is aligned to
    pub seed: PathBuf,
    /// Optional fixed-image mask passed to every registration
    pub fixed_mask: Option<PathBuf>,
    /// Only volumes whose file name contains this keyword are registered
    pub keyword: Option<String>,
    /// Registrations allowed to run at the same time
    pub jobs: usize,
}

impl BatchConfig {
    /// Configuration with no mask, no keyword filter and the default worker count
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        parameters: ParameterChain,
        seed: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            parameters,
            seed: seed.into(),
            fixed_mask: None,
            keyword: None,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// A moving volume and the files its registration produced
#[derive(Debug, Clone)]
pub struct RegisteredVolume {
    /// Input volume
    pub moving: PathBuf,
    /// Engine output
    pub result: RegistrationResult,
}

/// A moving volume whose registration was skipped
#[derive(Debug)]
pub struct FailedVolume {
    /// Input volume
    pub moving: PathBuf,
    /// Why no result is available
    pub error: VolregError,
}

/// Outcome of a batch, both lists in listing order
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Volumes with a located result
    pub registered: Vec<RegisteredVolume>,
    /// Volumes that were skipped
    pub failed: Vec<FailedVolume>,
}

impl BatchReport {
    /// Engine outputs of the registered volumes, in listing order
    pub fn results(&self) -> Vec<RegistrationResult> {
        self.registered
            .iter()
            .map(|volume| volume.result.clone())
            .collect()
    }
}

/// Volumes of the input directory that will be registered, seed excluded
///
/// # Errors
///
/// Returns an error if the input directory cannot be listed
pub fn moving_volumes(config: &BatchConfig) -> Result<Vec<PathBuf>> {
    let mut volumes = list_dir_filtered(&config.input_dir, config.keyword.as_deref())?;
    volumes.retain(|path| path.is_file() && !same_file(path, &config.seed));
    Ok(volumes)
}

/// One job per moving volume, writing to `output_dir/<volume stem>`
///
/// Volumes whose names differ only in extension (`a.tif`, `a.tiff`) would share an
/// output directory, so such a listing is rejected before any job is planned.
///
/// # Errors
///
/// Returns an error if the input directory cannot be listed or two moving volumes
/// map to the same output directory
pub fn plan_jobs(config: &BatchConfig) -> Result<Vec<RegistrationJob>> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::new();

    for moving in moving_volumes(config)? {
        let output_dir = config.output_dir.join(volume_stem(&moving));
        if let Some(first) = claimed.insert(output_dir.clone(), moving.clone()) {
            return Err(VolregError::OutputCollision {
                directory: output_dir,
                first,
                second: moving,
            });
        }
        jobs.push(RegistrationJob {
            fixed: config.seed.clone(),
            output_dir,
            moving,
            parameters: config.parameters.clone(),
            fixed_mask: config.fixed_mask.clone(),
        });
    }

    Ok(jobs)
}

/// Register every moving volume of the input directory to the seed
///
/// Up to `jobs` registrations run concurrently. A registration that fails for any
/// reason is logged and recorded in [`BatchReport::failed`]; the batch carries on.
///
/// # Errors
///
/// Returns an error if:
/// - `jobs` is zero or the worker pool cannot be built
/// - The output directory cannot be created
/// - The input directory cannot be listed
/// - Two moving volumes map to the same output directory
pub fn register_batch(
    engine: &RegistrationEngine,
    config: &BatchConfig,
    progress: Option<&mut ProgressManager>,
) -> Result<BatchReport> {
    if config.jobs == 0 {
        return Err(invalid_parameter(
            "jobs",
            &config.jobs,
            &"at least one worker is required",
        ));
    }

    ensure_dir(&config.output_dir)?;
    let jobs = plan_jobs(config)?;

    log::info!(
        "{} volume(s) found, registering each to seed {}",
        jobs.len(),
        config.seed.display()
    );
    log::info!("Input folder {}", config.input_dir.display());
    log::info!("Output folder {}", config.output_dir.display());
    log::info!("Parameter files {:?}", config.parameters.files());

    let progress: Option<&ProgressManager> = match progress {
        Some(pm) => {
            pm.initialize(jobs.len(), config.jobs);
            Some(&*pm)
        }
        None => None,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .thread_name(|i| format!("volreg-worker-{i}"))
        .build()?;

    let outcomes: Vec<(PathBuf, Result<RegistrationResult>)> = pool.install(|| {
        jobs.par_iter()
            .map(|job| (job.moving.clone(), run_job(engine, job, progress)))
            .collect()
    });

    let mut report = BatchReport::default();
    for (moving, outcome) in outcomes {
        match outcome {
            Ok(result) => report.registered.push(RegisteredVolume { moving, result }),
            Err(error) => report.failed.push(FailedVolume { moving, error }),
        }
    }

    if let Some(pm) = progress {
        pm.finish();
    }
    log::info!(
        "Completed registration: {} succeeded, {} failed",
        report.registered.len(),
        report.failed.len()
    );

    Ok(report)
}

fn run_job(
    engine: &RegistrationEngine,
    job: &RegistrationJob,
    progress: Option<&ProgressManager>,
) -> Result<RegistrationResult> {
    let name = display_name(&job.moving);
    let spinner = progress.map(|pm| pm.start_volume(&job.moving));
    log::info!("Starting registration on {name}");

    let outcome = engine.register(job);
    match &outcome {
        Ok(result) => log::info!(
            "Completed registration on {name} -> {}",
            result.result.display()
        ),
        Err(error) => log::error!("Registration failed for {name}, skipping: {error}"),
    }

    if let (Some(pm), Some(spinner)) = (progress, spinner.as_ref()) {
        pm.complete_volume(spinner);
    }
    outcome
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
