//! Command-line invocation of the external registration engine for one volume pair

use crate::io::configuration::{ENGINE_LOG_FILE, ENGINE_POLL_INTERVAL_MS};
use crate::io::error::{Result, VolregError, WithPath};
use crate::io::paths::ensure_dir;
use crate::registration::parameters::{ParameterChain, ResultFormat};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// One fixed/moving pair to align
#[derive(Debug, Clone)]
pub struct RegistrationJob {
    /// Reference volume (the seed)
    pub fixed: PathBuf,
    /// Volume to transform onto the reference
    pub moving: PathBuf,
    /// Directory receiving the engine's output for this pair
    pub output_dir: PathBuf,
    /// Parameter files in application order
    pub parameters: ParameterChain,
    /// Optional mask restricting the metric to part of the fixed volume
    pub fixed_mask: Option<PathBuf>,
}

impl RegistrationJob {
    /// Engine arguments: `-f <fixed> -m <moving> [-fMask <mask>] -out <dir> (-p <file>)+`
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            self.fixed.clone().into(),
            "-m".into(),
            self.moving.clone().into(),
        ];
        if let Some(mask) = &self.fixed_mask {
            args.push("-fMask".into());
            args.push(mask.clone().into());
        }
        args.push("-out".into());
        args.push(self.output_dir.clone().into());
        for file in self.parameters.files() {
            args.push("-p".into());
            args.push(file.clone().into());
        }
        args
    }
}

/// Files produced by a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    /// Transformed moving volume
    pub result: PathBuf,
    /// Transform of the final step; its existence is not checked
    pub transform_parameters: PathBuf,
    /// Container format of `result`
    pub format: ResultFormat,
}

impl RegistrationResult {
    /// Find the final-step result in an engine output directory
    ///
    /// `result.<last>.tif` is preferred; `result.<last>.mhd` is accepted as fallback.
    ///
    /// # Errors
    ///
    /// Returns [`VolregError::MissingResult`] when neither file exists
    pub fn locate(output_dir: &Path, parameters: &ParameterChain) -> Result<Self> {
        let transform_parameters = parameters.transform_parameters_path(output_dir);

        [ResultFormat::Tif, ResultFormat::Mhd]
            .into_iter()
            .map(|format| (format, parameters.result_path(output_dir, format)))
            .find(|(_, path)| path.exists())
            .map(|(format, result)| Self {
                result,
                transform_parameters: transform_parameters.clone(),
                format,
            })
            .ok_or_else(|| VolregError::MissingResult {
                expected: parameters.result_path(output_dir, ResultFormat::Tif),
            })
    }
}

/// External registration engine invoked as a blocking subprocess
#[derive(Debug, Clone)]
pub struct RegistrationEngine {
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl RegistrationEngine {
    /// Engine run from `executable` (a path or a name looked up in `PATH`)
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: None,
        }
    }

    /// Kill runs that exceed `timeout`; `None` waits indefinitely
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executable that is spawned
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Configured time budget per registration
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Register one pair and locate its result
    ///
    /// The engine's stdout and stderr go to `engine.log` in the job's output
    /// directory. A non-zero exit status is only logged: whether the result file
    /// exists decides success.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output directory or engine log cannot be created
    /// - The engine cannot be spawned or waited on
    /// - The run exceeds the configured timeout
    /// - No result file exists afterwards
    pub fn register(&self, job: &RegistrationJob) -> Result<RegistrationResult> {
        ensure_dir(&job.output_dir)?;
        let log_path = job.output_dir.join(ENGINE_LOG_FILE);
        let stdout = File::create(&log_path).with_path(&log_path, "create engine log")?;
        let stderr = stdout
            .try_clone()
            .with_path(&log_path, "create engine log")?;

        log::debug!(
            "Running {} {:?}",
            self.executable.display(),
            job.arguments()
        );

        let mut child = Command::new(&self.executable)
            .args(job.arguments())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| self.invocation_error(source))?;

        let status = self.wait(&mut child, job)?;
        if !status.success() {
            log::warn!(
                "Registration engine exited with {status} for {} (see {})",
                job.moving.display(),
                log_path.display()
            );
        }

        RegistrationResult::locate(&job.output_dir, &job.parameters)
    }

    fn wait(&self, child: &mut Child, job: &RegistrationJob) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| self.invocation_error(source));
        };

        let started = Instant::now();
        let poll_interval = Duration::from_millis(ENGINE_POLL_INTERVAL_MS);
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| self.invocation_error(source))?
            {
                return Ok(status);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                abandon(child, &job.moving);
                return Err(VolregError::EngineTimeout {
                    moving: job.moving.clone(),
                    timeout,
                });
            }
            std::thread::sleep(poll_interval.min(timeout - elapsed));
        }
    }

    fn invocation_error(&self, source: std::io::Error) -> VolregError {
        VolregError::EngineInvocation {
            executable: self.executable.clone(),
            source,
        }
    }
}

/// Kill a timed-out engine and reap it
///
/// The job fails with a timeout regardless, so errors are only logged.
fn abandon(child: &mut Child, moving: &Path) {
    if let Err(error) = child.kill() {
        log::debug!(
            "Failed to kill engine registering {}: {error}",
            moving.display()
        );
    }
    if let Err(error) = child.wait() {
        log::debug!(
            "Failed to reap engine registering {}: {error}",
            moving.display()
        );
    }
}
