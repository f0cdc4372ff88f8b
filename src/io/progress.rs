//! Progress display for batch registration and aggregation

use crate::io::configuration::{MAX_INDIVIDUAL_PROGRESS_BARS, SPINNER_TICK_MS};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// Coordinates progress display for a pipeline run
///
/// A batch bar counts finished volumes. While the worker count stays small, each
/// running registration also gets a spinner; with many workers the spinners are
/// hidden to avoid terminal spam. The manager is shared by reference across
/// registration workers.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    show_spinners: bool,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static SPINNER_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} [{elapsed_precise}] {prefix} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Volumes: [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{prefix} [{bar:40.green/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            show_spinners: true,
        }
    }

    /// Set up the batch bar for `volume_count` volumes processed by `workers` threads
    pub fn initialize(&mut self, volume_count: usize, workers: usize) {
        let batch_bar = ProgressBar::new(volume_count as u64);
        batch_bar.set_style(BATCH_STYLE.clone());
        self.batch_bar = Some(self.multi_progress.add(batch_bar));
        self.show_spinners = workers <= MAX_INDIVIDUAL_PROGRESS_BARS;
    }

    /// Spinner for a registration that just started
    pub fn start_volume(&self, path: &Path) -> ProgressBar {
        if !self.show_spinners {
            return ProgressBar::hidden();
        }

        let spinner = self.multi_progress.add(ProgressBar::new_spinner());
        spinner.set_style(SPINNER_STYLE.clone());
        spinner.set_prefix(
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        );
        spinner.set_message("registering");
        spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        spinner
    }

    /// Remove a volume's spinner and advance the batch bar
    pub fn complete_volume(&self, spinner: &ProgressBar) {
        spinner.finish_and_clear();
        if self.show_spinners {
            self.multi_progress.remove(spinner);
        }
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }
    }

    /// Number of volumes reported complete so far
    pub fn completed(&self) -> u64 {
        self.batch_bar.as_ref().map_or(0, ProgressBar::position)
    }

    /// Bar for a sequential stage such as stacking volumes into the aggregate array
    pub fn start_stage(&self, label: &str, len: usize) -> ProgressBar {
        let bar = self.multi_progress.add(ProgressBar::new(len as u64));
        bar.set_style(STAGE_STYLE.clone());
        bar.set_prefix(label.to_string());
        bar
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.finish_with_message("All volumes processed");
        }
        let _ = self.multi_progress.clear();
    }
}
