//! Pipeline constants and runtime configuration defaults

// External engine
/// Executable invoked when no engine path is given on the command line
pub const DEFAULT_ENGINE: &str = "elastix";

/// File inside each per-volume directory that receives the engine's stdout and stderr
pub const ENGINE_LOG_FILE: &str = "engine.log";

/// Interval between child status checks when a timeout is configured
pub const ENGINE_POLL_INTERVAL_MS: u64 = 100;

// Naming contract with the engine's output directory
/// Stem of the transformed volume written by the engine
pub const RESULT_STEM: &str = "result";

/// Stem of the transform description written by the engine
pub const TRANSFORM_PARAMETERS_STEM: &str = "TransformParameters";

/// Extension of the transform description
pub const TRANSFORM_PARAMETERS_EXTENSION: &str = "txt";

/// Extension required on the median volume
pub const MEDIAN_EXTENSION: &str = "tif";

// Directory listing
/// Entries whose names start with this character are skipped
pub const HIDDEN_PREFIX: char = '.';

/// Substrings marking editor backups and OS artifacts that are skipped
pub const IGNORED_NAME_MARKERS: [&str; 2] = ["~", "Thumbs.db"];

// Worker pool
/// Registrations run concurrently unless raised on the command line
pub const DEFAULT_JOBS: usize = 1;

// Progress bar display settings
/// Above this many concurrent workers, per-volume spinners are hidden
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;

/// Spinner refresh rate while the engine runs
pub const SPINNER_TICK_MS: u64 = 120;
