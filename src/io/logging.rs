//! Logger setup for the command-line tool

use log::LevelFilter;

/// Level used when `RUST_LOG` is not set
///
/// `--quiet` keeps warnings and errors only; each `-v` raises the level one step
/// above `info`.
pub const fn default_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install `env_logger` writing timestamped records to stdout
///
/// `RUST_LOG` overrides the level derived from the flags. Calling this more than
/// once keeps the first logger.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let level = default_level(verbosity, quiet);
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .target(env_logger::Target::Stdout)
        .try_init();
}
