//! Input/output: command line, configuration, errors, file system and volume codecs

/// Command-line parsing and pipeline dispatch
pub mod cli;
/// Constants shared across the pipeline
pub mod configuration;
/// Error types and I/O context helpers
pub mod error;
/// Logger initialization
pub mod logging;
/// Directory creation and filtered listing
pub mod paths;
/// Terminal progress display
pub mod progress;
/// Multi-page TIFF volume reading and writing
pub mod volume;
