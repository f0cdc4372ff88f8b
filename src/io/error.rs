//! Error types and path context for pipeline operations

use crate::storage::dtype::Dtype;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main error type for all pipeline operations
#[derive(Debug)]
pub enum VolregError {
    /// The registration engine could not be started or waited on
    EngineInvocation {
        /// Engine executable that was invoked
        executable: PathBuf,
        /// Underlying process error
        source: std::io::Error,
    },

    /// The registration engine exceeded its time budget and was killed
    EngineTimeout {
        /// Moving volume of the abandoned job
        moving: PathBuf,
        /// Configured limit
        timeout: Duration,
    },

    /// The engine finished but neither a `.tif` nor a `.mhd` result exists
    MissingResult {
        /// Result path that was expected
        expected: PathBuf,
    },

    /// No registered volume was found to aggregate
    NoResults {
        /// Where the volumes were expected
        context: String,
    },

    /// An API contract was violated by the caller
    Precondition {
        /// Description of the violated contract
        reason: String,
    },

    /// A volume does not have the shape of the first collected volume
    ShapeMismatch {
        /// Offending file
        path: PathBuf,
        /// Shape established by the first volume or array header
        expected: Vec<usize>,
        /// Shape found
        actual: Vec<usize>,
    },

    /// A volume or array does not have the expected element type
    DtypeMismatch {
        /// Offending file
        path: PathBuf,
        /// Element type that was required
        expected: Dtype,
        /// Element type found
        actual: Dtype,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to decode a TIFF volume
    VolumeLoad {
        /// Path to the volume
        path: PathBuf,
        /// Underlying codec error
        source: tiff::TiffError,
    },

    /// Failed to encode a TIFF volume
    VolumeExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying codec error
        source: tiff::TiffError,
    },

    /// The volume uses a layout this crate cannot represent
    UnsupportedFormat {
        /// Path to the volume
        path: PathBuf,
        /// What is unsupported
        reason: String,
    },

    /// Two moving volumes would be registered into the same output directory
    OutputCollision {
        /// Shared output directory
        directory: PathBuf,
        /// Volume listed first
        first: PathBuf,
        /// Volume that clashes with it
        second: PathBuf,
    },

    /// Failed to write the header and zeroed data of a `.npy` array
    ArrayEncode {
        /// Path to the array file
        path: PathBuf,
        /// Underlying codec error
        source: ndarray_npy::WriteNpyError,
    },

    /// A mapped `.npy` array could not be viewed as typed elements
    ArrayDecode {
        /// Path to the array file
        path: PathBuf,
        /// Underlying codec error
        source: ndarray_npy::ViewNpyError,
    },

    /// A disk-backed array is laid out in a way this crate cannot use
    ArrayFormat {
        /// Path to the array file
        path: PathBuf,
        /// Description of the problem
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The registration worker pool could not be built
    WorkerPool {
        /// Underlying pool construction error
        source: rayon::ThreadPoolBuildError,
    },
}

impl fmt::Display for VolregError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineInvocation { executable, source } => {
                write!(
                    f,
                    "Failed to run registration engine '{}': {source}",
                    executable.display()
                )
            }
            Self::EngineTimeout { moving, timeout } => {
                write!(
                    f,
                    "Registration of '{}' timed out after {}s",
                    moving.display(),
                    timeout.as_secs_f64()
                )
            }
            Self::MissingResult { expected } => {
                write!(
                    f,
                    "Cannot find registration result file '{}' (or its .mhd variant), try changing parameter files",
                    expected.display()
                )
            }
            Self::NoResults { context } => {
                write!(f, "No registered volumes to aggregate ({context})")
            }
            Self::Precondition { reason } => write!(f, "Precondition violated: {reason}"),
            Self::ShapeMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Shape mismatch for '{}': expected {expected:?}, got {actual:?}",
                    path.display()
                )
            }
            Self::DtypeMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Element type mismatch for '{}': expected {expected}, got {actual}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::VolumeLoad { path, source } => {
                write!(f, "Failed to load volume '{}': {source}", path.display())
            }
            Self::VolumeExport { path, source } => {
                write!(
                    f,
                    "Failed to export volume to '{}': {source}",
                    path.display()
                )
            }
            Self::UnsupportedFormat { path, reason } => {
                write!(f, "Unsupported volume '{}': {reason}", path.display())
            }
            Self::OutputCollision {
                directory,
                first,
                second,
            } => {
                write!(
                    f,
                    "'{}' and '{}' would both be registered into '{}'; rename one of them",
                    first.display(),
                    second.display(),
                    directory.display()
                )
            }
            Self::ArrayEncode { path, source } => {
                write!(f, "Failed to create array '{}': {source}", path.display())
            }
            Self::ArrayDecode { path, source } => {
                write!(f, "Failed to read array '{}': {source}", path.display())
            }
            Self::ArrayFormat { path, reason } => {
                write!(f, "Invalid array file '{}': {reason}", path.display())
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::WorkerPool { source } => write!(f, "Failed to build worker pool: {source}"),
        }
    }
}

impl std::error::Error for VolregError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EngineInvocation { source, .. } | Self::FileSystem { source, .. } => {
                Some(source)
            }
            Self::VolumeLoad { source, .. } | Self::VolumeExport { source, .. } => Some(source),
            Self::ArrayEncode { source, .. } => Some(source),
            Self::ArrayDecode { source, .. } => Some(source),
            Self::WorkerPool { source } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for pipeline results
pub type Result<T> = std::result::Result<T, VolregError>;

/// Attaches the path and operation to raw I/O failures
pub trait WithPath<T> {
    /// Convert an I/O error into [`VolregError::FileSystem`]
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::io::Result<T> {
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| VolregError::FileSystem {
            path: path.to_path_buf(),
            operation,
            source,
        })
    }
}

impl From<rayon::ThreadPoolBuildError> for VolregError {
    fn from(source: rayon::ThreadPoolBuildError) -> Self {
        Self::WorkerPool { source }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> VolregError {
    VolregError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a precondition error
pub fn precondition(reason: &impl ToString) -> VolregError {
    VolregError::Precondition {
        reason: reason.to_string(),
    }
}

/// Create an array format error
pub fn array_format(path: &Path, reason: &impl ToString) -> VolregError {
    VolregError::ArrayFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
