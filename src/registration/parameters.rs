//! Ordered parameter-file chains and the result names they imply

use crate::io::configuration::{
    RESULT_STEM, TRANSFORM_PARAMETERS_EXTENSION, TRANSFORM_PARAMETERS_STEM,
};
use crate::io::error::{Result, invalid_parameter};
use std::path::{Path, PathBuf};

/// Container format of a transformed volume written by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// Multi-page TIFF, the format the aggregation stage can stack
    Tif,
    /// MetaImage header, written when the engine cannot emit TIFF
    Mhd,
}

impl ResultFormat {
    /// File extension without the dot
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tif => "tif",
            Self::Mhd => "mhd",
        }
    }
}

/// Registration parameter files in the order the engine applies them
///
/// Step `i` starts from the transform found by step `i - 1`, so the order is part of
/// the registration itself (for example rigid, then affine, then B-spline). A chain
/// always has at least one file. File existence is left to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterChain {
    files: Vec<PathBuf>,
}

impl ParameterChain {
    /// Build a chain from parameter files in application order
    ///
    /// # Errors
    ///
    /// Returns an error if `files` is empty
    pub fn new(files: Vec<PathBuf>) -> Result<Self> {
        if files.is_empty() {
            return Err(invalid_parameter(
                "parameters",
                &"[]",
                &"at least one parameter file is required",
            ));
        }
        Ok(Self { files })
    }

    /// Parameter files in application order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of steps
    pub const fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Index the engine uses for the files of the last step
    pub const fn last_step_index(&self) -> usize {
        self.files.len() - 1
    }

    /// `result.<last>.<ext>`, the transformed volume of the final step
    pub fn result_file_name(&self, format: ResultFormat) -> String {
        format!(
            "{RESULT_STEM}.{}.{}",
            self.last_step_index(),
            format.extension()
        )
    }

    /// `TransformParameters.<last>.txt`, the transform of the final step
    pub fn transform_parameters_file_name(&self) -> String {
        format!(
            "{TRANSFORM_PARAMETERS_STEM}.{}.{TRANSFORM_PARAMETERS_EXTENSION}",
            self.last_step_index()
        )
    }

    /// Result path inside a per-volume output directory
    pub fn result_path(&self, output_dir: &Path, format: ResultFormat) -> PathBuf {
        output_dir.join(self.result_file_name(format))
    }

    /// Transform-parameter path inside a per-volume output directory
    pub fn transform_parameters_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.transform_parameters_file_name())
    }
}
