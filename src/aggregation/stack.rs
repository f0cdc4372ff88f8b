//! Stacking registered volumes into a disk-backed array and reducing them to a median

use crate::io::configuration::MEDIAN_EXTENSION;
use crate::io::error::{Result, VolregError, precondition};
use crate::io::paths::list_dir_filtered;
use crate::io::progress::ProgressManager;
use crate::io::volume::{Volume, read_volume, write_volume};
use crate::math::statistics::median_along_stack;
use crate::registration::invoker::RegistrationResult;
use crate::registration::parameters::{ParameterChain, ResultFormat};
use crate::storage::dtype::{Element, dispatch_dtype};
use crate::storage::memmap::{AccessMode, MappedArray, open_array};
use indicatif::ProgressBar;
use ndarray::Array3;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Final-step TIFF results found in the per-volume subdirectories of `output_dir`
///
/// Subdirectories are visited in sorted order. Those without
/// `result.<last>.tif` (failed registrations) are skipped.
///
/// # Errors
///
/// Returns an error if `output_dir` cannot be listed
pub fn collect_results(output_dir: &Path, parameters: &ParameterChain) -> Result<Vec<PathBuf>> {
    let name = parameters.result_file_name(ResultFormat::Tif);
    let mut found = Vec::new();

    for dir in list_dir_filtered(output_dir, None)? {
        if !dir.is_dir() {
            continue;
        }
        let candidate = dir.join(&name);
        if candidate.is_file() {
            found.push(candidate);
        } else {
            log::debug!("No {name} in {}, skipping", dir.display());
        }
    }

    Ok(found)
}

/// Scan `output_dir` for registration results and write their median volume
///
/// Returns the path actually written, see [`with_tif_suffix`].
///
/// # Errors
///
/// Returns [`VolregError::NoResults`] when no result is found, and any error of
/// [`median_from_volumes`]
pub fn aggregate_median(
    output_dir: &Path,
    parameters: &ParameterChain,
    memmap_path: &Path,
    dest_path: &Path,
    progress: Option<&ProgressManager>,
) -> Result<PathBuf> {
    log::info!("Collecting data and generating memory mapped array");
    let volumes = collect_results(output_dir, parameters)?;
    if volumes.is_empty() {
        return Err(VolregError::NoResults {
            context: format!(
                "no {} under {}",
                parameters.result_file_name(ResultFormat::Tif),
                output_dir.display()
            ),
        });
    }
    median_from_volumes(&volumes, memmap_path, dest_path, progress)
}

/// Write the median of the volumes a batch run returned
///
/// MetaImage results cannot be decoded and are left out with a warning.
///
/// # Errors
///
/// Returns [`VolregError::NoResults`] when no TIFF result is given, and any error of
/// [`median_from_volumes`]
pub fn median_from_results(
    results: &[RegistrationResult],
    memmap_path: &Path,
    dest_path: &Path,
    progress: Option<&ProgressManager>,
) -> Result<PathBuf> {
    let volumes: Vec<PathBuf> = results
        .iter()
        .filter_map(|result| match result.format {
            ResultFormat::Tif => Some(result.result.clone()),
            ResultFormat::Mhd => {
                log::warn!(
                    "Leaving {} out of the median, only TIFF results can be stacked",
                    result.result.display()
                );
                None
            }
        })
        .collect();
    median_from_volumes(&volumes, memmap_path, dest_path, progress)
}

/// Stack `volumes` into `memmap_path` and write their voxel-wise median to `dest_path`
///
/// A `.tif` suffix is appended to `dest_path` when missing. The backing array is
/// left on disk. Returns the path actually written.
///
/// # Errors
///
/// Returns an error if:
/// - `volumes` is empty
/// - A volume cannot be read, or differs from the first in shape or element type
/// - The backing array cannot be created or flushed
/// - The median volume cannot be written
pub fn median_from_volumes(
    volumes: &[PathBuf],
    memmap_path: &Path,
    dest_path: &Path,
    progress: Option<&ProgressManager>,
) -> Result<PathBuf> {
    let dest = with_tif_suffix(dest_path);
    let stack = stack_volumes(volumes, memmap_path, progress)?;

    log::info!(
        "Taking median of {} volume(s) and saving as {}",
        stack.slot_count(),
        dest.display()
    );
    let median = median_volume(&stack)?;
    write_volume(&dest, &Volume::F64(median))?;
    log::info!("Median volume written to {}", dest.display());

    Ok(dest)
}

/// Copy volumes into a new `[N, Z, Y, X]` array at `memmap_path`, flushing after each
///
/// Shape and element type come from the first volume.
///
/// # Errors
///
/// Returns an error if `volumes` is empty, a volume cannot be read or does not
/// match the first one, or the array cannot be created or flushed
pub fn stack_volumes(
    volumes: &[PathBuf],
    memmap_path: &Path,
    progress: Option<&ProgressManager>,
) -> Result<MappedArray> {
    let Some(first_path) = volumes.first() else {
        return Err(VolregError::NoResults {
            context: "empty volume list".to_string(),
        });
    };

    let first = read_volume(first_path)?;
    let [depth, height, width] = first.shape();
    let dtype = first.dtype();
    let shape = [volumes.len(), depth, height, width];
    let mut array = open_array(memmap_path, AccessMode::Create, dtype, Some(shape.as_slice()))?;

    let bar = progress.map(|pm| pm.start_stage("Stacking", volumes.len()));
    dispatch_dtype!(dtype, T => fill_stack::<T>(&mut array, first, volumes, bar.as_ref())?);
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    Ok(array)
}

fn fill_stack<T: Element>(
    array: &mut MappedArray,
    first: Volume,
    volumes: &[PathBuf],
    bar: Option<&ProgressBar>,
) -> Result<()> {
    let expected = first.shape();
    let mut pending = Some(first);

    for (slot, path) in volumes.iter().enumerate() {
        let volume = match pending.take() {
            Some(volume) => volume,
            None => read_volume(path)?,
        };
        if volume.shape() != expected {
            return Err(VolregError::ShapeMismatch {
                path: path.clone(),
                expected: expected.to_vec(),
                actual: volume.shape().to_vec(),
            });
        }

        let data = T::view(&volume).ok_or_else(|| VolregError::DtypeMismatch {
            path: path.clone(),
            expected: T::DTYPE,
            actual: volume.dtype(),
        })?;
        let standard = data.as_standard_layout();
        let voxels = standard
            .as_slice()
            .ok_or_else(|| precondition(&"volume voxels are not contiguous"))?;

        array.write_slot(slot, voxels)?;
        array.flush()?;
        log::debug!("Stored {} in slot {slot}", path.display());

        if let Some(bar) = bar {
            bar.inc(1);
        }
    }

    Ok(())
}

/// Voxel-wise median over the first axis of a `[N, Z, Y, X]` array
///
/// # Errors
///
/// Returns an error if the array is not four-dimensional or has no slots
pub fn median_volume(array: &MappedArray) -> Result<Array3<f64>> {
    let &[count, depth, height, width] = array.shape() else {
        return Err(precondition(&format!(
            "expected a [N, Z, Y, X] array, got shape {:?}",
            array.shape()
        )));
    };
    if count == 0 {
        return Err(VolregError::NoResults {
            context: format!("{} has no slots", array.path().display()),
        });
    }

    dispatch_dtype!(array.dtype(), T => {
        let stack = array.as_slice::<T>()?;
        median_along_stack(stack, count, [depth, height, width])
            .ok_or_else(|| precondition(&"stack length does not match its shape"))
    })
}

/// Append `.tif` unless the path already ends in it
///
/// `median` becomes `median.tif`; `median.tiff` becomes `median.tiff.tif`.
pub fn with_tif_suffix(path: &Path) -> PathBuf {
    if path
        .extension()
        .is_some_and(|extension| extension == MEDIAN_EXTENSION)
    {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(MEDIAN_EXTENSION);
    PathBuf::from(name)
}
