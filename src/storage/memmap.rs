//! Disk-backed arrays in `.npy` format accessed through memory maps
//!
//! Mirrors the four classic open modes:
//!
//! | mode | flag | behaviour |
//! |------|------|-----------|
//! | [`AccessMode::ReadOnly`] | `r` | open an existing file for reading |
//! | [`AccessMode::ReadWrite`] | `r+` | open an existing file for reading and writing |
//! | [`AccessMode::Create`] | `w+` | create or overwrite a file with a declared shape |
//! | [`AccessMode::CopyOnWrite`] | `c` | writes stay in memory, the file is never modified |

use crate::io::error::{
    Result, VolregError, WithPath, array_format, invalid_parameter, precondition,
};
use crate::storage::dtype::{Dtype, Element, dispatch_dtype};
use memmap2::{Mmap, MmapMut, MmapOptions};
use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};
use ndarray_npy::{ViewMutNpyExt, ViewNpyError, ViewNpyExt, write_zeroed_npy};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How an array file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Existing file, read only
    ReadOnly,
    /// Existing file, writes go to disk
    ReadWrite,
    /// New or truncated file with a declared shape
    Create,
    /// Existing file, writes are private to this handle
    CopyOnWrite,
}

impl AccessMode {
    /// Conventional short flag for the mode
    pub const fn flag(self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "r+",
            Self::Create => "w+",
            Self::CopyOnWrite => "c",
        }
    }
}

impl FromStr for AccessMode {
    type Err = VolregError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::ReadOnly),
            "r+" => Ok(Self::ReadWrite),
            "w+" => Ok(Self::Create),
            "c" => Ok(Self::CopyOnWrite),
            other => Err(invalid_parameter(
                "mode",
                &other,
                &"expected one of r, r+, w+, c",
            )),
        }
    }
}

enum Mapping {
    ReadOnly(Mmap),
    Writable(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::ReadOnly(map) => map.as_ref(),
            Self::Writable(map) => map.as_ref(),
        }
    }
}

/// Handle to a memory-mapped `.npy` array
pub struct MappedArray {
    path: PathBuf,
    mode: AccessMode,
    dtype: Dtype,
    shape: Vec<usize>,
    mapping: Mapping,
}

/// Open or create a disk-backed array
///
/// `shape` must be given for [`AccessMode::Create`] and only then; any other
/// combination is rejected before the file system is touched. Existing files must
/// hold `dtype` elements.
///
/// # Errors
///
/// Returns an error if:
/// - `shape` is passed with a mode other than create, or missing in create mode
/// - The file cannot be opened, created, resized or mapped
/// - The header is malformed, declares another dtype, or the file is too short
pub fn open_array(
    path: &Path,
    mode: AccessMode,
    dtype: Dtype,
    shape: Option<&[usize]>,
) -> Result<MappedArray> {
    match (mode, shape) {
        (AccessMode::Create, Some(shape)) => create_array(path, dtype, shape),
        (AccessMode::Create, None) => Err(precondition(&"creating an array requires a shape")),
        (_, Some(_)) => Err(precondition(&format!(
            "a shape may only be passed when creating an array, not in mode '{}'",
            mode.flag()
        ))),
        (_, None) => open_existing(path, mode, dtype),
    }
}

fn create_array(path: &Path, dtype: Dtype, shape: &[usize]) -> Result<MappedArray> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_path(path, "create array")?;
    let written = dispatch_dtype!(dtype, T => write_zeroed_npy::<T, _>(&file, IxDyn(shape)));
    written.map_err(|source| VolregError::ArrayEncode {
        path: path.to_path_buf(),
        source,
    })?;

    let mapping = Mapping::Writable(map_shared_mut(&file, path)?);
    log::debug!(
        "Created {dtype} array {shape:?} ({} data bytes) at {}",
        shape
            .iter()
            .fold(dtype.size(), |bytes, &dim| bytes.saturating_mul(dim)),
        path.display()
    );

    Ok(MappedArray {
        path: path.to_path_buf(),
        mode: AccessMode::Create,
        dtype,
        shape: shape.to_vec(),
        mapping,
    })
}

fn open_existing(path: &Path, mode: AccessMode, dtype: Dtype) -> Result<MappedArray> {
    let file = OpenOptions::new()
        .read(true)
        .write(mode == AccessMode::ReadWrite)
        .open(path)
        .with_path(path, "open array")?;

    let mapping = match mode {
        AccessMode::ReadOnly => Mapping::ReadOnly(map_read_only(&file, path)?),
        AccessMode::ReadWrite => Mapping::Writable(map_shared_mut(&file, path)?),
        AccessMode::CopyOnWrite => Mapping::Writable(map_private(&file, path)?),
        AccessMode::Create => return Err(precondition(&"create mode requires a shape")),
    };

    let bytes = mapping.bytes();
    let viewed = dispatch_dtype!(dtype, T => {
        ArrayViewD::<T>::view_npy(bytes).map(|view| view.shape().to_vec())
    });
    let shape = match viewed {
        Ok(shape) => shape,
        Err(source) => {
            let stored = matches!(source, ViewNpyError::WrongDescriptor(_))
                .then(|| stored_dtype(bytes))
                .flatten();
            return Err(match stored {
                Some(actual) => VolregError::DtypeMismatch {
                    path: path.to_path_buf(),
                    expected: dtype,
                    actual,
                },
                None => VolregError::ArrayDecode {
                    path: path.to_path_buf(),
                    source,
                },
            });
        }
    };

    Ok(MappedArray {
        path: path.to_path_buf(),
        mode,
        dtype,
        shape,
        mapping,
    })
}

/// Element type the file was written with, if it is one this crate supports
fn stored_dtype(bytes: &[u8]) -> Option<Dtype> {
    Dtype::ALL
        .into_iter()
        .find(|&candidate| dispatch_dtype!(candidate, T => ArrayViewD::<T>::view_npy(bytes).is_ok()))
}

// SAFETY for the three mapping helpers: the array file is owned by this pipeline
// run; concurrent truncation by another process is undefined behaviour we accept.

#[allow(unsafe_code)]
fn map_read_only(file: &File, path: &Path) -> Result<Mmap> {
    unsafe { Mmap::map(file) }.with_path(path, "map array")
}

#[allow(unsafe_code)]
fn map_shared_mut(file: &File, path: &Path) -> Result<MmapMut> {
    unsafe { MmapMut::map_mut(file) }.with_path(path, "map array")
}

#[allow(unsafe_code)]
fn map_private(file: &File, path: &Path) -> Result<MmapMut> {
    unsafe { MmapOptions::new().map_copy(file) }.with_path(path, "map array")
}

impl MappedArray {
    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the array was opened with
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Element type
    pub const fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Shape in C order
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots along the first axis
    pub fn slot_count(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements per slot along the first axis
    pub fn slot_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE == self.dtype {
            Ok(())
        } else {
            Err(VolregError::DtypeMismatch {
                path: self.path.clone(),
                expected: self.dtype,
                actual: T::DTYPE,
            })
        }
    }

    /// Typed view of the whole array
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not the array's element type or the mapped bytes
    /// no longer form a valid array
    pub fn view<T: Element>(&self) -> Result<ArrayViewD<'_, T>> {
        self.check_dtype::<T>()?;
        ArrayViewD::<T>::view_npy(self.mapping.bytes()).map_err(|source| {
            VolregError::ArrayDecode {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Mutable typed view of the whole array
    ///
    /// # Errors
    ///
    /// Returns an error if the array is read-only, `T` is not its element type, or
    /// the mapped bytes no longer form a valid array
    pub fn view_mut<T: Element>(&mut self) -> Result<ArrayViewMutD<'_, T>> {
        self.check_dtype::<T>()?;
        let path = &self.path;
        let map = match &mut self.mapping {
            Mapping::Writable(map) => map,
            Mapping::ReadOnly(_) => {
                return Err(precondition(&format!(
                    "'{}' was opened read-only",
                    path.display()
                )));
            }
        };
        ArrayViewMutD::<T>::view_mut_npy(map.as_mut()).map_err(|source| {
            VolregError::ArrayDecode {
                path: path.clone(),
                source,
            }
        })
    }

    /// All elements in C order
    ///
    /// # Errors
    ///
    /// Returns an error if `T` does not match or the file stores Fortran order
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.view::<T>()?
            .to_slice()
            .ok_or_else(|| array_format(&self.path, &"data is not in C order"))
    }

    /// All elements in C order, writable
    ///
    /// # Errors
    ///
    /// Returns an error if the array is read-only, `T` does not match, or the file
    /// stores Fortran order
    pub fn as_slice_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        let path = self.path.clone();
        self.view_mut::<T>()?
            .into_slice()
            .ok_or_else(|| array_format(&path, &"data is not in C order"))
    }

    fn slot_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        if index >= self.slot_count() {
            return Err(invalid_parameter(
                "slot",
                &index,
                &format!("array has {} slots", self.slot_count()),
            ));
        }
        let len = self.slot_len();
        Ok(index * len..(index + 1) * len)
    }

    /// Elements of one slot along the first axis
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or `T` does not match
    pub fn slot<T: Element>(&self, index: usize) -> Result<&[T]> {
        let range = self.slot_range(index)?;
        self.as_slice::<T>()?
            .get(range)
            .ok_or_else(|| array_format(&self.path, &"slot out of range"))
    }

    /// Overwrite one slot along the first axis
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range, `values` has the wrong length,
    /// `T` does not match, or the array is read-only
    pub fn write_slot<T: Element>(&mut self, index: usize, values: &[T]) -> Result<()> {
        let range = self.slot_range(index)?;
        if values.len() != range.len() {
            return Err(VolregError::ShapeMismatch {
                path: self.path.clone(),
                expected: self.shape.iter().skip(1).copied().collect(),
                actual: vec![values.len()],
            });
        }
        let path = self.path.clone();
        self.as_slice_mut::<T>()?
            .get_mut(range)
            .ok_or_else(|| array_format(&path, &"slot out of range"))?
            .copy_from_slice(values);
        Ok(())
    }

    /// Write pending changes to disk
    ///
    /// A no-op for read-only and copy-on-write arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system rejects the flush
    pub fn flush(&self) -> Result<()> {
        match (&self.mapping, self.mode) {
            (Mapping::Writable(map), AccessMode::ReadWrite | AccessMode::Create) => {
                map.flush().with_path(&self.path, "flush array")
            }
            _ => Ok(()),
        }
    }
}
