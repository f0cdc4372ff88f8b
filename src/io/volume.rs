//! Multi-page greyscale TIFF volumes, one page per Z plane

use crate::io::error::{Result, VolregError, WithPath};
use crate::storage::dtype::Dtype;
use ndarray::Array3;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype;
use tiff::encoder::{TiffEncoder, TiffValue};

/// A 3-D image with axes `[Z, Y, X]`
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    /// Unsigned 8-bit voxels
    U8(Array3<u8>),
    /// Unsigned 16-bit voxels
    U16(Array3<u16>),
    /// Unsigned 32-bit voxels
    U32(Array3<u32>),
    /// Signed 16-bit voxels
    I16(Array3<i16>),
    /// Signed 32-bit voxels
    I32(Array3<i32>),
    /// 32-bit float voxels
    F32(Array3<f32>),
    /// 64-bit float voxels
    F64(Array3<f64>),
}

macro_rules! each_volume {
    ($volume:expr, $data:ident => $body:expr) => {
        match $volume {
            Volume::U8($data) => $body,
            Volume::U16($data) => $body,
            Volume::U32($data) => $body,
            Volume::I16($data) => $body,
            Volume::I32($data) => $body,
            Volume::F32($data) => $body,
            Volume::F64($data) => $body,
        }
    };
}

impl Volume {
    /// Element type of the voxels
    pub const fn dtype(&self) -> Dtype {
        match self {
            Self::U8(_) => Dtype::U8,
            Self::U16(_) => Dtype::U16,
            Self::U32(_) => Dtype::U32,
            Self::I16(_) => Dtype::I16,
            Self::I32(_) => Dtype::I32,
            Self::F32(_) => Dtype::F32,
            Self::F64(_) => Dtype::F64,
        }
    }

    /// Shape as `[Z, Y, X]`
    pub fn shape(&self) -> [usize; 3] {
        let (z, y, x) = each_volume!(self, data => data.dim());
        [z, y, x]
    }
}

// Accumulates decoded pages of one sample type into a single buffer
macro_rules! define_planes {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        enum Planes {
            $($variant(Vec<$ty>),)+
        }

        impl Planes {
            fn from_page(page: DecodingResult, path: &Path) -> Result<Self> {
                match page {
                    $(DecodingResult::$variant(data) => Ok(Self::$variant(data)),)+
                    _ => Err(VolregError::UnsupportedFormat {
                        path: path.to_path_buf(),
                        reason: "sample type has no volume representation".to_string(),
                    }),
                }
            }

            fn append(&mut self, page: DecodingResult, path: &Path, index: usize) -> Result<()> {
                match (self, page) {
                    $((Self::$variant(planes), DecodingResult::$variant(data)) => {
                        planes.extend(data);
                        Ok(())
                    })+
                    _ => Err(VolregError::UnsupportedFormat {
                        path: path.to_path_buf(),
                        reason: format!("page {index} has a different sample type than page 0"),
                    }),
                }
            }

            fn into_volume(self, shape: [usize; 3], path: &Path) -> Result<Volume> {
                let [depth, height, width] = shape;
                match self {
                    $(Self::$variant(data) => Array3::from_shape_vec((depth, height, width), data)
                        .map(Volume::$variant)
                        .map_err(|e| VolregError::UnsupportedFormat {
                            path: path.to_path_buf(),
                            reason: format!("pixel data does not fit {depth}x{height}x{width}: {e}"),
                        }),)+
                }
            }
        }
    };
}

define_planes!(
    U8(u8),
    U16(u16),
    U32(u32),
    I16(i16),
    I32(i32),
    F32(f32),
    F64(f64),
);

/// Read a multi-page TIFF as a volume
///
/// Every page must be single-channel and share the first page's size and sample type.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened or decoded
/// - A page is not greyscale, or its size or sample type differs from page 0
pub fn read_volume(path: &Path) -> Result<Volume> {
    let load_error = |source| VolregError::VolumeLoad {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).with_path(path, "open volume")?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(load_error)?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(load_error)?;
    let mut planes: Option<Planes> = None;
    let mut depth = 0;

    loop {
        let page_dimensions = decoder.dimensions().map_err(load_error)?;
        if page_dimensions != (width, height) {
            return Err(VolregError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!(
                    "page {depth} is {}x{}, page 0 is {width}x{height}",
                    page_dimensions.0, page_dimensions.1
                ),
            });
        }

        match decoder.colortype().map_err(load_error)? {
            ColorType::Gray(_) => {}
            other => {
                return Err(VolregError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: format!("colour type {other:?}, only greyscale pages are supported"),
                });
            }
        }

        let page = decoder.read_image().map_err(load_error)?;
        match planes.as_mut() {
            Some(existing) => existing.append(page, path, depth)?,
            None => planes = Some(Planes::from_page(page, path)?),
        }
        depth += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(load_error)?;
    }

    let planes = planes.ok_or_else(|| VolregError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: "no pages".to_string(),
    })?;
    planes.into_volume([depth, height as usize, width as usize], path)
}

/// Write a volume as a multi-page TIFF, creating the parent directory if needed
///
/// # Errors
///
/// Returns an error if:
/// - The volume has an empty Y/X plane
/// - The parent directory or the file cannot be created
/// - Encoding fails
pub fn write_volume(path: &Path, volume: &Volume) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_path(parent, "create directory")?;
    }

    let file = File::create(path).with_path(path, "create volume")?;
    let mut writer = BufWriter::new(file);
    {
        let mut encoder = TiffEncoder::new(&mut writer).map_err(|source| {
            VolregError::VolumeExport {
                path: path.to_path_buf(),
                source,
            }
        })?;

        match volume {
            Volume::U8(data) => write_pages::<colortype::Gray8, _>(&mut encoder, data, path)?,
            Volume::U16(data) => write_pages::<colortype::Gray16, _>(&mut encoder, data, path)?,
            Volume::U32(data) => write_pages::<colortype::Gray32, _>(&mut encoder, data, path)?,
            Volume::I16(data) => write_pages::<colortype::GrayI16, _>(&mut encoder, data, path)?,
            Volume::I32(data) => write_pages::<colortype::GrayI32, _>(&mut encoder, data, path)?,
            Volume::F32(data) => {
                write_pages::<colortype::Gray32Float, _>(&mut encoder, data, path)?;
            }
            Volume::F64(data) => {
                write_pages::<colortype::Gray64Float, _>(&mut encoder, data, path)?;
            }
        }
    }
    writer.flush().with_path(path, "flush volume")
}

fn write_pages<C, W>(
    encoder: &mut TiffEncoder<W>,
    data: &Array3<C::Inner>,
    path: &Path,
) -> Result<()>
where
    C: colortype::ColorType,
    C::Inner: Clone,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let (_, height, width) = data.dim();
    let unsupported = |reason: String| VolregError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let plane_len = height * width;
    if plane_len == 0 {
        return Err(unsupported(format!("empty {height}x{width} plane")));
    }
    let page_width = u32::try_from(width)
        .map_err(|e| unsupported(format!("width {width} exceeds TIFF limits: {e}")))?;
    let page_height = u32::try_from(height)
        .map_err(|e| unsupported(format!("height {height} exceeds TIFF limits: {e}")))?;

    let standard = data.as_standard_layout();
    let voxels = standard
        .as_slice()
        .ok_or_else(|| unsupported("voxels are not contiguous".to_string()))?;

    for page in voxels.chunks_exact(plane_len) {
        encoder
            .write_image::<C>(page_width, page_height, page)
            .map_err(|source| VolregError::VolumeExport {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(())
}
