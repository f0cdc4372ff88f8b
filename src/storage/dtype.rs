//! Voxel element types shared by the TIFF codec and the disk-backed array

use crate::io::volume::Volume;
use ndarray::Array3;
use ndarray_npy::{ViewElement, ViewMutElement, WritableElement};
use num_traits::AsPrimitive;
use std::fmt;

/// Element type of a volume or stacked array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer, the usual light-sheet camera depth
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl Dtype {
    /// Every supported element type
    pub const ALL: [Self; 7] = [
        Self::U8,
        Self::U16,
        Self::U32,
        Self::I16,
        Self::I32,
        Self::F32,
        Self::F64,
    ];

    /// Size of one element in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::F32 => "float32",
            Self::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Rust scalar that can be stored in a [`Volume`] and a mapped array
pub trait Element: WritableElement + ViewElement + ViewMutElement + AsPrimitive<f64> + Send + Sync {
    /// Runtime tag of this element type
    const DTYPE: Dtype;

    /// Borrow the voxels of a volume if it holds this element type
    fn view(volume: &Volume) -> Option<&Array3<Self>>;

    /// Wrap typed voxels into a volume
    fn wrap(data: Array3<Self>) -> Volume;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: Dtype = Dtype::$variant;

                fn view(volume: &Volume) -> Option<&Array3<Self>> {
                    match volume {
                        Volume::$variant(data) => Some(data),
                        _ => None,
                    }
                }

                fn wrap(data: Array3<Self>) -> Volume {
                    Volume::$variant(data)
                }
            }
        )+
    };
}

impl_element!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i16 => I16,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

/// Run a block with `$ty` bound to the Rust type matching a runtime [`Dtype`]
macro_rules! dispatch_dtype {
    ($dtype:expr, $ty:ident => $body:expr) => {
        match $dtype {
            $crate::storage::dtype::Dtype::U8 => {
                type $ty = u8;
                $body
            }
            $crate::storage::dtype::Dtype::U16 => {
                type $ty = u16;
                $body
            }
            $crate::storage::dtype::Dtype::U32 => {
                type $ty = u32;
                $body
            }
            $crate::storage::dtype::Dtype::I16 => {
                type $ty = i16;
                $body
            }
            $crate::storage::dtype::Dtype::I32 => {
                type $ty = i32;
                $body
            }
            $crate::storage::dtype::Dtype::F32 => {
                type $ty = f32;
                $body
            }
            $crate::storage::dtype::Dtype::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_dtype;
