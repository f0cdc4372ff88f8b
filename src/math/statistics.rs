//! Order statistics over voxel stacks

use ndarray::Array3;
use num_traits::AsPrimitive;
use rayon::prelude::*;

/// Median of a buffer, reordering it in place
///
/// Even-length buffers yield the mean of the two middle values. A single NaN makes
/// the median NaN. Returns `None` for an empty buffer.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|value| value.is_nan()) {
        return Some(f64::NAN);
    }

    let len = values.len();
    let (lower, upper_middle, _) = values.select_nth_unstable_by(len / 2, f64::total_cmp);
    let upper_middle = *upper_middle;

    if len.is_multiple_of(2) {
        let lower_middle = lower.iter().copied().max_by(f64::total_cmp)?;
        Some(f64::midpoint(lower_middle, upper_middle))
    } else {
        Some(upper_middle)
    }
}

/// Voxel-wise median across a stack laid out as `[N, Z, Y, X]` in C order
///
/// `stack` holds `stack_len` consecutive volumes of `shape` each. Rows of the output
/// are reduced in parallel; each worker reuses one gather buffer.
/// Returns `None` when the stack is empty or `stack` has the wrong length.
pub fn median_along_stack<T>(stack: &[T], stack_len: usize, shape: [usize; 3]) -> Option<Array3<f64>>
where
    T: AsPrimitive<f64> + Sync,
{
    let [depth, height, width] = shape;
    let voxels = depth * height * width;
    if stack_len == 0 || stack.len() != stack_len * voxels {
        return None;
    }

    let mut output = vec![0.0_f64; voxels];
    let row_len = width.max(1);

    output
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each_init(
            || vec![0.0_f64; stack_len],
            |values, (row, row_output)| {
                let row_offset = row * row_len;
                for (column, out) in row_output.iter_mut().enumerate() {
                    let voxel = row_offset + column;
                    for (slot, value) in values.iter_mut().enumerate() {
                        *value = stack
                            .get(slot * voxels + voxel)
                            .copied()
                            .map_or(f64::NAN, AsPrimitive::as_);
                    }
                    *out = median_mut(values).unwrap_or(f64::NAN);
                }
            },
        );

    Array3::from_shape_vec((depth, height, width), output).ok()
}
