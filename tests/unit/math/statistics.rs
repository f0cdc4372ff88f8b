//! Tests for median reductions over buffers and voxel stacks

#[cfg(test)]
mod tests {
    use volreg::math::statistics::{median_along_stack, median_mut};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    // Tests odd-length buffers return the middle value
    // Verified by selecting the lower neighbour
    #[test]
    fn test_median_odd_length() {
        let mut values = vec![9.0, 1.0, 5.0, 3.0, 7.0];
        assert_close(median_mut(&mut values).expect("Non-empty buffer"), 5.0);
    }

    // Tests even-length buffers average the two middle values
    // Verified by returning the upper middle value
    #[test]
    fn test_median_even_length() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_close(median_mut(&mut values).expect("Non-empty buffer"), 2.5);

        let mut pair = vec![10.0, -10.0];
        assert_close(median_mut(&mut pair).expect("Non-empty buffer"), 0.0);
    }

    // Tests duplicates and a single element
    // Verified by deduplicating before selection
    #[test]
    fn test_median_duplicates_and_single() {
        let mut values = vec![2.0, 2.0, 2.0, 8.0];
        assert_close(median_mut(&mut values).expect("Non-empty buffer"), 2.0);

        let mut single = vec![42.0];
        assert_close(median_mut(&mut single).expect("Non-empty buffer"), 42.0);
    }

    // Tests empty buffers have no median
    // Verified by returning zero for empty input
    #[test]
    fn test_median_empty() {
        assert!(median_mut(&mut []).is_none());
    }

    // Tests any NaN in the buffer makes the median NaN
    // Verified by ordering NaN after every number
    #[test]
    fn test_median_nan_propagates() {
        let mut odd = vec![f64::NAN, 1.0, 2.0];
        let mut even = vec![4.0, 1.0, f64::NAN, 3.0];

        assert!(median_mut(&mut odd).expect("Non-empty buffer").is_nan());
        assert!(median_mut(&mut even).expect("Non-empty buffer").is_nan());
    }

    // Tests a NaN voxel in one slot only poisons that voxel
    // Verified by sharing the gather buffer without clearing it
    #[test]
    fn test_median_along_stack_nan_voxel() {
        // Three 1x1x2 volumes; voxel 0 of slot 1 is NaN
        let stack: Vec<f32> = vec![
            1.0, 5.0, // slot 0
            f32::NAN, 6.0, // slot 1
            3.0, 7.0, // slot 2
        ];

        let median = median_along_stack(&stack, 3, [1, 1, 2]).expect("Consistent stack");

        assert!(median[[0, 0, 0]].is_nan());
        assert_close(median[[0, 0, 1]], 6.0);
    }

    // Tests the reduction runs per voxel across the stack axis
    // Verified by reducing along X instead of N
    #[test]
    fn test_median_along_stack_per_voxel() {
        // Three 1x2x2 volumes; voxel v of slot n holds a distinct value
        let stack: Vec<u16> = vec![
            1, 10, 100, 7, // slot 0
            3, 30, 300, 8, // slot 1
            2, 20, 200, 9, // slot 2
        ];

        let median = median_along_stack(&stack, 3, [1, 2, 2]).expect("Valid stack");

        assert_eq!(median.dim(), (1, 2, 2));
        let values: Vec<f64> = median.iter().copied().collect();
        assert_eq!(values, vec![2.0, 20.0, 200.0, 8.0]);
    }

    // Tests reduction over many rows uses the right voxel offsets in every row
    // Verified by resetting the row offset per worker
    #[test]
    fn test_median_along_stack_many_rows() {
        let shape = [3, 17, 5];
        let voxels = 3 * 17 * 5;
        let stack: Vec<f32> = (0..4)
            .flat_map(|slot| (0..voxels).map(move |v| (v * 10 + slot) as f32))
            .collect();

        let median = median_along_stack(&stack, 4, shape).expect("Valid stack");

        for (v, value) in median.iter().enumerate() {
            // Slots hold v*10 + {0,1,2,3}; the midpoint of 1 and 2 is 1.5
            assert_close(*value, (v * 10) as f64 + 1.5);
        }
    }

    // Tests mismatched lengths and empty stacks are refused
    // Verified by truncating the stack silently
    #[test]
    fn test_median_along_stack_invalid() {
        let stack = vec![1_u8; 10];

        assert!(median_along_stack(&stack, 3, [1, 2, 2]).is_none());
        assert!(median_along_stack::<u8>(&[], 0, [1, 2, 2]).is_none());
    }
}
