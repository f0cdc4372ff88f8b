//! Tests for element type tags and typed volume access

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use volreg::io::volume::Volume;
    use volreg::storage::dtype::{Dtype, Element};

    // Tests element sizes match the Rust scalar sizes
    // Verified by giving float32 a size of eight
    #[test]
    fn test_sizes() {
        assert_eq!(Dtype::U8.size(), size_of::<u8>());
        assert_eq!(Dtype::U16.size(), size_of::<u16>());
        assert_eq!(Dtype::I32.size(), size_of::<i32>());
        assert_eq!(Dtype::F32.size(), size_of::<f32>());
        assert_eq!(Dtype::F64.size(), size_of::<f64>());
    }

    // Tests every element type is listed once
    // Verified by listing uint16 twice
    #[test]
    fn test_all_lists_each_type_once() {
        for (i, dtype) in Dtype::ALL.iter().enumerate() {
            assert!(!Dtype::ALL.iter().skip(i + 1).any(|other| other == dtype));
        }
        assert!(Dtype::ALL.contains(&Dtype::U16));
        assert!(Dtype::ALL.contains(&Dtype::F64));
    }

    // Tests NumPy-style display names
    // Verified by printing the variant name instead
    #[test]
    fn test_display() {
        assert_eq!(Dtype::U16.to_string(), "uint16");
        assert_eq!(Dtype::I16.to_string(), "int16");
        assert_eq!(Dtype::F64.to_string(), "float64");
    }

    // Tests typed views only match their own variant
    // Verified by viewing any volume as u16
    #[test]
    fn test_element_view_and_wrap() {
        let volume = u16::wrap(Array3::from_elem((1, 2, 2), 9));

        assert_eq!(volume.dtype(), u16::DTYPE);
        assert!(u16::view(&volume).is_some());
        assert!(u8::view(&volume).is_none());
        assert!(f32::view(&Volume::F64(Array3::zeros((1, 1, 1)))).is_none());
        assert_eq!(f64::DTYPE, Dtype::F64);
    }
}
