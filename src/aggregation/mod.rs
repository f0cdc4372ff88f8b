//! Median aggregation of registered volumes

/// Disk-backed stacking and median reduction
pub mod stack;
