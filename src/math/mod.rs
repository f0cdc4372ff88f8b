//! Numerical reductions used by the aggregation stage

/// Median and other order statistics over voxel stacks
pub mod statistics;
