//! Seed-based batch registration of 3-D microscopy volumes
//!
//! Every volume of a directory is aligned to a chosen seed volume by an external
//! registration engine. The registered volumes are then stacked into a disk-backed
//! `[N, Z, Y, X]` array and reduced to a voxel-wise median volume.

/// Stacking of registered volumes and median aggregation
pub mod aggregation;
/// Input/output operations and error handling
pub mod io;
/// Statistical reductions over volume stacks
pub mod math;
/// Registration engine invocation and batch orchestration
pub mod registration;
/// Disk-backed arrays and element types
pub mod storage;

pub use io::error::{Result, VolregError};
