//! Disk-backed array storage

/// Element types shared by volumes and arrays
pub mod dtype;
/// Memory-mapped array handles and open modes
pub mod memmap;
