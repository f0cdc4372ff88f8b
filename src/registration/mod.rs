//! Driving the external registration engine

/// Batch registration of a directory against a seed volume
pub mod batch;
/// Single engine invocation and result lookup
pub mod invoker;
/// Parameter-file chains and result naming
pub mod parameters;
