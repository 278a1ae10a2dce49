//! GPU buffer error types (§7).

use thiserror::Error;

/// Errors raised by the buffer abstraction and pool.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Requested capacity exceeds `device.max_buffer_length`.
    #[error("capacity {requested} exceeds device maximum {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// The backing device refused the allocation.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// Invalid state (e.g. writing past an unresized buffer's capacity).
    #[error("invalid buffer state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
