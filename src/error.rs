//! Error types for GEMM calls.

use crate::config::KernelChoice;
use thiserror::Error;

/// Everything that can stop a GEMM call from producing C.
///
/// Shape and configuration errors are reported before C is touched.
#[derive(Debug, Error)]
pub enum GemmError {
    /// A slice length does not match the declared dimensions.
    #[error("{operand}: expected {expected} elements, got {actual}")]
    InvalidShape {
        operand: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `m * k`, `k * n` or `m * n` does not fit in `usize`.
    #[error("dimension product overflows usize (m={m}, n={n}, k={k})")]
    DimensionOverflow { m: usize, n: usize, k: usize },

    /// Block sizes or worker count make no sense.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A packing scratch buffer could not be obtained.
    #[error("failed to allocate packing scratch of {elements} f32 elements")]
    Allocation { elements: usize },

    /// An explicitly requested kernel cannot run on this CPU.
    #[error("kernel {0:?} is not supported on this CPU")]
    UnsupportedKernel(KernelChoice),

    /// The dedicated worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An offload device failed; only seen by `Device` implementations.
    #[error("device error: {0}")]
    Device(String),
}

/// Result type for GEMM calls.
pub type Result<T> = std::result::Result<T, GemmError>;
