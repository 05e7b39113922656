//! Single-precision matrix multiplication, blocked the way BLAS does it.
//!
//! The fast path is the classic five-loop design: tile N, K and M for the
//! cache hierarchy, pack each operand block into the order the micro-kernel
//! reads it, and let a register-blocked kernel (AVX2, AVX-512, NEON or
//! portable scalar) do the multiply-adds. Every edge tile that doesn't
//! fill a whole kernel goes through a scalar path, so any shape works.
//!
//! ## Usage
//!
//! ```
//! use sgemm::gemm;
//!
//! // [[1, 2, 3], [4, 5, 6]] · [[7, 8], [9, 10], [11, 12]]
//! let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
//! let mut c = [0.0f32; 4];
//!
//! gemm(&a, &b, &mut c, 2, 2, 3).unwrap();
//! assert_eq!(c, [58.0, 64.0, 139.0, 154.0]);
//! ```
//!
//! For large matrices, spread the work over threads:
//!
//! ```
//! use sgemm::{gemm_with, GemmConfig, Schedule};
//!
//! let n = 300;
//! let a = vec![1.0f32; n * n];
//! let b = vec![1.0f32; n * n];
//! let mut c = vec![0.0f32; n * n];
//!
//! let config = GemmConfig::new().threads(4).schedule(Schedule::Static);
//! gemm_with(&a, &b, &mut c, n, n, n, &config).unwrap();
//! assert!(c.iter().all(|&x| x == n as f32));
//! ```
//!
//! ## What's inside
//!
//! - 4×4 scalar, 6×16 AVX2+FMA, 8×16 AVX-512 and 8×8 NEON micro-kernels
//! - MC/NC/KC cache blocking with packed, zero-padded panels
//! - Static or dynamic multi-threading over disjoint tiles of C
//! - Graceful fallback when scratch memory or an offload device fails

pub mod backend;
pub mod blocked;
pub mod config;
pub mod error;
pub mod instrument;
pub mod kernels;
pub mod matrix;
pub mod threaded;

pub use backend::{Backend, Device, HostDevice, gemm_on_device};
pub use config::{AllocPolicy, BlockSizes, GemmConfig, KernelChoice, Schedule};
pub use error::{GemmError, Result};
pub use instrument::PerfCounters;
pub use kernels::MicroKernel;
pub use matrix::naive_ijk::matmul_naive_ijk;
pub use matrix::naive_ikj::matmul_naive_ikj;

use kernels::kernel_4x4::Scalar4x4;
use matrix::view::validate;

/// Matrix multiply: C = A · B
///
/// Picks the fastest kernel for your CPU and runs on the calling thread.
/// Matrices are row-major: A is m×k, B is k×n, C is m×n. Every element of
/// C is overwritten; with `k == 0` that means zero.
///
/// # Errors
///
/// [`GemmError::InvalidShape`] if a slice length doesn't match its
/// dimensions. C is untouched in that case.
pub fn gemm(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) -> Result<()> {
    gemm_with(a, b, c, m, n, k, &GemmConfig::default())
}

/// Accumulating multiply: C += A · B
///
/// Same as [`gemm`], but the product is added onto what C already holds.
pub fn gemm_acc(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) -> Result<()> {
    execute(a, b, c, m, n, k, &GemmConfig::default(), false)
}

/// C = A · B with an explicit kernel, block sizes, threading and
/// allocation policy.
///
/// # Errors
///
/// Besides shape errors: [`GemmError::UnsupportedKernel`] when the requested
/// kernel can't run here, [`GemmError::InvalidConfig`] for zero block sizes,
/// and [`GemmError::Allocation`] under [`AllocPolicy::Fail`]. All of them
/// are raised before C is written.
pub fn gemm_with(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    config: &GemmConfig,
) -> Result<()> {
    execute(a, b, c, m, n, k, config, true)
}

/// Same as [`gemm`] but uses up to `threads` workers (0 = decide from the
/// problem size), handing out tiles dynamically.
pub fn gemm_parallel(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    threads: usize,
) -> Result<()> {
    let config = GemmConfig::new()
        .threads(threads)
        .schedule(Schedule::Dynamic);
    gemm_with(a, b, c, m, n, k, &config)
}

/// [`gemm_with`], returning the counters sampled right before and right
/// after the call.
pub fn gemm_instrumented(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    config: &GemmConfig,
) -> Result<(PerfCounters, PerfCounters)> {
    let before = PerfCounters::now();
    gemm_with(a, b, c, m, n, k, config)?;
    let after = PerfCounters::now();

    let spent = after.delta(&before);
    log::trace!(
        "sgemm {}x{}x{}: {} cycles, {} instructions",
        m,
        n,
        k,
        spent.cycles,
        spent.instructions
    );
    Ok((before, after))
}

#[allow(clippy::too_many_arguments)]
fn execute(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    config: &GemmConfig,
    overwrite: bool,
) -> Result<()> {
    let (a, b, mut c) = validate(a, b, c, m, n, k)?;

    let choice = config.kernel.resolve();
    if !kernels::is_supported(choice) {
        return Err(GemmError::UnsupportedKernel(choice));
    }
    let blocks = config.blocks.unwrap_or_else(|| choice.default_blocks());
    blocks.validate()?;

    // Empty sums: nothing to read from A or B.
    if m == 0 || n == 0 {
        return Ok(());
    }
    if k == 0 {
        if overwrite {
            c.fill_zero();
        }
        return Ok(());
    }

    match choice {
        KernelChoice::Auto | KernelChoice::Scalar => {
            threaded::dispatch::run(Scalar4x4, &a, &b, &mut c, config, blocks, overwrite)
        }
        #[cfg(target_arch = "x86_64")]
        KernelChoice::Avx2 => {
            let kernel = kernels::kernel_6x16::Avx2Kernel6x16::new()
                .ok_or(GemmError::UnsupportedKernel(choice))?;
            threaded::dispatch::run(kernel, &a, &b, &mut c, config, blocks, overwrite)
        }
        #[cfg(target_arch = "x86_64")]
        KernelChoice::Avx512 => {
            let kernel = kernels::kernel_8x16::Avx512Kernel8x16::new()
                .ok_or(GemmError::UnsupportedKernel(choice))?;
            threaded::dispatch::run(kernel, &a, &b, &mut c, config, blocks, overwrite)
        }
        #[cfg(target_arch = "aarch64")]
        KernelChoice::Neon => {
            let kernel = kernels::kernel_8x8::NeonKernel8x8::new()
                .ok_or(GemmError::UnsupportedKernel(choice))?;
            threaded::dispatch::run(kernel, &a, &b, &mut c, config, blocks, overwrite)
        }
        #[allow(unreachable_patterns)]
        other => Err(GemmError::UnsupportedKernel(other)),
    }
}
