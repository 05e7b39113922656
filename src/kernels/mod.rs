//! Micro-kernels for the innermost loop of the blocked GEMM.
//!
//! A micro-kernel computes one full MR×NR tile, `C += A_panel · B_panel`,
//! from an MR-interleaved packed A panel and an NR-wide packed B panel. It
//! loads the C tile once, runs `kc` broadcast-multiply-add steps on
//! register accumulators and stores the tile once.
//!
//! Available kernels:
//! - `kernel_4x4`: portable scalar 4×4, the reference the others must match
//! - `kernel_6x16`: 6×16 AVX2 + FMA (12 YMM accumulators, two per row)
//! - `kernel_8x16`: 8×16 AVX-512F (8 ZMM accumulators)
//! - `kernel_8x8`: 8×8 NEON (16 Q accumulators, two per row)
//!
//! Tiles cut short by the matrix edge never reach these kernels; they go
//! through `edge`.

pub mod edge;
pub mod kernel_4x4;
#[cfg(target_arch = "x86_64")]
pub mod kernel_6x16;
#[cfg(target_arch = "x86_64")]
pub mod kernel_8x16;
#[cfg(target_arch = "aarch64")]
pub mod kernel_8x8;

use crate::config::KernelChoice;
use std::sync::OnceLock;

/// A register-blocked `MR × NR` inner product.
///
/// Implementations that need CPU features can only be constructed after
/// the features were detected, so holding a value is proof the kernel may
/// run.
pub trait MicroKernel: Copy + Send + Sync {
    /// Rows of the C tile.
    const MR: usize;
    /// Columns of the C tile.
    const NR: usize;
    const NAME: &'static str;

    /// `C[0..MR, 0..NR] += A_panel · B_panel`.
    ///
    /// # Safety
    ///
    /// - `a` points to `kc * MR` packed values (MR per reduction step)
    /// - `b` points to `kc * NR` packed values (NR per reduction step)
    /// - `c.add(i * ldc)` is valid for reading and writing `NR` values for
    ///   every `i` in `0..MR`
    unsafe fn execute(&self, kc: usize, a: *const f32, b: *const f32, c: *mut f32, ldc: usize);
}

static DETECTED: OnceLock<KernelChoice> = OnceLock::new();

/// Best kernel for this CPU (AVX-512 > AVX2 > NEON > scalar), cached.
pub fn detect() -> KernelChoice {
    *DETECTED.get_or_init(|| {
        let choice = [KernelChoice::Avx512, KernelChoice::Avx2, KernelChoice::Neon]
            .into_iter()
            .find(|&choice| is_supported(choice))
            .unwrap_or(KernelChoice::Scalar);
        log::debug!("detected micro-kernel: {:?}", choice);
        choice
    })
}

/// Whether `choice` can run on this CPU.
pub fn is_supported(choice: KernelChoice) -> bool {
    match choice {
        KernelChoice::Auto | KernelChoice::Scalar => true,
        #[cfg(target_arch = "x86_64")]
        KernelChoice::Avx2 => {
            is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
        }
        #[cfg(target_arch = "x86_64")]
        KernelChoice::Avx512 => is_x86_feature_detected!("avx512f"),
        #[cfg(target_arch = "aarch64")]
        KernelChoice::Neon => std::arch::is_aarch64_feature_detected!("neon"),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_kernel_is_supported() {
        let choice = detect();
        assert_ne!(choice, KernelChoice::Auto);
        assert!(is_supported(choice));
    }

    #[test]
    fn test_scalar_always_supported() {
        assert!(is_supported(KernelChoice::Scalar));
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[test]
    fn test_x86_kernels_unsupported_elsewhere() {
        assert!(!is_supported(KernelChoice::Avx2));
        assert!(!is_supported(KernelChoice::Avx512));
    }
}
