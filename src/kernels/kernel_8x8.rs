//! 8×8 NEON microkernel for single-precision matrix multiplication.

use super::MicroKernel;

/// Computes an 8×8 tile: C[0:8, 0:8] += A_packed × B_packed
///
/// A NEON Q register holds 4 f32, so every row of C takes two registers
/// and the tile keeps 16 of the 32 vector registers as accumulators. The
/// accumulator array is indexed with constants only and lives entirely in
/// registers after unrolling.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports NEON
/// - `a_pack` points to `k * 8` contiguous f32 values (packed A panel)
/// - `b_pack` points to `k * 8` contiguous f32 values (packed B panel)
/// - `c.add(row * ldc)` is valid for row in 0..8, each allowing read/write of 8 f32s
#[target_feature(enable = "neon")]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::needless_range_loop)]
pub unsafe fn kernel_8x8_neon(
    a_pack: *const f32,
    b_pack: *const f32,
    c: *mut f32,
    k: usize,
    ldc: usize,
) {
    use std::arch::aarch64::*;

    let mut lo = [vdupq_n_f32(0.0); 8];
    let mut hi = [vdupq_n_f32(0.0); 8];
    for i in 0..8 {
        lo[i] = vld1q_f32(c.add(i * ldc));
        hi[i] = vld1q_f32(c.add(i * ldc + 4));
    }

    for p in 0..k {
        let b0 = vld1q_f32(b_pack.add(p * 8));
        let b1 = vld1q_f32(b_pack.add(p * 8 + 4));
        for i in 0..8 {
            let a_ip = vdupq_n_f32(*a_pack.add(p * 8 + i));
            lo[i] = vfmaq_f32(lo[i], a_ip, b0);
            hi[i] = vfmaq_f32(hi[i], a_ip, b1);
        }
    }

    for i in 0..8 {
        vst1q_f32(c.add(i * ldc), lo[i]);
        vst1q_f32(c.add(i * ldc + 4), hi[i]);
    }
}

/// The NEON 8×8 kernel.
#[derive(Debug, Clone, Copy)]
pub struct NeonKernel8x8 {
    _detected: (),
}

impl NeonKernel8x8 {
    pub fn new() -> Option<Self> {
        std::arch::is_aarch64_feature_detected!("neon").then_some(Self { _detected: () })
    }
}

impl MicroKernel for NeonKernel8x8 {
    const MR: usize = 8;
    const NR: usize = 8;
    const NAME: &'static str = "neon 8x8";

    #[inline(always)]
    unsafe fn execute(&self, kc: usize, a: *const f32, b: *const f32, c: *mut f32, ldc: usize) {
        // SAFETY: `self` exists only if NEON was detected.
        unsafe { kernel_8x8_neon(a, b, c, kc, ldc) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::naive_ijk::matmul_naive_ijk;

    #[test]
    fn test_kernel_8x8_correctness() {
        let Some(kernel) = NeonKernel8x8::new() else {
            println!("Skipping - NEON not available");
            return;
        };

        let k = 16;
        let a: Vec<f32> = (0..8 * k).map(|i| (i % 10) as f32).collect();
        let b: Vec<f32> = (0..k * 8).map(|i| (i % 10) as f32).collect();
        let mut c = vec![0.0; 8 * 8];

        let mut a_pack = vec![0.0; k * 8];
        for p in 0..k {
            for i in 0..8 {
                a_pack[p * 8 + i] = a[i * k + p];
            }
        }

        unsafe {
            kernel.execute(k, a_pack.as_ptr(), b.as_ptr(), c.as_mut_ptr(), 8);
        }

        let mut c_expected = vec![0.0; 8 * 8];
        matmul_naive_ijk(&a, &b, &mut c_expected, 8, 8, k);
        assert_eq!(c, c_expected);
    }
}
