//! 6×16 AVX2 microkernel for single-precision matrix multiplication.

use super::MicroKernel;

/// Computes a 6×16 tile: C[0:6, 0:16] += A_packed × B_packed
///
/// Each row of C spans two YMM registers (2 × 8 f32), so the tile keeps
/// 12 accumulators live. Per reduction step it loads one 16-wide row of
/// packed B into two registers and broadcasts 6 values of A, leaving
/// 2 of the 16 YMM registers for the B row and 2 for broadcasts.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2 and FMA (checked via `#[target_feature]`)
/// - `a_pack` points to `k * 6` contiguous f32 values (packed A panel)
/// - `b_pack` points to `k * 16` contiguous f32 values (packed B panel)
/// - `c.add(row * ldc)` is valid for row in 0..6, each allowing read/write of 16 f32s
#[target_feature(enable = "avx2,fma")]
#[allow(clippy::identity_op)]
#[allow(clippy::erasing_op)]
#[allow(unsafe_op_in_unsafe_fn)]
pub unsafe fn kernel_6x16_avx2(
    a_pack: *const f32,
    b_pack: *const f32,
    c: *mut f32,
    k: usize,
    ldc: usize,
) {
    use std::arch::x86_64::*;

    // Two accumulators per output row: columns 0..8 and 8..16
    let mut c00 = _mm256_loadu_ps(c.add(0 * ldc));
    let mut c01 = _mm256_loadu_ps(c.add(0 * ldc + 8));
    let mut c10 = _mm256_loadu_ps(c.add(1 * ldc));
    let mut c11 = _mm256_loadu_ps(c.add(1 * ldc + 8));
    let mut c20 = _mm256_loadu_ps(c.add(2 * ldc));
    let mut c21 = _mm256_loadu_ps(c.add(2 * ldc + 8));
    let mut c30 = _mm256_loadu_ps(c.add(3 * ldc));
    let mut c31 = _mm256_loadu_ps(c.add(3 * ldc + 8));
    let mut c40 = _mm256_loadu_ps(c.add(4 * ldc));
    let mut c41 = _mm256_loadu_ps(c.add(4 * ldc + 8));
    let mut c50 = _mm256_loadu_ps(c.add(5 * ldc));
    let mut c51 = _mm256_loadu_ps(c.add(5 * ldc + 8));

    for p in 0..k {
        let b0 = _mm256_loadu_ps(b_pack.add(p * 16));
        let b1 = _mm256_loadu_ps(b_pack.add(p * 16 + 8));
        let a = a_pack.add(p * 6);

        let a0 = _mm256_broadcast_ss(&*a.add(0));
        let a1 = _mm256_broadcast_ss(&*a.add(1));
        c00 = _mm256_fmadd_ps(a0, b0, c00);
        c01 = _mm256_fmadd_ps(a0, b1, c01);
        c10 = _mm256_fmadd_ps(a1, b0, c10);
        c11 = _mm256_fmadd_ps(a1, b1, c11);

        let a2 = _mm256_broadcast_ss(&*a.add(2));
        let a3 = _mm256_broadcast_ss(&*a.add(3));
        c20 = _mm256_fmadd_ps(a2, b0, c20);
        c21 = _mm256_fmadd_ps(a2, b1, c21);
        c30 = _mm256_fmadd_ps(a3, b0, c30);
        c31 = _mm256_fmadd_ps(a3, b1, c31);

        let a4 = _mm256_broadcast_ss(&*a.add(4));
        let a5 = _mm256_broadcast_ss(&*a.add(5));
        c40 = _mm256_fmadd_ps(a4, b0, c40);
        c41 = _mm256_fmadd_ps(a4, b1, c41);
        c50 = _mm256_fmadd_ps(a5, b0, c50);
        c51 = _mm256_fmadd_ps(a5, b1, c51);
    }

    _mm256_storeu_ps(c.add(0 * ldc), c00);
    _mm256_storeu_ps(c.add(0 * ldc + 8), c01);
    _mm256_storeu_ps(c.add(1 * ldc), c10);
    _mm256_storeu_ps(c.add(1 * ldc + 8), c11);
    _mm256_storeu_ps(c.add(2 * ldc), c20);
    _mm256_storeu_ps(c.add(2 * ldc + 8), c21);
    _mm256_storeu_ps(c.add(3 * ldc), c30);
    _mm256_storeu_ps(c.add(3 * ldc + 8), c31);
    _mm256_storeu_ps(c.add(4 * ldc), c40);
    _mm256_storeu_ps(c.add(4 * ldc + 8), c41);
    _mm256_storeu_ps(c.add(5 * ldc), c50);
    _mm256_storeu_ps(c.add(5 * ldc + 8), c51);
}

/// The AVX2 6×16 kernel. Only constructible when AVX2 and FMA are present.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel6x16 {
    _detected: (),
}

impl Avx2Kernel6x16 {
    pub fn new() -> Option<Self> {
        (is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma"))
            .then_some(Self { _detected: () })
    }
}

impl MicroKernel for Avx2Kernel6x16 {
    const MR: usize = 6;
    const NR: usize = 16;
    const NAME: &'static str = "avx2 6x16";

    #[inline(always)]
    unsafe fn execute(&self, kc: usize, a: *const f32, b: *const f32, c: *mut f32, ldc: usize) {
        // SAFETY: `self` exists only if AVX2 and FMA were detected.
        unsafe { kernel_6x16_avx2(a, b, c, kc, ldc) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::compare::max_rel_error;
    use crate::matrix::naive_ijk::matmul_naive_ijk;

    #[test]
    fn test_kernel_6x16_correctness() {
        let Some(kernel) = Avx2Kernel6x16::new() else {
            println!("Skipping - AVX2/FMA not available");
            return;
        };

        let k = 37;
        let a: Vec<f32> = (0..6 * k).map(|i| (i % 13) as f32 * 0.25).collect();
        let b: Vec<f32> = (0..k * 16).map(|i| (i % 10) as f32 - 4.5).collect();
        let mut c = vec![0.5; 6 * 16];

        let mut a_pack = vec![0.0; k * 6];
        for p in 0..k {
            for i in 0..6 {
                a_pack[p * 6 + i] = a[i * k + p];
            }
        }

        // B with 16 columns is already in packed order.
        unsafe {
            kernel.execute(k, a_pack.as_ptr(), b.as_ptr(), c.as_mut_ptr(), 16);
        }

        let mut c_expected = vec![0.5; 6 * 16];
        matmul_naive_ijk(&a, &b, &mut c_expected, 6, 16, k);

        let err = max_rel_error(&c_expected, &c);
        assert!(err < 1e-5, "max relative error {}", err);
    }
}
