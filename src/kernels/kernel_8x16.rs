//! 8×16 AVX-512 microkernel for single-precision matrix multiplication.

use super::MicroKernel;

/// Computes an 8×16 tile: C[0:8, 0:16] += A_packed × B_packed
///
/// One ZMM register (16 f32) holds a full row of the tile, so 8 registers
/// accumulate 128 outputs. Per reduction step one load of packed B feeds
/// 8 broadcast FMAs.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F (checked via `#[target_feature]`)
/// - `a_pack` points to `k * 8` contiguous f32 values (packed A panel)
/// - `b_pack` points to `k * 16` contiguous f32 values (packed B panel)
/// - `c.add(row * ldc)` is valid for row in 0..8, each allowing read/write of 16 f32s
#[target_feature(enable = "avx512f")]
#[allow(clippy::identity_op)]
#[allow(clippy::erasing_op)]
#[allow(unsafe_op_in_unsafe_fn)]
pub unsafe fn kernel_8x16_avx512(
    a_pack: *const f32,
    b_pack: *const f32,
    c: *mut f32,
    k: usize,
    ldc: usize,
) {
    use std::arch::x86_64::*;

    let mut c0 = _mm512_loadu_ps(c.add(0 * ldc));
    let mut c1 = _mm512_loadu_ps(c.add(1 * ldc));
    let mut c2 = _mm512_loadu_ps(c.add(2 * ldc));
    let mut c3 = _mm512_loadu_ps(c.add(3 * ldc));
    let mut c4 = _mm512_loadu_ps(c.add(4 * ldc));
    let mut c5 = _mm512_loadu_ps(c.add(5 * ldc));
    let mut c6 = _mm512_loadu_ps(c.add(6 * ldc));
    let mut c7 = _mm512_loadu_ps(c.add(7 * ldc));

    for p in 0..k {
        let b_vec = _mm512_loadu_ps(b_pack.add(p * 16));

        c0 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 0)), b_vec, c0);
        c1 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 1)), b_vec, c1);
        c2 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 2)), b_vec, c2);
        c3 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 3)), b_vec, c3);
        c4 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 4)), b_vec, c4);
        c5 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 5)), b_vec, c5);
        c6 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 6)), b_vec, c6);
        c7 = _mm512_fmadd_ps(_mm512_set1_ps(*a_pack.add(p * 8 + 7)), b_vec, c7);
    }

    _mm512_storeu_ps(c.add(0 * ldc), c0);
    _mm512_storeu_ps(c.add(1 * ldc), c1);
    _mm512_storeu_ps(c.add(2 * ldc), c2);
    _mm512_storeu_ps(c.add(3 * ldc), c3);
    _mm512_storeu_ps(c.add(4 * ldc), c4);
    _mm512_storeu_ps(c.add(5 * ldc), c5);
    _mm512_storeu_ps(c.add(6 * ldc), c6);
    _mm512_storeu_ps(c.add(7 * ldc), c7);
}

/// The AVX-512 8×16 kernel. Only constructible when AVX-512F is present.
#[derive(Debug, Clone, Copy)]
pub struct Avx512Kernel8x16 {
    _detected: (),
}

impl Avx512Kernel8x16 {
    pub fn new() -> Option<Self> {
        is_x86_feature_detected!("avx512f").then_some(Self { _detected: () })
    }
}

impl MicroKernel for Avx512Kernel8x16 {
    const MR: usize = 8;
    const NR: usize = 16;
    const NAME: &'static str = "avx512 8x16";

    #[inline(always)]
    unsafe fn execute(&self, kc: usize, a: *const f32, b: *const f32, c: *mut f32, ldc: usize) {
        // SAFETY: `self` exists only if AVX-512F was detected.
        unsafe { kernel_8x16_avx512(a, b, c, kc, ldc) }
    }
}
