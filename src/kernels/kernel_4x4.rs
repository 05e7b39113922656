//! Portable 4×4 scalar microkernel.

use super::MicroKernel;

/// Computes a 4×4 tile: C[0:4, 0:4] += A_packed × B_packed
///
/// Plain nested loops over a 4×4 accumulator array; no intrinsics. The
/// compiler is free to vectorize it, but it never fuses multiply and add,
/// so each C element sees exactly the additions of the naive i-j-k loop in
/// the same order. Every SIMD kernel is tested against this one.
///
/// # Safety
///
/// Caller must ensure:
/// - `a_pack` points to `k * 4` contiguous f32 values (packed A panel)
/// - `b_pack` points to `k * 4` contiguous f32 values (packed B panel)
/// - `c.add(row * ldc)` is valid for row in 0..4, each allowing read/write of 4 f32s
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::needless_range_loop)]
pub unsafe fn kernel_4x4_scalar(
    a_pack: *const f32,
    b_pack: *const f32,
    c: *mut f32,
    k: usize,
    ldc: usize,
) {
    let mut acc = [[0.0f32; 4]; 4];

    // Load existing C values (we accumulate, not overwrite)
    for i in 0..4 {
        for j in 0..4 {
            acc[i][j] = *c.add(i * ldc + j);
        }
    }

    for p in 0..k {
        let b_row = b_pack.add(p * 4);
        for i in 0..4 {
            let a_ip = *a_pack.add(p * 4 + i);
            for j in 0..4 {
                acc[i][j] += a_ip * *b_row.add(j);
            }
        }
    }

    for i in 0..4 {
        for j in 0..4 {
            *c.add(i * ldc + j) = acc[i][j];
        }
    }
}

/// The portable 4×4 kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scalar4x4;

impl MicroKernel for Scalar4x4 {
    const MR: usize = 4;
    const NR: usize = 4;
    const NAME: &'static str = "scalar 4x4";

    #[inline(always)]
    unsafe fn execute(&self, kc: usize, a: *const f32, b: *const f32, c: *mut f32, ldc: usize) {
        unsafe { kernel_4x4_scalar(a, b, c, kc, ldc) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::naive_ijk::matmul_naive_ijk;

    #[test]
    fn test_kernel_4x4_correctness() {
        let k = 16;
        let a: Vec<f32> = (0..4 * k).map(|i| (i % 7) as f32).collect();
        let b: Vec<f32> = (0..k * 4).map(|i| (i % 10) as f32).collect();
        let mut c = vec![1.0; 4 * 4];

        // Pack A: for each k position, store 4 consecutive row values
        let mut a_pack = vec![0.0; k * 4];
        for p in 0..k {
            for i in 0..4 {
                a_pack[p * 4 + i] = a[i * k + p];
            }
        }

        // B with 4 columns is already in packed order.
        unsafe {
            kernel_4x4_scalar(a_pack.as_ptr(), b.as_ptr(), c.as_mut_ptr(), k, 4);
        }

        let mut c_expected = vec![1.0; 4 * 4];
        matmul_naive_ijk(&a, &b, &mut c_expected, 4, 4, k);

        assert_eq!(c, c_expected);
    }

    #[test]
    fn test_kernel_4x4_strided_c() {
        // Tile in the middle of a 6-wide C; the border must stay untouched.
        let a_pack = [1.0f32, 2.0, 3.0, 4.0];
        let b_pack = [1.0f32, 10.0, 100.0, 1000.0];
        let mut c = vec![-1.0f32; 4 * 6];

        unsafe {
            kernel_4x4_scalar(a_pack.as_ptr(), b_pack.as_ptr(), c.as_mut_ptr().add(1), 1, 6);
        }

        for i in 0..4 {
            assert_eq!(c[i * 6], -1.0);
            assert_eq!(c[i * 6 + 5], -1.0);
            for j in 0..4 {
                assert_eq!(c[i * 6 + 1 + j], -1.0 + a_pack[i] * b_pack[j]);
            }
        }
    }

    #[test]
    fn test_zero_depth_is_identity() {
        let mut c: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let before = c.clone();
        unsafe {
            Scalar4x4.execute(0, std::ptr::null(), std::ptr::null(), c.as_mut_ptr(), 4);
        }
        assert_eq!(c, before);
    }
}
