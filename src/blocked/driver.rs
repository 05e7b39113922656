//! Five-loop blocked GEMM over one rectangular region of C.
//!
//! ```text
//! for jc in N step NC            pack B[pc, jc] once per (jc, pc)
//!   for pc in K step KC
//!     for ic in M step MC        pack A[ic, pc]
//!       for jr in jc step NR
//!         for ir in ic step MR   full tile -> micro-kernel
//!                                ragged    -> edge_tile
//! ```
//!
//! K sits outside M so one packed B block serves the whole M range before
//! it is replaced. Every loop clamps its last tile to `min(block, remaining)`.

use super::packing::pack_a;
use super::scratch::{Scratch, Workspace};
use super::tiling::{BlockIter, Tile};
use crate::kernels::MicroKernel;
use crate::kernels::edge::edge_tile;
use crate::matrix::view::{MatPtr, MatRef};

/// A rectangle of C: `rows` along M, `cols` along N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub rows: Tile,
    pub cols: Tile,
}

impl Region {
    pub fn new(rows: Tile, cols: Tile) -> Self {
        Self { rows, cols }
    }

    /// All of an `m × n` matrix.
    pub fn whole(m: usize, n: usize) -> Self {
        Self::new(Tile::new(0, m), Tile::new(0, n))
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        (self.rows.start..self.rows.end()).contains(&i)
            && (self.cols.start..self.cols.end()).contains(&j)
    }
}

/// C[region] += A[region.rows, ..] · B[.., region.cols] over the full depth.
///
/// # Safety
///
/// `region` lies inside C, and no other thread touches it during the call.
pub(crate) unsafe fn gemm_region<K: MicroKernel>(
    kernel: &K,
    a: &MatRef<'_>,
    b: &MatRef<'_>,
    c: MatPtr<'_>,
    region: Region,
    workspace: &mut Workspace,
) {
    match workspace {
        Workspace::Packed(scratch) => unsafe { blocked_region(kernel, a, b, c, region, scratch) },
        Workspace::Direct => unsafe { direct_region(a, b, c, region) },
    }
}

unsafe fn blocked_region<K: MicroKernel>(
    kernel: &K,
    a: &MatRef<'_>,
    b: &MatRef<'_>,
    c: MatPtr<'_>,
    region: Region,
    scratch: &mut Scratch,
) {
    let blocks = scratch.blocks();
    let k = a.cols();

    for jc in BlockIter::over(region.cols, blocks.nc) {
        for pc in BlockIter::new(k, blocks.kc) {
            scratch.pack_b(b, pc, jc, K::NR);

            for ic in BlockIter::over(region.rows, blocks.mc) {
                pack_a(a, ic, pc, K::MR, scratch.packed_a_mut());
                let (packed_a, packed_b) = scratch.panels();
                unsafe { macro_kernel(kernel, a, c, ic, jc, pc, packed_a, packed_b) };
            }
        }
    }
}

/// The two innermost loops over one packed (MC × KC, KC × NC) block pair.
#[allow(clippy::too_many_arguments)]
unsafe fn macro_kernel<K: MicroKernel>(
    kernel: &K,
    a: &MatRef<'_>,
    c: MatPtr<'_>,
    ic: Tile,
    jc: Tile,
    pc: Tile,
    packed_a: &[f32],
    packed_b: &[f32],
) {
    let kc = pc.len;
    let ldc = c.ld();

    for (jr, cols) in BlockIter::over(jc, K::NR).enumerate() {
        let b_panel = &packed_b[jr * K::NR * kc..(jr + 1) * K::NR * kc];

        for (ir, rows) in BlockIter::over(ic, K::MR).enumerate() {
            let c_tile = unsafe { c.at(rows.start, cols.start) };

            if rows.len == K::MR && cols.len == K::NR {
                let a_panel = &packed_a[ir * K::MR * kc..(ir + 1) * K::MR * kc];
                unsafe { kernel.execute(kc, a_panel.as_ptr(), b_panel.as_ptr(), c_tile, ldc) };
            } else {
                unsafe { edge_tile(a, rows, pc, b_panel, K::NR, cols.len, c_tile, ldc) };
            }
        }
    }
}

/// Unpacked scalar product for a worker that has no scratch.
///
/// Reads A and B in place; each C element accumulates in reduction order.
unsafe fn direct_region(a: &MatRef<'_>, b: &MatRef<'_>, c: MatPtr<'_>, region: Region) {
    for i in region.rows.start..region.rows.end() {
        let a_row = a.row(i);
        for j in region.cols.start..region.cols.end() {
            let c_ij = unsafe { c.at(i, j) };
            let mut sum = unsafe { *c_ij };
            for (p, &a_ip) in a_row.iter().enumerate() {
                sum += a_ip * b.at(p, j);
            }
            unsafe { *c_ij = sum };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockSizes;
    use crate::kernels::kernel_4x4::Scalar4x4;
    use crate::matrix::naive_ijk::matmul_naive_ijk;
    use crate::matrix::view::MatMut;

    fn run_region(
        m: usize,
        n: usize,
        k: usize,
        region: Region,
        workspace: &mut Workspace,
    ) -> (Vec<f32>, Vec<f32>) {
        let a: Vec<f32> = (0..m * k).map(|i| (i % 10) as f32).collect();
        let b: Vec<f32> = (0..k * n).map(|i| (i % 7) as f32).collect();
        let mut c = vec![0.0; m * n];

        {
            let a_ref = MatRef::new(&a, m, k, "A").unwrap();
            let b_ref = MatRef::new(&b, k, n, "B").unwrap();
            let mut c_mut = MatMut::new(&mut c, m, n, "C").unwrap();
            unsafe {
                gemm_region(&Scalar4x4, &a_ref, &b_ref, c_mut.as_ptr(), region, workspace);
            }
        }

        let mut expected = vec![0.0; m * n];
        matmul_naive_ijk(&a, &b, &mut expected, m, n, k);
        (c, expected)
    }

    #[test]
    fn test_blocked_whole_matrix_ragged_everywhere() {
        let (m, n, k) = (37, 41, 29);
        let blocks = BlockSizes::new(10, 18, 7);
        let mut ws = Workspace::Packed(Scratch::try_new(blocks, 4, 4, None).unwrap());
        let (c, expected) = run_region(m, n, k, Region::whole(m, n), &mut ws);
        // Same additions in the same order as i-j-k: bit-identical.
        assert_eq!(c, expected);
    }

    #[test]
    fn test_direct_whole_matrix() {
        let (m, n, k) = (13, 9, 17);
        let (c, expected) = run_region(m, n, k, Region::whole(m, n), &mut Workspace::Direct);
        assert_eq!(c, expected);
    }

    #[test]
    fn test_region_leaves_outside_untouched() {
        let (m, n, k) = (20, 20, 5);
        let region = Region::new(Tile::new(4, 9), Tile::new(3, 11));
        let mut ws = Workspace::Packed(Scratch::try_new(BlockSizes::SCALAR, 4, 4, None).unwrap());
        let (c, expected) = run_region(m, n, k, region, &mut ws);

        for i in 0..m {
            for j in 0..n {
                if region.contains(i, j) {
                    assert_eq!(c[i * n + j], expected[i * n + j], "({}, {})", i, j);
                } else {
                    assert_eq!(c[i * n + j], 0.0, "({}, {}) written outside region", i, j);
                }
            }
        }
    }
}
