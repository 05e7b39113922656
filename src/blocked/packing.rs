//! Operand packing.
//!
//! Packing copies a block of A or B into scratch in the exact order the
//! micro-kernel reads it, so each reduction step is one contiguous load.
//! It is pure data movement: values are copied bit for bit and the slots
//! past a ragged edge are zero-filled, nothing else.
//!
//! ```text
//! B block (kc=3, nc=6), nr=4:
//! [ b00 b01 b02 b03 b04 b05 ]
//! [ b10 b11 b12 b13 b14 b15 ]
//! [ b20 b21 b22 b23 b24 b25 ]
//!
//! packed: b00 b01 b02 b03 | b10 b11 b12 b13 | b20 b21 b22 b23   (panel 0)
//!         b04 b05 0   0   | b14 b15 0   0   | b24 b25 0   0     (panel 1)
//!
//! A block (mc=6, kc=3), mr=4:
//! packed: a00 a10 a20 a30 | a01 a11 a21 a31 | a02 a12 a22 a32   (panel 0)
//!         a40 a50 0   0   | a41 a51 0   0   | a42 a52 0   0     (panel 1)
//! ```

use super::tiling::{BlockIter, Tile};
use crate::matrix::view::MatRef;

/// Scratch elements needed to pack an `mc × kc` block of A.
#[inline]
pub fn packed_a_len(mc: usize, kc: usize, mr: usize) -> usize {
    mc.div_ceil(mr) * mr * kc
}

/// Scratch elements needed to pack a `kc × nc` block of B.
#[inline]
pub fn packed_b_len(kc: usize, nc: usize, nr: usize) -> usize {
    nc.div_ceil(nr) * nr * kc
}

/// Pack `A[rows, depth]` into MR-row panels.
///
/// Panel `i` starts at `i * mr * depth.len`; within it, reduction step `p`
/// holds the `mr` values of column `depth.start + p`. Rows past the end of
/// a ragged panel are zero.
///
/// # Panics
///
/// Panics if `packed` is shorter than `packed_a_len(rows.len, depth.len, mr)`
/// or the tiles fall outside `a`.
pub fn pack_a(a: &MatRef<'_>, rows: Tile, depth: Tile, mr: usize, packed: &mut [f32]) {
    let kc = depth.len;
    for (idx, panel) in BlockIter::over(rows, mr).enumerate() {
        let out = &mut packed[idx * mr * kc..(idx + 1) * mr * kc];

        // Read each source row sequentially and scatter it with stride mr.
        for r in 0..panel.len {
            let src = &a.row(panel.start + r)[depth.start..depth.end()];
            for (p, &v) in src.iter().enumerate() {
                out[p * mr + r] = v;
            }
        }
        if panel.len < mr {
            for p in 0..kc {
                out[p * mr + panel.len..(p + 1) * mr].fill(0.0);
            }
        }
    }
}

/// Pack `B[depth, cols]` into NR-column panels.
///
/// Panel `j` starts at `j * nr * depth.len`; within it, reduction step `p`
/// holds the `nr` values of row `depth.start + p`. Columns past the end of
/// a ragged panel are zero.
///
/// # Panics
///
/// Panics if `packed` is shorter than `packed_b_len(depth.len, cols.len, nr)`
/// or the tiles fall outside `b`.
pub fn pack_b(b: &MatRef<'_>, depth: Tile, cols: Tile, nr: usize, packed: &mut [f32]) {
    let kc = depth.len;
    for (idx, panel) in BlockIter::over(cols, nr).enumerate() {
        let out = &mut packed[idx * nr * kc..(idx + 1) * nr * kc];

        for p in 0..kc {
            let src = &b.row(depth.start + p)[panel.start..panel.end()];
            let dst = &mut out[p * nr..(p + 1) * nr];
            dst[..panel.len].copy_from_slice(src);
            dst[panel.len..].fill(0.0);
        }
    }
}
