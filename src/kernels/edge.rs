//! Scalar remainder path for micro-tiles cut short by the matrix edge.
//!
//! A ragged tile never runs the vectorized kernel on partial data. A rows
//! come straight from the source matrix; B comes from the packed panel,
//! whose columns past the edge are zero-padded and simply never read.

use crate::blocked::tiling::Tile;
use crate::matrix::view::MatRef;

/// C[0..rows.len, 0..cols] += A[rows, depth] · B_panel[.., 0..cols]
///
/// `b_panel` is one packed NR-wide panel of `depth.len` reduction steps.
/// Each C element is loaded once, accumulated in reduction order and
/// stored once, the same sequence of additions as the 4×4 kernel.
///
/// # Safety
///
/// `c.add(i * ldc + j)` must be valid for reading and writing for every
/// `i < rows.len` and `j < cols`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn edge_tile(
    a: &MatRef<'_>,
    rows: Tile,
    depth: Tile,
    b_panel: &[f32],
    nr: usize,
    cols: usize,
    c: *mut f32,
    ldc: usize,
) {
    debug_assert!(cols <= nr);
    debug_assert!(b_panel.len() >= depth.len * nr);

    for i in 0..rows.len {
        let a_row = &a.row(rows.start + i)[depth.start..depth.end()];
        for j in 0..cols {
            // SAFETY: in bounds per the caller's contract.
            let c_ij = unsafe { c.add(i * ldc + j) };
            let mut sum = unsafe { *c_ij };
            for (p, &a_ip) in a_row.iter().enumerate() {
                sum += a_ip * b_panel[p * nr + j];
            }
            unsafe { *c_ij = sum };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_tile_reads_only_valid_columns() {
        // A: 3×2, B panel (nr=4) holds 2 real columns then NaN where the
        // padding would be; the NaNs must never reach C.
        let a_data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let a = MatRef::new(&a_data, 3, 2, "A").unwrap();
        let b_panel = [7.0f32, 8.0, f32::NAN, f32::NAN, 9.0, 10.0, f32::NAN, f32::NAN];
        let mut c = vec![0.0f32; 3 * 2];

        unsafe {
            edge_tile(&a, Tile::new(0, 3), Tile::new(0, 2), &b_panel, 4, 2, c.as_mut_ptr(), 2);
        }

        assert_eq!(c, vec![25.0, 28.0, 57.0, 64.0, 89.0, 100.0]);
    }

    #[test]
    fn test_edge_tile_depth_offset_accumulates() {
        let a_data = [1.0f32, 2.0, 3.0];
        let a = MatRef::new(&a_data, 1, 3, "A").unwrap();
        let b_panel = [10.0f32, 100.0];
        let mut c = vec![5.0f32];

        // Only columns 1..3 of A take part.
        unsafe {
            edge_tile(&a, Tile::new(0, 1), Tile::new(1, 2), &b_panel, 1, 1, c.as_mut_ptr(), 1);
        }
        assert_eq!(c, vec![5.0 + 20.0 + 300.0]);
    }
}
