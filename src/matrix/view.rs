//! Row-major matrix views.
//!
//! A view is (base, rows, cols) over contiguous storage whose leading
//! dimension equals `cols`. There are no strided sub-matrix views.

use crate::error::{GemmError, Result};
use std::marker::PhantomData;

/// Read-only row-major view.
#[derive(Debug, Clone, Copy)]
pub struct MatRef<'a> {
    data: &'a [f32],
    rows: usize,
    cols: usize,
}

impl<'a> MatRef<'a> {
    /// Wrap `data` as a `rows × cols` matrix.
    ///
    /// `operand` names the matrix in the error if the length is wrong.
    pub fn new(data: &'a [f32], rows: usize, cols: usize, operand: &'static str) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or(GemmError::InvalidConfig(
            "matrix element count overflows usize",
        ))?;
        if data.len() != expected {
            return Err(GemmError::InvalidShape {
                operand,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Row `i` as a slice of `cols` values.
    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline(always)]
    pub fn at(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.cols + j]
    }
}

/// Mutable row-major view; the sole output of a GEMM call.
#[derive(Debug)]
pub struct MatMut<'a> {
    data: &'a mut [f32],
    rows: usize,
    cols: usize,
}

impl<'a> MatMut<'a> {
    pub fn new(
        data: &'a mut [f32],
        rows: usize,
        cols: usize,
        operand: &'static str,
    ) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or(GemmError::InvalidConfig(
            "matrix element count overflows usize",
        ))?;
        if data.len() != expected {
            return Err(GemmError::InvalidShape {
                operand,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut *self.data
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Raw handle that workers use to write disjoint tiles of C.
    pub(crate) fn as_ptr(&mut self) -> MatPtr<'_> {
        MatPtr {
            ptr: self.data.as_mut_ptr(),
            rows: self.rows,
            cols: self.cols,
            _marker: PhantomData,
        }
    }
}

/// Shared raw pointer to C, handed to every worker.
///
/// Soundness rests on the work partition: two workers never receive
/// overlapping tiles, so no element is written through two handles.
#[derive(Clone, Copy)]
pub(crate) struct MatPtr<'a> {
    ptr: *mut f32,
    rows: usize,
    cols: usize,
    _marker: PhantomData<&'a mut [f32]>,
}

// SAFETY: workers only write disjoint tiles (see `threaded::plan_units`).
unsafe impl Send for MatPtr<'_> {}
unsafe impl Sync for MatPtr<'_> {}

impl MatPtr<'_> {
    /// Leading dimension (row stride) of C.
    #[inline(always)]
    pub(crate) fn ld(&self) -> usize {
        self.cols
    }

    /// Pointer to element (i, j).
    ///
    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline(always)]
    pub(crate) unsafe fn at(&self, i: usize, j: usize) -> *mut f32 {
        debug_assert!(i < self.rows && j < self.cols);
        unsafe { self.ptr.add(i * self.cols + j) }
    }
}

/// Validate all three operands of `C = A·B` before anything is written.
///
/// Checks every dimension product for overflow, then each slice length.
pub fn validate<'a, 'c>(
    a: &'a [f32],
    b: &'a [f32],
    c: &'c mut [f32],
    m: usize,
    n: usize,
    k: usize,
) -> Result<(MatRef<'a>, MatRef<'a>, MatMut<'c>)> {
    if m.checked_mul(k).is_none() || k.checked_mul(n).is_none() || m.checked_mul(n).is_none() {
        return Err(GemmError::DimensionOverflow { m, n, k });
    }

    let a = MatRef::new(a, m, k, "A")?;
    let b = MatRef::new(b, k, n, "B")?;
    let c = MatMut::new(c, m, n, "C")?;
    Ok((a, b, c))
}
