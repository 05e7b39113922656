//! Row-major matrix views and naive reference implementations.
//!
//! The naive products are the correctness baseline that every blocked and
//! vectorized path is checked against.

pub mod compare;
pub mod naive_ijk;
pub mod naive_ikj;
pub mod view;
