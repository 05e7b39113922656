//! Cache-blocked GEMM.
//!
//! The driver breaks the product into tiles that fit in L1/L2/L3, packs
//! each operand block for sequential access, then calls a micro-kernel
//! for every full MR×NR tile.
//!
//! - `tiling`: tile descriptors and the ragged-edge block iterator
//! - `packing`: A and B panel layouts with zero padding
//! - `scratch`: per-worker packed buffers and allocation fallback
//! - `driver`: the five nested loops over one region of C

pub mod driver;
pub mod packing;
pub mod scratch;
pub mod tiling;

pub use driver::Region;
pub use tiling::{BlockIter, Tile};
