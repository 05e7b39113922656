//! Multi-threaded GEMM.
//!
//! C is cut into (MC × NC) tiles; each tile runs the full K loop on one
//! worker, so no two workers ever write the same element and C needs no
//! locking. Thread count adapts to matrix size: small products stay on the
//! calling thread because the pool overhead isn't worth it.
//!
//! - `partition`: work units, static ranges and the thread-count heuristic
//! - `dispatch`: the parallel-for over units and the per-call runner

pub mod dispatch;
pub mod partition;

pub use dispatch::for_each_unit;
pub use partition::{choose_thread_count, plan_units, static_ranges, worker_count};
