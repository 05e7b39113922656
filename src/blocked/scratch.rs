//! Per-worker packing scratch.
//!
//! Every worker owns one `Workspace` for the whole call; nothing here is
//! shared between workers. Allocation is fallible: a failed request is
//! retried once with halved block sizes, and after that the policy decides
//! between an error and the unpacked direct path.

use super::packing::{pack_b, packed_a_len, packed_b_len};
use super::tiling::Tile;
use crate::config::{AllocPolicy, BlockSizes};
use crate::error::{GemmError, Result};
use crate::matrix::view::MatRef;

/// Allocate `len` zeroed floats, treating anything above `limit` as an
/// allocation failure.
fn try_alloc(len: usize, limit: Option<usize>) -> Result<Vec<f32>> {
    if limit.is_some_and(|limit| len > limit) {
        return Err(GemmError::Allocation { elements: len });
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| GemmError::Allocation { elements: len })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Packed A and B buffers sized for one set of block sizes.
#[derive(Debug)]
pub struct Scratch {
    blocks: BlockSizes,
    packed_a: Vec<f32>,
    packed_b: Vec<f32>,
    /// (K-block, N-block) currently held in `packed_b`.
    b_panel: Option<(Tile, Tile)>,
}

impl Scratch {
    /// Buffers for an `mc × kc` A block and a `kc × nc` B block, padded to
    /// whole micro-panels.
    pub fn try_new(
        blocks: BlockSizes,
        mr: usize,
        nr: usize,
        limit: Option<usize>,
    ) -> Result<Self> {
        let packed_b = try_alloc(packed_b_len(blocks.kc, blocks.nc, nr), limit)?;
        let packed_a = try_alloc(packed_a_len(blocks.mc, blocks.kc, mr), limit)?;
        Ok(Self {
            blocks,
            packed_a,
            packed_b,
            b_panel: None,
        })
    }

    /// `try_new` at nominal sizes, then once more with every size halved.
    pub fn acquire(
        blocks: BlockSizes,
        mr: usize,
        nr: usize,
        limit: Option<usize>,
    ) -> Result<Self> {
        Self::try_new(blocks, mr, nr, limit).or_else(|err| {
            let smaller = blocks.halved();
            log::warn!("{}; retrying with block sizes {:?}", err, smaller);
            Self::try_new(smaller, mr, nr, limit)
        })
    }

    /// Block sizes the buffers were sized for; the driver must not exceed them.
    pub fn blocks(&self) -> BlockSizes {
        self.blocks
    }

    pub fn packed_a_mut(&mut self) -> &mut [f32] {
        &mut self.packed_a
    }

    /// Both packed buffers, for the micro-kernel loops.
    pub fn panels(&self) -> (&[f32], &[f32]) {
        (&self.packed_a, &self.packed_b)
    }

    /// Pack `B[depth, cols]` unless this scratch already holds exactly that
    /// panel. Returns whether packing happened.
    pub fn pack_b(&mut self, b: &MatRef<'_>, depth: Tile, cols: Tile, nr: usize) -> bool {
        if self.b_panel == Some((depth, cols)) {
            return false;
        }
        pack_b(b, depth, cols, nr, &mut self.packed_b);
        self.b_panel = Some((depth, cols));
        true
    }
}

/// What one worker computes with.
#[derive(Debug)]
pub enum Workspace {
    /// Blocked, packed path.
    Packed(Scratch),
    /// No scratch could be had: unpacked scalar path.
    Direct,
}

impl Workspace {
    /// Obtain a worker's workspace under `policy`.
    pub fn acquire(
        blocks: BlockSizes,
        mr: usize,
        nr: usize,
        limit: Option<usize>,
        policy: AllocPolicy,
    ) -> Result<Self> {
        match (Scratch::acquire(blocks, mr, nr, limit), policy) {
            (Ok(scratch), _) => Ok(Workspace::Packed(scratch)),
            (Err(err), AllocPolicy::Fail) => Err(err),
            (Err(err), AllocPolicy::Fallback) => {
                log::warn!("{}; computing without packing", err);
                Ok(Workspace::Direct)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: BlockSizes = BlockSizes::new(32, 64, 32);

    #[test]
    fn test_sizes_cover_padded_panels() {
        let scratch = Scratch::try_new(BlockSizes::new(30, 60, 10), 4, 16, None).unwrap();
        let (a, b) = scratch.panels();
        assert_eq!(a.len(), 32 * 10);
        assert_eq!(b.len(), 64 * 10);
    }

    #[test]
    fn test_limit_triggers_allocation_error() {
        let err = Scratch::try_new(BLOCKS, 4, 4, Some(100)).unwrap_err();
        assert!(matches!(err, GemmError::Allocation { .. }));
    }

    #[test]
    fn test_acquire_retries_with_halved_blocks() {
        // Nominal B needs 64*32 = 2048; halved needs 32*16 = 512.
        let scratch = Scratch::acquire(BLOCKS, 4, 4, Some(1024)).unwrap();
        assert_eq!(scratch.blocks(), BLOCKS.halved());
    }

    #[test]
    fn test_workspace_policies() {
        let ws = Workspace::acquire(BLOCKS, 4, 4, Some(1), AllocPolicy::Fallback).unwrap();
        assert!(matches!(ws, Workspace::Direct));

        let err = Workspace::acquire(BLOCKS, 4, 4, Some(1), AllocPolicy::Fail).unwrap_err();
        assert!(matches!(err, GemmError::Allocation { .. }));

        let ws = Workspace::acquire(BLOCKS, 4, 4, None, AllocPolicy::Fail).unwrap();
        assert!(matches!(ws, Workspace::Packed(_)));
    }

    #[test]
    fn test_b_panel_reused_until_key_changes() {
        let data: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let b = MatRef::new(&data, 8, 8, "B").unwrap();
        let mut scratch = Scratch::try_new(BlockSizes::new(4, 8, 8), 4, 4, None).unwrap();

        let depth = Tile::new(0, 8);
        assert!(scratch.pack_b(&b, depth, Tile::new(0, 8), 4));
        assert!(!scratch.pack_b(&b, depth, Tile::new(0, 8), 4));
        assert!(scratch.pack_b(&b, depth, Tile::new(0, 4), 4));
        assert!(scratch.pack_b(&b, Tile::new(0, 4), Tile::new(0, 4), 4));
    }
}
