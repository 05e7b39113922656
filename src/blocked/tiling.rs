//! Tile arithmetic shared by every blocking level.

/// A contiguous range `[start, start + len)` along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub start: usize,
    pub len: usize,
}

impl Tile {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Shorter than the nominal block size (the last tile of a dimension
    /// that the block size does not divide).
    pub fn is_ragged(&self, nominal: usize) -> bool {
        self.len < nominal
    }
}

/// Splits `[start, start + total)` into tiles of `block` elements; the last
/// one is `min(block, remaining)` long.
#[derive(Debug, Clone)]
pub struct BlockIter {
    next: usize,
    end: usize,
    block: usize,
}

impl BlockIter {
    /// Tiles over `0..total`.
    pub fn new(total: usize, block: usize) -> Self {
        Self::over(Tile::new(0, total), block)
    }

    /// Tiles over an arbitrary range.
    pub fn over(range: Tile, block: usize) -> Self {
        assert!(block > 0, "block size must be non-zero");
        Self {
            next: range.start,
            end: range.end(),
            block,
        }
    }
}

impl Iterator for BlockIter {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.end {
            return None;
        }
        let len = (self.end - self.next).min(self.block);
        let tile = Tile::new(self.next, len);
        self.next += len;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end - self.next.min(self.end)).div_ceil(self.block);
        (n, Some(n))
    }
}

impl ExactSizeIterator for BlockIter {}
