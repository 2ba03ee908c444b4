//! Forward-only cursor over a buffer chain.

use super::{BufferChain, ChainError, Position};

/// A forward-only cursor positioned within a [`BufferChain`].
///
/// Advancing is O(1) amortised: the cursor steps segment by segment rather
/// than re-resolving logical offsets, so iterating an event visits each
/// segment seam once.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use putframe::chain::{BufferChain, ChainCursor};
///
/// let chain = BufferChain::new(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]);
/// let mut cursor = ChainCursor::at_start(&chain);
/// cursor.advance(3).expect("in bounds");
/// assert_eq!(cursor.read_u8().expect("one byte remains"), b'd');
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ChainCursor<'a> {
    chain: &'a BufferChain,
    pos: Position,
}

impl<'a> ChainCursor<'a> {
    /// Create a cursor at `pos`, which must be canonical for `chain`.
    #[must_use]
    pub fn new(chain: &'a BufferChain, pos: Position) -> Self {
        let pos = chain.normalise(pos);
        Self { chain, pos }
    }

    /// Create a cursor at the start of `chain`.
    #[must_use]
    pub fn at_start(chain: &'a BufferChain) -> Self { Self::new(chain, chain.start()) }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Position { self.pos }

    /// Bytes left between the cursor and the end of the chain.
    #[must_use]
    pub fn remaining(&self) -> usize { self.chain.len() - self.pos.logical_offset() }

    /// Return whether the cursor sits on the end sentinel.
    #[must_use]
    pub fn at_end(&self) -> bool { self.remaining() == 0 }

    /// Move forward by exactly `n` bytes, crossing segment seams as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] if fewer than `n` bytes remain;
    /// the cursor is left unchanged in that case.
    pub fn advance(&mut self, n: usize) -> Result<(), ChainError> {
        if n > self.remaining() {
            return Err(ChainError::OutOfBounds {
                start: self.pos.logical_offset(),
                len: n,
                chain_len: self.chain.len(),
            });
        }
        let mut left = n;
        let mut segment = self.pos.segment();
        let mut offset = self.pos.offset();
        let mut logical = self.pos.logical_offset();
        while left > 0 {
            let avail = self.chain.segment(segment).len() - offset;
            if left < avail {
                offset += left;
                logical += left;
                left = 0;
            } else {
                left -= avail;
                logical += avail;
                segment += 1;
                offset = 0;
            }
        }
        self.pos = self
            .chain
            .normalise(Position::new_unchecked(segment, offset, logical));
        Ok(())
    }

    /// Gather-copy `dst.len()` bytes at the current position into `dst`
    /// without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] if fewer than `dst.len()` bytes
    /// remain.
    pub fn read_into(&self, dst: &mut [u8]) -> Result<(), ChainError> {
        self.chain.read_at(self.pos, dst)
    }

    /// Read the single byte under the cursor without moving it.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] at the end sentinel.
    pub fn read_u8(&self) -> Result<u8, ChainError> {
        let mut byte = [0_u8; 1];
        self.read_into(&mut byte)?;
        Ok(byte[0])
    }
}
