//! Canonical addressing within a buffer chain.

use std::cmp::Ordering;
use std::fmt;

/// A position within a [`BufferChain`](super::BufferChain).
///
/// A position pairs `(segment, offset)` with the equivalent logical byte
/// offset from the start of the chain. Canonical positions either address a
/// real byte (`offset` inside a non-empty segment) or are the chain-end
/// sentinel; chain operations normalise positions so the two forms never
/// mix. Ordering compares logical offsets.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use putframe::chain::BufferChain;
///
/// let chain = BufferChain::new(vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")]);
/// let pos = chain.position_at(4).expect("in bounds");
/// assert_eq!(pos.segment(), 1);
/// assert_eq!(pos.offset(), 1);
/// assert_eq!(pos.logical_offset(), 4);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    segment: usize,
    offset: usize,
    logical: usize,
}

impl Position {
    /// The position addressing the very first byte slot.
    #[must_use]
    pub(crate) const fn zero() -> Self {
        Self {
            segment: 0,
            offset: 0,
            logical: 0,
        }
    }

    /// Assemble a position from raw parts; callers guarantee canonical form.
    pub(crate) const fn new_unchecked(segment: usize, offset: usize, logical: usize) -> Self {
        Self {
            segment,
            offset,
            logical,
        }
    }

    /// Index of the segment this position addresses.
    #[must_use]
    pub const fn segment(&self) -> usize { self.segment }

    /// Byte offset within the addressed segment.
    #[must_use]
    pub const fn offset(&self) -> usize { self.offset }

    /// Equivalent byte offset from the start of the chain.
    #[must_use]
    pub const fn logical_offset(&self) -> usize { self.logical }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering { self.logical.cmp(&other.logical) }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.logical, self.segment, self.offset)
    }
}
