//! Canonical error types for PUT-event iteration.
//!
//! Structural violations never panic and never log; every failure surfaces as
//! a [`PutEventError`] value and moves the iterator into its invalid state.
//! Callers inspect the error, optionally render
//! [`dump_blob`](crate::iterator::PutMessageIterator::dump_blob), and discard
//! the event.

use thiserror::Error;

use crate::chain::ChainError;

/// Errors produced while decoding a PUT event or one of its messages.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PutEventError {
    /// Fewer bytes remain in the event than a header declares as its length.
    #[error("truncated header: {declared} bytes declared, {remaining} remain")]
    TruncatedHeader {
        /// Bytes the header claims to occupy.
        declared: usize,
        /// Bytes actually left before the end of the event.
        remaining: usize,
    },
    /// A declared length field is inconsistent with its enclosing region.
    #[error("invalid length: {context}")]
    InvalidLength {
        /// Which relationship was violated.
        context: &'static str,
    },
    /// The message padding byte is outside the protocol range `[1, 4]`.
    #[error("invalid padding byte {value:#04x}")]
    InvalidPadding {
        /// The byte found where the pad count was expected.
        value: u8,
    },
    /// The event header does not advertise a PUT event.
    #[error("unexpected event type {found:?}, expected Put")]
    UnexpectedEventType {
        /// Raw event-type value carried by the event header.
        found: u8,
    },
    /// The compression type is not recognised under the active policy.
    #[error("unsupported compression type {raw}")]
    UnsupportedCompression {
        /// Raw 3-bit compression-type field from the PUT header.
        raw: u8,
    },
    /// The codec rejected the data or the decompressed size cap tripped.
    #[error("decompression failed: {reason}")]
    DecompressFailed {
        /// Human-readable codec diagnostic.
        reason: String,
    },
    /// An option record's declared length overruns the options area or its
    /// framing is otherwise inconsistent.
    #[error("invalid option record: {0}")]
    InvalidOption(#[from] crate::options::OptionsError),
    /// Cursor arithmetic stepped outside the buffer chain.
    #[error(transparent)]
    ChainOutOfBounds(#[from] ChainError),
    /// A rebind target chain does not match the source iterator's chain.
    #[error("rebind length mismatch: source chain has {expected} bytes, target has {found}")]
    RebindMismatch {
        /// Total length of the chain the source iterator was bound to.
        expected: usize,
        /// Total length of the chain offered for rebinding.
        found: usize,
    },
    /// Application data was decompressed into an owned buffer, so no chain
    /// position exists for it.
    #[error("application data is owned (decompressed); no chain position exists")]
    OwnedApplicationData,
    /// The message-properties area could not be decoded.
    #[error(transparent)]
    Properties(#[from] crate::properties::PropertiesError),
}

/// Canonical result alias used by `putframe` public APIs.
pub type Result<T> = std::result::Result<T, PutEventError>;
