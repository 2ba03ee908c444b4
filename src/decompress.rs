//! Decompression stage for message application data.
//!
//! Dispatch is a closed sum over the header's compression-type field; the
//! only codec currently on the wire is zlib. Decompressed bytes land in a
//! freshly allocated buffer owned by the iterator, leaving the on-wire chain
//! untouched.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::warn;

use crate::chain::Position;
use crate::error::PutEventError;
use crate::protocol::{CompressionType, PutHeader, PutHeaderFlag};

/// When to decompress a message's application data.
///
/// `OnlyOldFormatProperties` supports the in-place rollout of the narrowed
/// compression scope: new producers compress payload only, while old frames
/// carry properties inside the compressed region and must be inflated before
/// legacy readers can see them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecompressPolicy {
    /// Never decompress; application data aliases the wire bytes.
    #[default]
    None,
    /// Always apply the declared codec.
    Always,
    /// Decompress only messages whose properties use the legacy format.
    OnlyOldFormatProperties,
}

impl DecompressPolicy {
    /// Combine the constructor-time policy with the one given at `reset`.
    ///
    /// `Always` from either side wins; otherwise a standing
    /// `OnlyOldFormatProperties` survives a plain reset.
    #[must_use]
    pub(crate) fn merge(constructor: Self, reset: Self) -> Self {
        match (constructor, reset) {
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (Self::OnlyOldFormatProperties, _) | (_, Self::OnlyOldFormatProperties) => {
                Self::OnlyOldFormatProperties
            }
            (Self::None, Self::None) => Self::None,
        }
    }

    /// Decide whether `header`'s message should be decompressed under this
    /// policy. The legacy check reads the header's schema id, the one
    /// old-format marker readable before any inflation.
    #[must_use]
    pub(crate) fn wants_decompression(self, header: &PutHeader) -> bool {
        match self {
            Self::None => false,
            Self::Always => true,
            Self::OnlyOldFormatProperties => {
                header.has_flag(PutHeaderFlag::MessageProperties)
                    && header.schema_id().is_legacy()
            }
        }
    }
}

/// Where a message's application data lives after `advance`.
///
/// Exactly one of the two holds: either the data aliases the wire chain, or
/// the iterator owns a decompressed copy.
#[derive(Clone, Debug)]
pub(crate) enum ApplicationData {
    /// Zero-copy view into the buffer chain.
    Aliased {
        /// Position of the first application-data byte.
        start: Position,
        /// Length excluding trailing padding.
        len: usize,
    },
    /// Freshly allocated decompressed bytes.
    Owned(Vec<u8>),
}

impl ApplicationData {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Aliased { len, .. } => *len,
            Self::Owned(bytes) => bytes.len(),
        }
    }
}

/// Inflate `input` through the codec for `compression`, bounded by
/// `max_size`.
///
/// # Errors
///
/// Returns [`PutEventError::UnsupportedCompression`] for an unrecognised
/// codec and [`PutEventError::DecompressFailed`] when the codec rejects the
/// stream or the size cap trips.
pub(crate) fn decompress(
    compression_raw: u8,
    input: &[u8],
    max_size: usize,
) -> Result<Vec<u8>, PutEventError> {
    match CompressionType::from_wire(compression_raw) {
        Some(CompressionType::None) => Ok(input.to_vec()),
        Some(CompressionType::Zlib) => inflate_zlib(input, max_size),
        None => Err(PutEventError::UnsupportedCompression {
            raw: compression_raw,
        }),
    }
}

fn inflate_zlib(input: &[u8], max_size: usize) -> Result<Vec<u8>, PutEventError> {
    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(input).take(max_size as u64 + 1);
    decoder.read_to_end(&mut out).map_err(|error| {
        warn!("zlib inflation failed after {} bytes: {error}", out.len());
        PutEventError::DecompressFailed {
            reason: error.to_string(),
        }
    })?;
    if out.len() > max_size {
        warn!("decompressed size exceeds {max_size} byte cap");
        return Err(PutEventError::DecompressFailed {
            reason: format!("decompressed size exceeds {max_size} byte cap"),
        });
    }
    Ok(out)
}
