//! The fixed header at the start of each PUT message.

use std::fmt;

use derive_more::{Display, From, Into};

use crate::byte_order::{
    read_network_u16,
    read_network_u24,
    read_network_u32,
    write_network_u16,
    write_network_u24,
    write_network_u32,
};
use crate::chain::{BufferChain, Position};
use crate::error::PutEventError;

use super::WORD_SIZE;

const COMPRESSION_SHIFT: u8 = 5;

/// Flag bits carried in the first byte of a [`PutHeader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PutHeaderFlag {
    /// The application data starts with a message-properties area.
    MessageProperties = 0b0000_0001,
    /// The message carries an options area. Implied by a non-zero
    /// options-length field; kept on the wire for cheap filtering.
    Options = 0b0000_0010,
}

/// The flag byte of a [`PutHeader`], with typed bit accessors.
///
/// # Examples
///
/// ```
/// use putframe::protocol::{PutHeaderFlag, PutHeaderFlags};
///
/// let flags = PutHeaderFlags::empty().with(PutHeaderFlag::MessageProperties);
/// assert!(flags.has(PutHeaderFlag::MessageProperties));
/// assert!(!flags.has(PutHeaderFlag::Options));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutHeaderFlags(u8);

impl PutHeaderFlags {
    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self { Self(0) }

    /// Wrap a raw wire byte; unknown bits are preserved verbatim.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self { Self(raw) }

    /// The raw wire byte.
    #[must_use]
    pub const fn raw(self) -> u8 { self.0 }

    /// Return whether `flag` is set.
    #[must_use]
    pub const fn has(self, flag: PutHeaderFlag) -> bool { self.0 & flag as u8 != 0 }

    /// Copy of these flags with `flag` set.
    #[must_use]
    pub const fn with(self, flag: PutHeaderFlag) -> Self { Self(self.0 | flag as u8) }

    /// Copy of these flags with `flag` cleared.
    #[must_use]
    pub const fn without(self, flag: PutHeaderFlag) -> Self { Self(self.0 & !(flag as u8)) }
}

/// Codec applied to a message's application data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionType {
    /// Application data is carried verbatim.
    #[default]
    None,
    /// Application data is a zlib stream.
    Zlib,
}

impl CompressionType {
    /// Decode the 3-bit wire value, if recognised.
    #[must_use]
    pub const fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Zlib),
            _ => None,
        }
    }

    /// The 3-bit wire value.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zlib => 1,
        }
    }
}

/// Identifier of the queue a message is destined for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct QueueId(u32);

impl QueueId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }
}

/// Identifier of the message-properties schema; zero marks the legacy
/// pre-schema format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct SchemaId(u16);

impl SchemaId {
    /// The legacy (pre-schema) marker.
    pub const LEGACY: Self = Self(0);

    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    /// Return whether this id marks the legacy format.
    #[must_use]
    pub const fn is_legacy(self) -> bool { self.0 == 0 }
}

/// Globally unique identifier stamped on each message by its producer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MessageGuid([u8; 16]);

impl MessageGuid {
    /// Wrap raw GUID bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self { Self(bytes) }

    /// The raw GUID bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] { &self.0 }
}

impl fmt::Display for MessageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// The fixed structure at the start of each PUT message.
///
/// Layout (big-endian):
///
/// ```text
/// 0:      flags(8)
/// 1:      header_words(8)
/// 2..5:   options_words(24)
/// 5:      compression_type(3, high bits) | reserved(5)
/// 6..8:   reserved
/// 8..12:  total_message_words(u32)
/// 12..16: queue_id(u32)
/// 16..32: message_guid(16 bytes)
/// 32..36: crc32c(u32)
/// 36..38: schema_id(u16)
/// 38..40: reserved
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PutHeader {
    flags: PutHeaderFlags,
    header_words: u8,
    options_words: u32,
    compression_raw: u8,
    total_words: u32,
    queue_id: QueueId,
    guid: MessageGuid,
    crc32c: u32,
    schema_id: SchemaId,
}

impl PutHeader {
    /// Minimum header length in words for this protocol version.
    pub const MIN_HEADER_WORDS: u8 = 10;

    /// Encoded size of the minimum-version header, in bytes.
    pub const ENCODED_MIN_LEN: usize = Self::MIN_HEADER_WORDS as usize * WORD_SIZE;

    /// Decode and structurally validate the PUT header at `pos`.
    ///
    /// `remaining` is the number of bytes between `pos` and the end of the
    /// enclosing event; the decoder checks declared lengths against it and
    /// nothing else. Flag consistency and compression support are the
    /// iterator's concern.
    ///
    /// # Errors
    ///
    /// - [`PutEventError::TruncatedHeader`] if fewer bytes remain than the
    ///   header declares as its length.
    /// - [`PutEventError::InvalidLength`] if the declared lengths are
    ///   mutually inconsistent or overrun the event.
    pub fn decode_at(
        chain: &BufferChain,
        pos: Position,
        remaining: usize,
    ) -> Result<Self, PutEventError> {
        if remaining < Self::ENCODED_MIN_LEN {
            return Err(PutEventError::TruncatedHeader {
                declared: Self::ENCODED_MIN_LEN,
                remaining,
            });
        }
        let mut raw = [0_u8; Self::ENCODED_MIN_LEN];
        chain.read_at(pos, &mut raw)?;

        let header = Self {
            flags: PutHeaderFlags::from_raw(raw[0]),
            header_words: raw[1],
            options_words: read_network_u24([raw[2], raw[3], raw[4]]),
            compression_raw: raw[5] >> COMPRESSION_SHIFT,
            total_words: read_network_u32([raw[8], raw[9], raw[10], raw[11]]),
            queue_id: QueueId::new(read_network_u32([raw[12], raw[13], raw[14], raw[15]])),
            guid: MessageGuid::from_bytes(
                raw[16..32].try_into().expect("slice length is fixed"),
            ),
            crc32c: read_network_u32([raw[32], raw[33], raw[34], raw[35]]),
            schema_id: SchemaId::new(read_network_u16([raw[36], raw[37]])),
        };

        if header.header_words < Self::MIN_HEADER_WORDS {
            return Err(PutEventError::InvalidLength {
                context: "put header shorter than minimum",
            });
        }
        if header.header_size() > remaining {
            return Err(PutEventError::TruncatedHeader {
                declared: header.header_size(),
                remaining,
            });
        }
        if header.total_words < u32::from(header.header_words) {
            return Err(PutEventError::InvalidLength {
                context: "message length shorter than its header",
            });
        }
        if header.total_size() > remaining {
            return Err(PutEventError::InvalidLength {
                context: "message overruns event",
            });
        }
        if header.options_size() > header.total_size() - header.header_size() {
            return Err(PutEventError::InvalidLength {
                context: "options overrun message",
            });
        }
        Ok(header)
    }

    /// Append the encoded header to `dst`, zero-filling reserved bytes.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.push(self.flags.raw());
        dst.push(self.header_words);
        dst.extend_from_slice(&write_network_u24(self.options_words));
        dst.push(self.compression_raw << COMPRESSION_SHIFT);
        dst.extend_from_slice(&[0, 0]);
        dst.extend_from_slice(&write_network_u32(self.total_words));
        dst.extend_from_slice(&write_network_u32(self.queue_id.get()));
        dst.extend_from_slice(self.guid.as_bytes());
        dst.extend_from_slice(&write_network_u32(self.crc32c));
        dst.extend_from_slice(&write_network_u16(self.schema_id.get()));
        dst.extend_from_slice(&[0, 0]);
    }

    /// The flag byte.
    #[must_use]
    pub const fn flags(&self) -> PutHeaderFlags { self.flags }

    /// Return whether `flag` is set.
    #[must_use]
    pub const fn has_flag(&self, flag: PutHeaderFlag) -> bool { self.flags.has(flag) }

    /// Declared header length in words.
    #[must_use]
    pub const fn header_words(&self) -> u8 { self.header_words }

    /// Declared header length in bytes.
    #[must_use]
    pub const fn header_size(&self) -> usize { self.header_words as usize * WORD_SIZE }

    /// Declared options-area length in words.
    #[must_use]
    pub const fn options_words(&self) -> u32 { self.options_words }

    /// Declared options-area length in bytes.
    #[must_use]
    pub const fn options_size(&self) -> usize { self.options_words as usize * WORD_SIZE }

    /// Raw 3-bit compression-type field.
    #[must_use]
    pub const fn compression_raw(&self) -> u8 { self.compression_raw }

    /// Typed compression codec, when the raw value is recognised.
    #[must_use]
    pub const fn compression_type(&self) -> Option<CompressionType> {
        CompressionType::from_wire(self.compression_raw)
    }

    /// Total message length in words, header and padding included.
    #[must_use]
    pub const fn total_words(&self) -> u32 { self.total_words }

    /// Total message length in bytes, header and padding included.
    #[must_use]
    pub const fn total_size(&self) -> usize { self.total_words as usize * WORD_SIZE }

    /// Destination queue identifier.
    #[must_use]
    pub const fn queue_id(&self) -> QueueId { self.queue_id }

    /// Producer-assigned message GUID.
    #[must_use]
    pub const fn message_guid(&self) -> MessageGuid { self.guid }

    /// CRC32-C checksum carried for the application data.
    #[must_use]
    pub const fn crc32c(&self) -> u32 { self.crc32c }

    /// Message-properties schema identifier; zero marks the legacy format.
    #[must_use]
    pub const fn schema_id(&self) -> SchemaId { self.schema_id }

    /// Rewrite the exposed copy after decompression: the codec field reads
    /// as [`CompressionType::None`] while the on-wire header stays intact.
    pub(crate) fn clear_compression(&mut self) {
        self.compression_raw = CompressionType::None.to_wire();
    }
}

/// Field values for assembling a minimum-version [`PutHeader`].
///
/// Encoders and test fixtures populate this and convert with `into()`;
/// the compression field is the raw 3-bit wire value so unrecognised codecs
/// can be produced for negative paths.
#[derive(Clone, Copy, Debug)]
pub struct PutHeaderFields {
    /// Flag byte.
    pub flags: PutHeaderFlags,
    /// Options-area length in words.
    pub options_words: u32,
    /// Raw 3-bit compression-type value.
    pub compression_raw: u8,
    /// Total message length in words.
    pub total_words: u32,
    /// Destination queue.
    pub queue_id: QueueId,
    /// Producer-assigned GUID.
    pub guid: MessageGuid,
    /// CRC32-C of the application data.
    pub crc32c: u32,
    /// Properties schema id; zero for the legacy format.
    pub schema_id: SchemaId,
}

impl From<PutHeaderFields> for PutHeader {
    fn from(fields: PutHeaderFields) -> Self {
        Self {
            flags: fields.flags,
            header_words: Self::MIN_HEADER_WORDS,
            options_words: fields.options_words,
            compression_raw: fields.compression_raw,
            total_words: fields.total_words,
            queue_id: fields.queue_id,
            guid: fields.guid,
            crc32c: fields.crc32c,
            schema_id: fields.schema_id,
        }
    }
}
