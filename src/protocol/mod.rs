//! Wire-protocol model: fixed headers, flags, and protocol constants.
//!
//! Decoders in this module project typed views over raw header bytes and
//! validate structural bounds only (declared lengths against remaining
//! bytes); semantic checks such as flag consistency belong to the iterator.
//! All multi-byte fields are big-endian and all length fields count 4-byte
//! words.

pub mod event_header;
pub mod option_header;
pub mod put_header;

pub use event_header::{EventHeader, EventType};
pub use option_header::{OptionHeader, OptionType, OPTION_WORDS_SENTINEL};
pub use put_header::{
    CompressionType,
    MessageGuid,
    PutHeader,
    PutHeaderFields,
    PutHeaderFlag,
    PutHeaderFlags,
    QueueId,
    SchemaId,
};

/// Size of a protocol word in bytes; every length field counts these.
pub const WORD_SIZE: usize = 4;

/// Smallest legal pad count for a word-aligned region.
pub const PAD_MIN: u8 = 1;

/// Largest legal pad count; a region already word-aligned still carries a
/// full word of padding.
pub const PAD_MAX: u8 = 4;

/// Longest permitted message-group identifier, in bytes.
pub const MSG_GROUP_ID_MAX_LENGTH: usize = 31;

/// Default cap on the decompressed size of one message's application data.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;
