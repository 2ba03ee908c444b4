#![doc(html_root_url = "https://docs.rs/putframe/latest")]
//! Public API for the `putframe` library.
//!
//! This crate provides read-only, forward-only iteration over the messages
//! packed inside a single PUT event of a message-broker wire protocol. The
//! event arrives as a chain of byte segments; the iterator parses across
//! segment seams without copying, lazily decodes options and properties,
//! optionally decompresses application data under a configurable policy, and
//! rejects structurally invalid input without panicking.

pub mod byte_order;
pub mod chain;
pub mod decompress;
pub mod error;
/// Result type alias re-exported for convenience when iterating events.
pub use error::{PutEventError, Result};
pub mod iterator;
pub mod options;
pub mod properties;
pub mod protocol;

pub use chain::{BufferChain, ChainCursor, ChainError, ChainRange, HexDump, Position};
pub use decompress::DecompressPolicy;
pub use iterator::{Advance, PutMessageIterator};
pub use options::{MsgGroupId, OptionEntry, OptionsError, OptionsView};
pub use properties::{
    MessageProperties,
    PropertiesError,
    PropertiesHeader,
    Property,
    PropertyValue,
};
pub use protocol::{
    CompressionType,
    EventHeader,
    EventType,
    MessageGuid,
    OptionHeader,
    OptionType,
    PutHeader,
    PutHeaderFields,
    PutHeaderFlag,
    PutHeaderFlags,
    QueueId,
    SchemaId,
};
