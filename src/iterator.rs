//! Read-only, forward-only iteration over the messages of one PUT event.
//!
//! The iterator never logs on malformed input: structural violations surface
//! as error values, the iterator turns invalid, and the caller decides what
//! to report (typically with [`dump_blob`](PutMessageIterator::dump_blob)).
//!
//! Typical usage:
//!
//! ```
//! use putframe::chain::BufferChain;
//! use putframe::decompress::DecompressPolicy;
//! use putframe::iterator::{Advance, PutMessageIterator};
//! use putframe::protocol::EventHeader;
//!
//! fn sizes(chain: &BufferChain) -> putframe::Result<Vec<usize>> {
//!     let event_header = EventHeader::decode(chain)?;
//!     let mut iter = PutMessageIterator::new(DecompressPolicy::None);
//!     iter.reset(chain, &event_header, DecompressPolicy::None)?;
//!
//!     let mut sizes = Vec::new();
//!     while let Advance::Message = iter.advance()? {
//!         sizes.push(iter.application_data_size());
//!     }
//!     Ok(sizes)
//! }
//! # let mut raw = Vec::new();
//! # EventHeader::new(putframe::protocol::EventType::Put, 8).encode(&mut raw);
//! # assert!(sizes(&BufferChain::from_slice(&raw)).expect("empty event").is_empty());
//! ```

use std::cell::{Cell, OnceCell};

use crate::chain::{BufferChain, ChainCursor, HexDump, Position};
use crate::decompress::{decompress, ApplicationData, DecompressPolicy};
use crate::error::PutEventError;
use crate::options::{MsgGroupId, OptionsView};
use crate::properties::{MessageProperties, PropertiesHeader};
use crate::protocol::{
    CompressionType,
    EventHeader,
    EventType,
    OptionType,
    PutHeader,
    PutHeaderFlag,
    DEFAULT_MAX_DECOMPRESSED_SIZE,
    PAD_MAX,
    PAD_MIN,
};

/// Bytes of the chain rendered by [`PutMessageIterator::dump_blob`].
const DUMP_LIMIT: usize = 128;

const NOT_ON_MESSAGE: &str = "accessor requires the latest advance() to have returned Message";

/// Outcome of a successful [`PutMessageIterator::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Advance {
    /// The iterator is positioned on a valid message.
    Message,
    /// Iteration reached the end of the event; the iterator is now invalid.
    EndOfEvent,
}

/// A read-only sequential iterator over the messages of one PUT event.
///
/// The iterator borrows the buffer chain and owns everything else: the
/// per-message offset cache, the lazily built options view, and the
/// decompression buffer when a policy is in effect. An instance is born
/// invalid; [`reset`](Self::reset) arms it and [`advance`](Self::advance)
/// walks the event.
///
/// Accessors other than [`is_valid`](Self::is_valid) and
/// [`dump_blob`](Self::dump_blob) require the latest `advance` to have
/// returned [`Advance::Message`]; they panic otherwise.
#[derive(Clone, Debug)]
pub struct PutMessageIterator<'a> {
    chain: Option<&'a BufferChain>,
    event_end: usize,
    /// Exposed header copy; rewritten (compression cleared) when the
    /// application data was decompressed.
    header: Option<PutHeader>,
    message_start: Option<Position>,
    /// Bytes to step over on the next `advance`; `None` marks the invalid
    /// state.
    advance_length: Option<usize>,
    options_position: Option<Position>,
    options_size: usize,
    application_data: Option<ApplicationData>,
    raw_application_data_size: usize,
    message_properties_size: usize,
    /// Whether the leading properties area is readable as plain bytes
    /// (uncompressed on the wire, or decompressed by policy).
    properties_readable: bool,
    lazy_payload_size: Cell<Option<usize>>,
    options_view: OnceCell<Result<OptionsView, PutEventError>>,
    constructor_policy: DecompressPolicy,
    effective_policy: DecompressPolicy,
    max_decompressed_size: usize,
}

impl<'a> PutMessageIterator<'a> {
    /// Create an invalid instance with a standing decompression policy.
    ///
    /// The only useful operations on an invalid instance are
    /// [`reset`](Self::reset), [`rebind`](Self::rebind),
    /// [`is_valid`](Self::is_valid), and [`clear`](Self::clear).
    #[must_use]
    pub fn new(policy: DecompressPolicy) -> Self {
        Self {
            chain: None,
            event_end: 0,
            header: None,
            message_start: None,
            advance_length: None,
            options_position: None,
            options_size: 0,
            application_data: None,
            raw_application_data_size: 0,
            message_properties_size: 0,
            properties_readable: false,
            lazy_payload_size: Cell::new(None),
            options_view: OnceCell::new(),
            constructor_policy: policy,
            effective_policy: policy,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }

    /// Replace the cap on one message's decompressed application data.
    #[must_use]
    pub fn with_max_decompressed_size(mut self, max_size: usize) -> Self {
        self.max_decompressed_size = max_size;
        self
    }

    /// Arm the iterator over `chain`, whose event header the caller already
    /// decoded. `policy` merges with the constructor policy: `Always` from
    /// either side wins, and a standing `OnlyOldFormatProperties` survives a
    /// plain reset.
    ///
    /// # Errors
    ///
    /// Returns an error when the event header is not PUT or its declared
    /// lengths do not fit `chain`; the iterator stays invalid.
    pub fn reset(
        &mut self,
        chain: &'a BufferChain,
        event_header: &EventHeader,
        policy: DecompressPolicy,
    ) -> Result<(), PutEventError> {
        self.clear();
        if event_header.event_type() != EventType::Put {
            return Err(PutEventError::UnexpectedEventType {
                found: event_header.event_type().to_wire(),
            });
        }
        let total = event_header.total_length();
        if event_header.header_size() > total {
            return Err(PutEventError::InvalidLength {
                context: "event shorter than its header",
            });
        }
        if total > chain.len() {
            return Err(PutEventError::TruncatedHeader {
                declared: total,
                remaining: chain.len(),
            });
        }
        let first = chain.position_at(event_header.header_size())?;
        self.chain = Some(chain);
        self.event_end = total;
        self.message_start = Some(first);
        self.advance_length = Some(0);
        self.effective_policy = DecompressPolicy::merge(self.constructor_policy, policy);
        Ok(())
    }

    /// Point this instance at `chain` while inheriting all cached state from
    /// `other`. Useful when `other`'s chain will not outlive this instance
    /// and the bytes have been re-materialised elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`PutEventError::RebindMismatch`] unless both chains have the
    /// same total length; the iterator stays invalid in that case.
    pub fn rebind(
        &mut self,
        chain: &'a BufferChain,
        other: &PutMessageIterator<'_>,
    ) -> Result<(), PutEventError> {
        let expected = other.chain.map_or(0, BufferChain::len);
        if expected != chain.len() {
            self.clear();
            return Err(PutEventError::RebindMismatch {
                expected,
                found: chain.len(),
            });
        }
        // Cached positions carry segment coordinates from the old chain; the
        // new chain may be segmented differently, so re-resolve them by
        // logical offset. Offsets are within the validated length, so the
        // lookups cannot fail.
        let remap = |position: Position| chain.position_at(position.logical_offset());
        let message_start = other.message_start.map(remap).transpose()?;
        let options_position = other.options_position.map(remap).transpose()?;
        let application_data = match &other.application_data {
            Some(ApplicationData::Aliased { start, len }) => Some(ApplicationData::Aliased {
                start: remap(*start)?,
                len: *len,
            }),
            Some(ApplicationData::Owned(bytes)) => {
                Some(ApplicationData::Owned(bytes.clone()))
            }
            None => None,
        };
        self.chain = Some(chain);
        self.event_end = other.event_end;
        self.header = other.header;
        self.message_start = message_start;
        self.advance_length = other.advance_length;
        self.options_position = options_position;
        self.options_size = other.options_size;
        self.application_data = application_data;
        self.raw_application_data_size = other.raw_application_data_size;
        self.message_properties_size = other.message_properties_size;
        self.properties_readable = other.properties_readable;
        self.lazy_payload_size = other.lazy_payload_size.clone();
        self.options_view = other.options_view.clone();
        self.effective_policy = other.effective_policy;
        self.max_decompressed_size = other.max_decompressed_size;
        Ok(())
    }

    /// Restore the default-constructed (invalid) state, releasing the
    /// decompression buffer and every cache. The construction-time policy
    /// and size cap are kept.
    pub fn clear(&mut self) {
        self.chain = None;
        self.event_end = 0;
        self.effective_policy = self.constructor_policy;
        self.invalidate();
    }

    /// Advance to the next message.
    ///
    /// Returns [`Advance::Message`] when positioned on a valid message and
    /// [`Advance::EndOfEvent`] once the event is exhausted (the iterator
    /// turns invalid, and further calls keep returning `EndOfEvent`).
    ///
    /// # Errors
    ///
    /// Any structural violation yields an error and invalidates the
    /// iterator: truncation inside a header, inconsistent declared lengths,
    /// a padding byte outside `[1, 4]`, an unsupported codec, or codec
    /// failure.
    pub fn advance(&mut self) -> Result<Advance, PutEventError> {
        let (Some(chain), Some(step), Some(current)) =
            (self.chain, self.advance_length, self.message_start)
        else {
            return Ok(Advance::EndOfEvent);
        };
        self.clear_message_state();

        let mut cursor = ChainCursor::new(chain, current);
        if let Err(error) = cursor.advance(step) {
            self.invalidate();
            return Err(error.into());
        }
        let position = cursor.position();
        if position.logical_offset() >= self.event_end {
            self.invalidate();
            return Ok(Advance::EndOfEvent);
        }

        match self.load_message(chain, position) {
            Ok(()) => Ok(Advance::Message),
            Err(error) => {
                self.invalidate();
                Err(error)
            }
        }
    }

    /// Return whether `advance` may be called on this instance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.advance_length.is_some()
            && self
                .message_start
                .is_some_and(|start| start.logical_offset() < self.event_end)
    }

    /// The header of the current message.
    ///
    /// When the application data was decompressed this is a rewritten copy
    /// whose compression field reads as none; the on-wire header is
    /// untouched.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn header(&self) -> &PutHeader { self.header.as_ref().expect(NOT_ON_MESSAGE) }

    /// Return whether the current message carries a properties area.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn has_message_properties(&self) -> bool {
        self.header().has_flag(PutHeaderFlag::MessageProperties)
    }

    /// Size of the current message's application data: properties plus
    /// payload, padding excluded; the decompressed size when a policy
    /// applied.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn application_data_size(&self) -> usize {
        self.application_data
            .as_ref()
            .expect(NOT_ON_MESSAGE)
            .len()
    }

    /// On-wire size of the application data, padding excluded, regardless of
    /// any decompression.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn raw_application_data_size(&self) -> usize {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        self.raw_application_data_size
    }

    /// Replace `dst` with the application data bytes (decompressed when a
    /// policy applied).
    ///
    /// # Errors
    ///
    /// Returns an error if the chain copy fails.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn load_application_data(&self, dst: &mut Vec<u8>) -> Result<(), PutEventError> {
        dst.clear();
        self.copy_application_data(0, self.application_data_size(), dst)
    }

    /// Chain position of the application data. Defined only in zero-copy
    /// mode.
    ///
    /// # Errors
    ///
    /// Returns [`PutEventError::OwnedApplicationData`] when the data was
    /// decompressed into an owned buffer.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn application_data_position(&self) -> Result<Position, PutEventError> {
        match self.application_data.as_ref().expect(NOT_ON_MESSAGE) {
            ApplicationData::Aliased { start, .. } => Ok(*start),
            ApplicationData::Owned(_) => Err(PutEventError::OwnedApplicationData),
        }
    }

    /// Size of the properties area, sub-header and padding included; zero
    /// when the message has none.
    ///
    /// The size is measured on plain bytes: for a compressed message it is
    /// only available when the decompression policy applied to it, and reads
    /// as zero otherwise.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn message_properties_size(&self) -> usize {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        debug_assert!(self.properties_readable || self.message_properties_size == 0);
        self.message_properties_size
    }

    /// Chain position of the properties area, when the message has one and
    /// the application data is aliased.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn message_properties_position(&self) -> Option<Position> {
        if self.message_properties_size == 0 {
            return None;
        }
        match self.application_data.as_ref().expect(NOT_ON_MESSAGE) {
            ApplicationData::Aliased { start, .. } => Some(*start),
            ApplicationData::Owned(_) => None,
        }
    }

    /// Replace `dst` with the raw properties area bytes (sub-header and
    /// padding included); `dst` is emptied when the message has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain copy fails.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn load_message_properties_bytes(&self, dst: &mut Vec<u8>) -> Result<(), PutEventError> {
        dst.clear();
        if self.message_properties_size == 0 {
            return Ok(());
        }
        self.copy_application_data(0, self.message_properties_size, dst)
    }

    /// Decode the properties area into a structured
    /// [`MessageProperties`]; an empty value when the message has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain copy fails or the area is malformed.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn load_message_properties(&self) -> Result<MessageProperties, PutEventError> {
        if self.message_properties_size == 0 {
            return Ok(MessageProperties::default());
        }
        let mut area = Vec::new();
        self.copy_application_data(0, self.message_properties_size, &mut area)?;
        Ok(MessageProperties::decode(&area)?)
    }

    /// Size of the message payload: application data minus the properties
    /// area. Computed on first call and cached until the next advance.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn message_payload_size(&self) -> usize {
        if let Some(size) = self.lazy_payload_size.get() {
            return size;
        }
        let size = self.application_data_size() - self.message_properties_size;
        self.lazy_payload_size.set(Some(size));
        size
    }

    /// Replace `dst` with the payload bytes: the application data after the
    /// properties area.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain copy fails.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn load_message_payload(&self, dst: &mut Vec<u8>) -> Result<(), PutEventError> {
        dst.clear();
        self.copy_application_data(self.message_properties_size, self.message_payload_size(), dst)
    }

    /// Return whether the current message carries options.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn has_options(&self) -> bool {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        debug_assert_eq!(self.options_size == 0, self.options_position.is_none());
        self.options_size > 0
    }

    /// Size of the options area in bytes, zero when absent.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn options_size(&self) -> usize {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        self.options_size
    }

    /// Replace `dst` with the raw options-area bytes; `dst` is emptied when
    /// the message has none. Options always alias the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain copy fails.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn load_options(&self, dst: &mut Vec<u8>) -> Result<(), PutEventError> {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        dst.clear();
        if let Some(position) = self.options_position {
            let chain = self.chain.expect(NOT_ON_MESSAGE);
            chain.range(position, self.options_size)?.copy_into(dst);
        }
        Ok(())
    }

    /// The typed view over the current message's options, built on first
    /// call and cached until the next advance. An empty view when the
    /// message has none.
    ///
    /// # Errors
    ///
    /// Returns [`PutEventError::InvalidOption`] when a record's declared
    /// length overruns the area.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    pub fn options_view(&self) -> Result<&OptionsView, PutEventError> {
        debug_assert!(self.header.is_some(), "{NOT_ON_MESSAGE}");
        self.options_view
            .get_or_init(|| self.build_options_view())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Return whether the current message carries a message-group id
    /// option. A malformed options area reads as absent.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn has_msg_group_id(&self) -> bool {
        if !self.has_options() {
            return false;
        }
        self.options_view()
            .map(|view| view.find(OptionType::MsgGroupId).is_some())
            .unwrap_or(false)
    }

    /// Extract the message-group id of the current message. Returns `None`
    /// when the option is absent, malformed, or over-long.
    ///
    /// # Panics
    ///
    /// Panics unless the latest `advance` returned [`Advance::Message`].
    #[must_use]
    pub fn extract_msg_group_id(&self) -> Option<MsgGroupId> {
        let view = self.options_view().ok()?;
        view.msg_group_id().ok().flatten()
    }

    /// Render the first bytes of the bound chain for diagnostics.
    #[must_use]
    pub fn dump_blob(&self) -> HexDump<'a> { HexDump::new(self.chain, DUMP_LIMIT) }

    fn load_message(
        &mut self,
        chain: &'a BufferChain,
        position: Position,
    ) -> Result<(), PutEventError> {
        let remaining = self.event_end - position.logical_offset();
        let header = PutHeader::decode_at(chain, position, remaining)?;
        let header_size = header.header_size();
        let total_size = header.total_size();
        let options_size = header.options_size();

        let mut pad_cursor = ChainCursor::new(chain, position);
        pad_cursor.advance(total_size - 1)?;
        let pad = pad_cursor.read_u8()?;
        if !(PAD_MIN..=PAD_MAX).contains(&pad) {
            return Err(PutEventError::InvalidPadding { value: pad });
        }
        let pad = usize::from(pad);
        if header_size + options_size + pad > total_size {
            return Err(PutEventError::InvalidLength {
                context: "padding overlaps message content",
            });
        }
        let raw_size = total_size - header_size - options_size - pad;

        let mut cursor = ChainCursor::new(chain, position);
        cursor.advance(header_size)?;
        if options_size > 0 {
            self.options_position = Some(cursor.position());
            self.options_size = options_size;
        }
        cursor.advance(options_size)?;
        let raw_start = cursor.position();
        self.raw_application_data_size = raw_size;

        let compressed = header.compression_raw() != CompressionType::None.to_wire();
        let mut exposed = header;
        let decompressed = if compressed && self.effective_policy.wants_decompression(&header) {
            let raw = chain.range(raw_start, raw_size)?.to_vec();
            let inflated =
                decompress(header.compression_raw(), &raw, self.max_decompressed_size)?;
            exposed.clear_compression();
            self.application_data = Some(ApplicationData::Owned(inflated));
            true
        } else {
            self.application_data = Some(ApplicationData::Aliased {
                start: raw_start,
                len: raw_size,
            });
            false
        };

        self.properties_readable =
            header.has_flag(PutHeaderFlag::MessageProperties) && (decompressed || !compressed);
        if self.properties_readable {
            let mut sub = [0_u8; PropertiesHeader::ENCODED_MIN_LEN];
            self.read_application_data(0, &mut sub)?;
            let properties_header = PropertiesHeader::decode(&sub)?;
            let size = properties_header.total_size();
            if size > self.application_data.as_ref().map_or(0, ApplicationData::len) {
                return Err(PutEventError::InvalidLength {
                    context: "properties overrun application data",
                });
            }
            self.message_properties_size = size;
        }

        self.header = Some(exposed);
        self.message_start = Some(position);
        self.advance_length = Some(total_size);
        Ok(())
    }

    fn build_options_view(&self) -> Result<OptionsView, PutEventError> {
        let Some(position) = self.options_position else {
            return Ok(OptionsView::default());
        };
        let chain = self.chain.expect(NOT_ON_MESSAGE);
        let area = chain.range(position, self.options_size)?.to_vec();
        Ok(OptionsView::parse(area)?)
    }

    /// Gather `dst.len()` application-data bytes starting at `offset`.
    fn read_application_data(&self, offset: usize, dst: &mut [u8]) -> Result<(), PutEventError> {
        match self.application_data.as_ref().expect(NOT_ON_MESSAGE) {
            ApplicationData::Owned(bytes) => {
                let end = offset + dst.len();
                if end > bytes.len() {
                    return Err(PutEventError::InvalidLength {
                        context: "read past end of application data",
                    });
                }
                dst.copy_from_slice(&bytes[offset..end]);
                Ok(())
            }
            ApplicationData::Aliased { start, len } => {
                if offset + dst.len() > *len {
                    return Err(PutEventError::InvalidLength {
                        context: "read past end of application data",
                    });
                }
                let chain = self.chain.expect(NOT_ON_MESSAGE);
                let mut cursor = ChainCursor::new(chain, *start);
                cursor.advance(offset)?;
                cursor.read_into(dst)?;
                Ok(())
            }
        }
    }

    /// Append `len` application-data bytes starting at `offset` to `dst`.
    fn copy_application_data(
        &self,
        offset: usize,
        len: usize,
        dst: &mut Vec<u8>,
    ) -> Result<(), PutEventError> {
        match self.application_data.as_ref().expect(NOT_ON_MESSAGE) {
            ApplicationData::Owned(bytes) => {
                let end = offset + len;
                if end > bytes.len() {
                    return Err(PutEventError::InvalidLength {
                        context: "read past end of application data",
                    });
                }
                dst.extend_from_slice(&bytes[offset..end]);
                Ok(())
            }
            ApplicationData::Aliased {
                start,
                len: ad_len,
            } => {
                if offset + len > *ad_len {
                    return Err(PutEventError::InvalidLength {
                        context: "read past end of application data",
                    });
                }
                let chain = self.chain.expect(NOT_ON_MESSAGE);
                let mut cursor = ChainCursor::new(chain, *start);
                cursor.advance(offset)?;
                chain.range(cursor.position(), len)?.copy_into(dst);
                Ok(())
            }
        }
    }

    /// Drop every per-message cache; the chain binding survives.
    fn clear_message_state(&mut self) {
        self.header = None;
        self.options_position = None;
        self.options_size = 0;
        self.application_data = None;
        self.raw_application_data_size = 0;
        self.message_properties_size = 0;
        self.properties_readable = false;
        self.lazy_payload_size.set(None);
        self.options_view = OnceCell::new();
    }

    fn invalidate(&mut self) {
        self.clear_message_state();
        self.message_start = None;
        self.advance_length = None;
    }
}

impl Default for PutMessageIterator<'_> {
    fn default() -> Self { Self::new(DecompressPolicy::None) }
}

#[cfg(test)]
#[path = "iterator_tests.rs"]
mod tests;
