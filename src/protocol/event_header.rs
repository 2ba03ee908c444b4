//! The fixed header at the front of every event.

use crate::byte_order::{read_network_u32, write_network_u32};
use crate::chain::BufferChain;
use crate::error::PutEventError;

use super::WORD_SIZE;

const FRAGMENT_BIT: u8 = 0b1000_0000;
const TYPE_MASK: u8 = 0b0111_1111;

/// Kind of traffic an event carries.
///
/// This crate iterates PUT events only; the other values exist so encoders
/// and tests can construct non-PUT frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Session control traffic.
    Control,
    /// Producer-originated messages destined for a queue.
    Put,
    /// Consumer confirmations.
    Confirm,
    /// Broker-to-consumer delivery.
    Push,
    /// Broker acknowledgements to producers.
    Ack,
}

impl EventType {
    /// Decode the 7-bit wire value, if recognised.
    #[must_use]
    pub const fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Control),
            2 => Some(Self::Put),
            3 => Some(Self::Confirm),
            4 => Some(Self::Push),
            5 => Some(Self::Ack),
            _ => None,
        }
    }

    /// The 7-bit wire value.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Control => 1,
            Self::Put => 2,
            Self::Confirm => 3,
            Self::Push => 4,
            Self::Ack => 5,
        }
    }
}

/// The fixed structure at offset 0 of an event's buffer chain.
///
/// Layout (big-endian):
///
/// ```text
/// 0:    fragment(1 bit) | type(7 bits)
/// 1:    header_words(8)
/// 2..4: reserved
/// 4..8: total_length_bytes(u32)
/// ```
///
/// `header_words` permits future extension past the 2-word minimum; decoders
/// skip bytes they do not understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventHeader {
    fragment: bool,
    event_type: EventType,
    header_words: u8,
    total_length: u32,
}

impl EventHeader {
    /// Minimum header length in words for this protocol version.
    pub const MIN_HEADER_WORDS: u8 = 2;

    /// Encoded size of the minimum-version header, in bytes.
    pub const ENCODED_MIN_LEN: usize = Self::MIN_HEADER_WORDS as usize * WORD_SIZE;

    /// Assemble a minimum-version header.
    #[must_use]
    pub const fn new(event_type: EventType, total_length: u32) -> Self {
        Self {
            fragment: false,
            event_type,
            header_words: Self::MIN_HEADER_WORDS,
            total_length,
        }
    }

    /// Decode and structurally validate the event header at the front of
    /// `chain`.
    ///
    /// # Errors
    ///
    /// - [`PutEventError::TruncatedHeader`] if the chain is shorter than the
    ///   declared header length.
    /// - [`PutEventError::UnexpectedEventType`] if the type field is not PUT.
    /// - [`PutEventError::InvalidLength`] if the declared lengths are
    ///   inconsistent.
    pub fn decode(chain: &BufferChain) -> Result<Self, PutEventError> {
        if chain.len() < Self::ENCODED_MIN_LEN {
            return Err(PutEventError::TruncatedHeader {
                declared: Self::ENCODED_MIN_LEN,
                remaining: chain.len(),
            });
        }
        let mut raw = [0_u8; Self::ENCODED_MIN_LEN];
        chain.read_at(chain.start(), &mut raw)?;

        let type_raw = raw[0] & TYPE_MASK;
        let event_type = EventType::from_wire(type_raw)
            .filter(|kind| *kind == EventType::Put)
            .ok_or(PutEventError::UnexpectedEventType { found: type_raw })?;
        let header_words = raw[1];
        let total_length = read_network_u32([raw[4], raw[5], raw[6], raw[7]]);

        let header = Self {
            fragment: raw[0] & FRAGMENT_BIT != 0,
            event_type,
            header_words,
            total_length,
        };
        if header_words < Self::MIN_HEADER_WORDS {
            return Err(PutEventError::InvalidLength {
                context: "event header shorter than minimum",
            });
        }
        if header.header_size() > header.total_length() {
            return Err(PutEventError::InvalidLength {
                context: "event shorter than its header",
            });
        }
        if chain.len() < header.header_size() {
            return Err(PutEventError::TruncatedHeader {
                declared: header.header_size(),
                remaining: chain.len(),
            });
        }
        Ok(header)
    }

    /// Append the encoded header to `dst`, zero-filling reserved bytes.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        let mut first = self.event_type.to_wire();
        if self.fragment {
            first |= FRAGMENT_BIT;
        }
        dst.push(first);
        dst.push(self.header_words);
        dst.extend_from_slice(&[0, 0]);
        dst.extend_from_slice(&write_network_u32(self.total_length));
    }

    /// Return whether the fragment bit is set.
    #[must_use]
    pub const fn is_fragment(&self) -> bool { self.fragment }

    /// The event's traffic kind.
    #[must_use]
    pub const fn event_type(&self) -> EventType { self.event_type }

    /// Declared header length in words.
    #[must_use]
    pub const fn header_words(&self) -> u8 { self.header_words }

    /// Declared header length in bytes.
    #[must_use]
    pub const fn header_size(&self) -> usize { self.header_words as usize * WORD_SIZE }

    /// Total event length in bytes, header included.
    #[must_use]
    pub const fn total_length(&self) -> usize { self.total_length as usize }
}
