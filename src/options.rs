//! Typed view over the options area of one PUT message.
//!
//! The view is built lazily on the first options-sensitive accessor and
//! cached until the iterator advances. Unknown record types are skipped by
//! length so new options can roll out without breaking old readers.

use std::ops::Range;

use thiserror::Error;

use crate::byte_order::read_network_u32;
use crate::protocol::{
    OptionHeader,
    OptionType,
    MSG_GROUP_ID_MAX_LENGTH,
    OPTION_WORDS_SENTINEL,
    PAD_MAX,
    PAD_MIN,
    WORD_SIZE,
};

/// Errors produced while parsing option records.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// A record's declared length extends past the options area.
    #[error("record overruns options area: {context}")]
    Overrun {
        /// Which bound was exceeded.
        context: &'static str,
    },
    /// A record's framing fields are inconsistent.
    #[error("record malformed: {context}")]
    Malformed {
        /// Which framing rule was broken.
        context: &'static str,
    },
    /// A message-group identifier exceeds the protocol maximum.
    #[error("message-group id of {len} bytes exceeds the {max} byte maximum")]
    GroupIdTooLong {
        /// Length found on the wire.
        len: usize,
        /// Protocol maximum.
        max: usize,
    },
    /// A message-group identifier is not valid UTF-8.
    #[error("message-group id is not valid UTF-8")]
    GroupIdNotUtf8,
}

/// A bounded-length message-group identifier.
///
/// # Examples
///
/// ```
/// use putframe::options::MsgGroupId;
///
/// let id = MsgGroupId::try_from("g1").expect("short id");
/// assert_eq!(id.as_str(), "g1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MsgGroupId(String);

impl MsgGroupId {
    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Consume the wrapper and return the identifier text.
    #[must_use]
    pub fn into_string(self) -> String { self.0 }
}

impl TryFrom<&str> for MsgGroupId {
    type Error = OptionsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() > MSG_GROUP_ID_MAX_LENGTH {
            return Err(OptionsError::GroupIdTooLong {
                len: value.len(),
                max: MSG_GROUP_ID_MAX_LENGTH,
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl std::fmt::Display for MsgGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One parsed option record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionEntry {
    type_raw: u8,
    packed: bool,
    inline_value: Option<u32>,
    payload: Range<usize>,
}

impl OptionEntry {
    /// Raw 7-bit type tag.
    #[must_use]
    pub const fn type_raw(&self) -> u8 { self.type_raw }

    /// Typed option kind, when the tag is recognised.
    #[must_use]
    pub const fn option_type(&self) -> Option<OptionType> {
        OptionType::from_wire(self.type_raw)
    }

    /// Return whether the record is packed (inline value, no payload).
    #[must_use]
    pub const fn is_packed(&self) -> bool { self.packed }

    /// Inline value of a packed record.
    #[must_use]
    pub const fn inline_value(&self) -> Option<u32> { self.inline_value }

    /// Payload length in bytes (zero for packed records).
    #[must_use]
    pub fn payload_len(&self) -> usize { self.payload.len() }
}

/// A parsed, validated view over one message's options area.
///
/// Construction walks every record once; lookups afterwards are linear over
/// the handful of parsed entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionsView {
    area: Vec<u8>,
    entries: Vec<OptionEntry>,
}

impl OptionsView {
    /// Parse the gathered bytes of an options area.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionsError`] if any record's declared length overruns
    /// the area or its framing fields are inconsistent.
    pub fn parse(area: Vec<u8>) -> Result<Self, OptionsError> {
        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < area.len() {
            if area.len() - offset < WORD_SIZE {
                return Err(OptionsError::Overrun {
                    context: "record header extends past area",
                });
            }
            let header = OptionHeader::decode(
                area[offset..offset + WORD_SIZE]
                    .try_into()
                    .expect("slice length is fixed"),
            );
            let (record_len, payload, inline_value) = if header.is_packed() {
                (WORD_SIZE, offset + WORD_SIZE..offset + WORD_SIZE, Some(header.words()))
            } else if header.words() == OPTION_WORDS_SENTINEL {
                if area.len() - offset < 2 * WORD_SIZE {
                    return Err(OptionsError::Overrun {
                        context: "extended length word extends past area",
                    });
                }
                let words = read_network_u32(
                    area[offset + WORD_SIZE..offset + 2 * WORD_SIZE]
                        .try_into()
                        .expect("slice length is fixed"),
                );
                if words < 2 {
                    return Err(OptionsError::Malformed {
                        context: "extended record shorter than its framing",
                    });
                }
                let record_len = words as usize * WORD_SIZE;
                (record_len, offset + 2 * WORD_SIZE..offset + record_len, None)
            } else {
                if header.words() == 0 {
                    return Err(OptionsError::Malformed {
                        context: "record length of zero words",
                    });
                }
                let record_len = header.words() as usize * WORD_SIZE;
                (record_len, offset + WORD_SIZE..offset + record_len, None)
            };
            if record_len > area.len() - offset {
                return Err(OptionsError::Overrun {
                    context: "record length extends past area",
                });
            }
            entries.push(OptionEntry {
                type_raw: header.type_raw(),
                packed: header.is_packed(),
                inline_value,
                payload,
            });
            offset += record_len;
        }
        Ok(Self { area, entries })
    }

    /// Number of records in the area.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Return whether the area holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Iterate the records in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> { self.entries.iter() }

    /// Find the first record of the given type.
    #[must_use]
    pub fn find(&self, kind: OptionType) -> Option<&OptionEntry> {
        self.entries
            .iter()
            .find(|entry| entry.type_raw == kind.to_wire())
    }

    /// Raw payload bytes of `entry`, padding included.
    #[must_use]
    pub fn payload(&self, entry: &OptionEntry) -> &[u8] { &self.area[entry.payload.clone()] }

    /// Extract the message-group identifier, if present.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionsError`] when the record exists but is packed, has
    /// bad padding, exceeds the length bound, or is not UTF-8. A missing
    /// record is `Ok(None)`.
    pub fn msg_group_id(&self) -> Result<Option<MsgGroupId>, OptionsError> {
        let Some(entry) = self.find(OptionType::MsgGroupId) else {
            return Ok(None);
        };
        if entry.is_packed() {
            return Err(OptionsError::Malformed {
                context: "message-group id cannot be packed",
            });
        }
        let payload = self.payload(entry);
        let Some(&pad) = payload.last() else {
            return Err(OptionsError::Malformed {
                context: "message-group id payload is empty",
            });
        };
        if !(PAD_MIN..=PAD_MAX).contains(&pad) || usize::from(pad) > payload.len() {
            return Err(OptionsError::Malformed {
                context: "message-group id padding out of range",
            });
        }
        let id = &payload[..payload.len() - usize::from(pad)];
        if id.len() > MSG_GROUP_ID_MAX_LENGTH {
            return Err(OptionsError::GroupIdTooLong {
                len: id.len(),
                max: MSG_GROUP_ID_MAX_LENGTH,
            });
        }
        let text = std::str::from_utf8(id).map_err(|_| OptionsError::GroupIdNotUtf8)?;
        Ok(Some(MsgGroupId(text.to_owned())))
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
