//! Message-properties area framing and structured decoding.
//!
//! The iterator only peeks the area's outer framing (its sub-header declares
//! the total length, padding included); the structured decoder here turns the
//! raw area bytes into typed name/value entries on demand.

use thiserror::Error;

use crate::byte_order::{
    read_network_u16,
    read_network_u32,
    read_network_u64,
    write_network_u16,
    write_network_u32,
    write_network_u64,
};
use crate::protocol::{PAD_MAX, PAD_MIN, WORD_SIZE};

/// Errors produced while decoding a message-properties area.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// The area is shorter than its framing requires.
    #[error("properties area truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes the framing requires.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },
    /// The sub-header fields are inconsistent.
    #[error("properties header invalid: {context}")]
    InvalidHeader {
        /// Which framing rule was broken.
        context: &'static str,
    },
    /// The area's padding byte is outside `[1, 4]`.
    #[error("invalid padding byte {value:#04x} in properties area")]
    InvalidPadding {
        /// The byte found where the pad count was expected.
        value: u8,
    },
    /// A property entry carries an unrecognised type tag.
    #[error("unknown property type {raw}")]
    UnknownPropertyType {
        /// Raw type tag.
        raw: u8,
    },
    /// A property name is not valid UTF-8.
    #[error("property name is not valid UTF-8")]
    InvalidName,
    /// A property value does not match its declared type.
    #[error("property value malformed: {context}")]
    InvalidValue {
        /// Which typed-width rule was broken.
        context: &'static str,
    },
}

/// The fixed sub-header at the front of a message-properties area.
///
/// Layout (big-endian):
///
/// ```text
/// 0:    header_words(8)
/// 1:    schema_format(8)   0 = legacy (pre-schema), 1 = schema-bearing
/// 2..4: num_properties(u16)
/// 4..8: total_words(u32)   whole area incl. sub-header and padding
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertiesHeader {
    header_words: u8,
    schema_format: u8,
    num_properties: u16,
    total_words: u32,
}

impl PropertiesHeader {
    /// Minimum sub-header length in words for this protocol version.
    pub const MIN_HEADER_WORDS: u8 = 2;

    /// Encoded size of the minimum-version sub-header, in bytes.
    pub const ENCODED_MIN_LEN: usize = Self::MIN_HEADER_WORDS as usize * WORD_SIZE;

    /// Assemble a sub-header.
    #[must_use]
    pub const fn new(legacy: bool, num_properties: u16, total_words: u32) -> Self {
        Self {
            header_words: Self::MIN_HEADER_WORDS,
            schema_format: if legacy { 0 } else { 1 },
            num_properties,
            total_words,
        }
    }

    /// Decode and validate the sub-header at the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Truncated`] or
    /// [`PropertiesError::InvalidHeader`] when the framing is inconsistent.
    pub fn decode(bytes: &[u8]) -> Result<Self, PropertiesError> {
        if bytes.len() < Self::ENCODED_MIN_LEN {
            return Err(PropertiesError::Truncated {
                needed: Self::ENCODED_MIN_LEN,
                available: bytes.len(),
            });
        }
        let header = Self {
            header_words: bytes[0],
            schema_format: bytes[1],
            num_properties: read_network_u16([bytes[2], bytes[3]]),
            total_words: read_network_u32([bytes[4], bytes[5], bytes[6], bytes[7]]),
        };
        if header.header_words < Self::MIN_HEADER_WORDS {
            return Err(PropertiesError::InvalidHeader {
                context: "sub-header shorter than minimum",
            });
        }
        if header.schema_format > 1 {
            return Err(PropertiesError::InvalidHeader {
                context: "unknown schema format",
            });
        }
        if header.total_words < u32::from(header.header_words) {
            return Err(PropertiesError::InvalidHeader {
                context: "area shorter than its sub-header",
            });
        }
        Ok(header)
    }

    /// Append the encoded sub-header to `dst`.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.push(self.header_words);
        dst.push(self.schema_format);
        dst.extend_from_slice(&write_network_u16(self.num_properties));
        dst.extend_from_slice(&write_network_u32(self.total_words));
    }

    /// Sub-header length in bytes.
    #[must_use]
    pub const fn header_size(&self) -> usize { self.header_words as usize * WORD_SIZE }

    /// Whole-area length in bytes, sub-header and padding included.
    #[must_use]
    pub const fn total_size(&self) -> usize { self.total_words as usize * WORD_SIZE }

    /// Declared number of property entries.
    #[must_use]
    pub const fn num_properties(&self) -> u16 { self.num_properties }

    /// Return whether the area uses the legacy (pre-schema) format.
    #[must_use]
    pub const fn is_legacy(&self) -> bool { self.schema_format == 0 }
}

impl Default for PropertiesHeader {
    fn default() -> Self { Self::new(false, 0, u32::from(Self::MIN_HEADER_WORDS)) }
}

/// A typed property value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    /// Single-byte boolean.
    Bool(bool),
    /// Big-endian 32-bit signed integer.
    Int32(i32),
    /// Big-endian 64-bit signed integer.
    Int64(i64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl PropertyValue {
    const fn type_tag(&self) -> u8 {
        match self {
            Self::Bool(_) => 1,
            Self::Int32(_) => 2,
            Self::Int64(_) => 3,
            Self::String(_) => 4,
            Self::Binary(_) => 5,
        }
    }
}

/// One decoded name/value property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Typed value.
    pub value: PropertyValue,
}

/// A fully decoded message-properties area.
///
/// # Examples
///
/// ```
/// use putframe::properties::{MessageProperties, PropertyValue};
///
/// let encoded = MessageProperties::encode_area(
///     false,
///     &[("region".into(), PropertyValue::String("eu".into()))],
/// );
/// let props = MessageProperties::decode(&encoded).expect("valid area");
/// assert_eq!(props.get("region"), Some(&PropertyValue::String("eu".into())));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageProperties {
    header: PropertiesHeader,
    entries: Vec<Property>,
}

impl MessageProperties {
    /// Decode a whole properties area, sub-header and padding included.
    ///
    /// `bytes` may extend past the area; only the declared length is read.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertiesError`] when the framing, padding, or any entry
    /// is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, PropertiesError> {
        let header = PropertiesHeader::decode(bytes)?;
        let total = header.total_size();
        if bytes.len() < total {
            return Err(PropertiesError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        let area = &bytes[..total];
        let pad = area[total - 1];
        if !(PAD_MIN..=PAD_MAX).contains(&pad) {
            return Err(PropertiesError::InvalidPadding { value: pad });
        }
        let body_end = total - pad as usize;
        if body_end < header.header_size() {
            return Err(PropertiesError::InvalidHeader {
                context: "padding overlaps sub-header",
            });
        }

        let mut body = &area[header.header_size()..body_end];
        let mut entries = Vec::with_capacity(usize::from(header.num_properties()));
        for _ in 0..header.num_properties() {
            entries.push(decode_entry(&mut body)?);
        }
        if !body.is_empty() {
            return Err(PropertiesError::InvalidHeader {
                context: "property entries do not fill the declared area",
            });
        }
        Ok(Self { header, entries })
    }

    /// Encode a complete properties area for the given entries, padded to a
    /// word boundary. Used by encoders and test fixtures.
    #[must_use]
    pub fn encode_area(legacy: bool, entries: &[(String, PropertyValue)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in entries {
            encode_entry(&mut body, name, value);
        }
        let unpadded = PropertiesHeader::ENCODED_MIN_LEN + body.len();
        let pad = WORD_SIZE - unpadded % WORD_SIZE;
        let total_words = ((unpadded + pad) / WORD_SIZE) as u32;

        let mut out = Vec::with_capacity(unpadded + pad);
        let count = u16::try_from(entries.len()).expect("property count fits in u16");
        PropertiesHeader::new(legacy, count, total_words).encode(&mut out);
        out.extend_from_slice(&body);
        out.resize(unpadded + pad, pad as u8);
        out
    }

    /// The decoded sub-header.
    #[must_use]
    pub const fn header(&self) -> &PropertiesHeader { &self.header }

    /// Return whether the area uses the legacy format.
    #[must_use]
    pub const fn is_legacy(&self) -> bool { self.header.is_legacy() }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Return whether no properties are present.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Look up a property value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    /// Iterate the properties in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> { self.entries.iter() }
}

/// Entry layout: `type(8) | name_len(8) | value_len(u16)`, then name bytes,
/// then value bytes; entries are not individually padded.
fn decode_entry(body: &mut &[u8]) -> Result<Property, PropertiesError> {
    let header = take(body, 4)?;
    let type_raw = header[0];
    let name_len = usize::from(header[1]);
    let value_len = usize::from(read_network_u16([header[2], header[3]]));

    let name = std::str::from_utf8(take(body, name_len)?)
        .map_err(|_| PropertiesError::InvalidName)?
        .to_owned();
    let raw_value = take(body, value_len)?;

    let value = match type_raw {
        1 => match raw_value {
            [0] => PropertyValue::Bool(false),
            [1] => PropertyValue::Bool(true),
            _ => {
                return Err(PropertiesError::InvalidValue {
                    context: "bool value must be one byte of 0 or 1",
                });
            }
        },
        2 => {
            let raw: [u8; 4] = raw_value.try_into().map_err(|_| {
                PropertiesError::InvalidValue {
                    context: "int32 value must be four bytes",
                }
            })?;
            PropertyValue::Int32(read_network_u32(raw) as i32)
        }
        3 => {
            let raw: [u8; 8] = raw_value.try_into().map_err(|_| {
                PropertiesError::InvalidValue {
                    context: "int64 value must be eight bytes",
                }
            })?;
            PropertyValue::Int64(read_network_u64(raw) as i64)
        }
        4 => PropertyValue::String(
            std::str::from_utf8(raw_value)
                .map_err(|_| PropertiesError::InvalidValue {
                    context: "string value is not valid UTF-8",
                })?
                .to_owned(),
        ),
        5 => PropertyValue::Binary(raw_value.to_vec()),
        raw => return Err(PropertiesError::UnknownPropertyType { raw }),
    };
    Ok(Property { name, value })
}

fn encode_entry(dst: &mut Vec<u8>, name: &str, value: &PropertyValue) {
    let raw_value = match value {
        PropertyValue::Bool(flag) => vec![u8::from(*flag)],
        PropertyValue::Int32(number) => write_network_u32(*number as u32).to_vec(),
        PropertyValue::Int64(number) => write_network_u64(*number as u64).to_vec(),
        PropertyValue::String(text) => text.as_bytes().to_vec(),
        PropertyValue::Binary(bytes) => bytes.clone(),
    };
    dst.push(value.type_tag());
    dst.push(u8::try_from(name.len()).expect("property name fits in u8"));
    dst.extend_from_slice(&write_network_u16(
        u16::try_from(raw_value.len()).expect("property value fits in u16"),
    ));
    dst.extend_from_slice(name.as_bytes());
    dst.extend_from_slice(&raw_value);
}

fn take<'a>(body: &mut &'a [u8], len: usize) -> Result<&'a [u8], PropertiesError> {
    if body.len() < len {
        return Err(PropertiesError::Truncated {
            needed: len,
            available: body.len(),
        });
    }
    let (head, tail) = body.split_at(len);
    *body = tail;
    Ok(head)
}

#[cfg(test)]
#[path = "properties_tests.rs"]
mod tests;
