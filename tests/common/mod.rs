//! Shared fixtures for integration tests: a bit-exact PUT event builder.
#![allow(dead_code)] // each test binary uses a different subset

use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use putframe::properties::MessageProperties;
use putframe::protocol::{
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
    WORD_SIZE,
};
use putframe::{BufferChain, PropertyValue};

/// Compress `data` as a zlib stream.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}

/// Encode a message-group-id option record with protocol padding.
pub fn group_id_option(id: &[u8]) -> Vec<u8> {
    let pad = WORD_SIZE - id.len() % WORD_SIZE;
    let words = 1 + (id.len() + pad) / WORD_SIZE;
    let mut out =
        OptionHeader::encode(false, OptionType::MsgGroupId.to_wire(), words as u32).to_vec();
    out.extend_from_slice(id);
    out.resize(WORD_SIZE + id.len() + pad, pad as u8);
    out
}

/// Declarative description of one PUT message for the builder.
#[derive(Clone, Debug)]
pub struct PutMessageSpec {
    pub flags: PutHeaderFlags,
    pub compression_raw: u8,
    pub queue_id: u32,
    pub schema_id: SchemaId,
    pub options: Vec<u8>,
    pub properties: Vec<(String, PropertyValue)>,
    pub legacy_properties: bool,
    pub payload: Vec<u8>,
}

impl Default for PutMessageSpec {
    fn default() -> Self {
        Self {
            flags: PutHeaderFlags::empty(),
            compression_raw: 0,
            queue_id: 1,
            schema_id: SchemaId::new(1),
            options: Vec::new(),
            properties: Vec::new(),
            legacy_properties: false,
            payload: Vec::new(),
        }
    }
}

impl PutMessageSpec {
    /// A plain message carrying only `payload`.
    pub fn payload(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            ..Self::default()
        }
    }

    /// Attach a message-group-id option.
    #[must_use]
    pub fn with_group_id(mut self, id: &str) -> Self {
        self.options.extend_from_slice(&group_id_option(id.as_bytes()));
        self.flags = self.flags.with(PutHeaderFlag::Options);
        self
    }

    /// Attach a properties area; `legacy` selects the pre-schema format and
    /// marks the header's schema id accordingly.
    #[must_use]
    pub fn with_properties(mut self, legacy: bool, entries: &[(String, PropertyValue)]) -> Self {
        self.properties = entries.to_vec();
        self.legacy_properties = legacy;
        self.flags = self.flags.with(PutHeaderFlag::MessageProperties);
        if legacy {
            self.schema_id = SchemaId::LEGACY;
        }
        self
    }

    /// Compress the application data with zlib when building.
    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compression_raw = CompressionType::Zlib.to_wire();
        self
    }

    /// The logical (uncompressed) application data: properties area followed
    /// by payload.
    pub fn logical_application_data(&self) -> Vec<u8> {
        let mut plain = if self.flags.has(PutHeaderFlag::MessageProperties) {
            MessageProperties::encode_area(self.legacy_properties, &self.properties)
        } else {
            Vec::new()
        };
        plain.extend_from_slice(&self.payload);
        plain
    }

    fn wire_application_data(&self) -> Vec<u8> {
        let plain = self.logical_application_data();
        if self.compression_raw == CompressionType::Zlib.to_wire() {
            deflate(&plain)
        } else {
            plain
        }
    }

    fn encode_into(&self, dst: &mut Vec<u8>) {
        assert_eq!(self.options.len() % WORD_SIZE, 0, "options are word-aligned");
        let app_data = self.wire_application_data();
        let unpadded = PutHeader::ENCODED_MIN_LEN + self.options.len() + app_data.len();
        let pad = WORD_SIZE - unpadded % WORD_SIZE;
        let total = unpadded + pad;

        let header = PutHeader::from(PutHeaderFields {
            flags: self.flags,
            options_words: (self.options.len() / WORD_SIZE) as u32,
            compression_raw: self.compression_raw,
            total_words: (total / WORD_SIZE) as u32,
            queue_id: QueueId::new(self.queue_id),
            guid: MessageGuid::from_bytes([0x5A; 16]),
            crc32c: 0,
            schema_id: self.schema_id,
        });
        header.encode(dst);
        dst.extend_from_slice(&self.options);
        dst.extend_from_slice(&app_data);
        dst.resize(dst.len() + pad, pad as u8);
    }
}

/// Builder assembling a complete PUT event from message specs.
#[derive(Clone, Debug, Default)]
pub struct PutEventBuilder {
    messages: Vec<PutMessageSpec>,
}

impl PutEventBuilder {
    pub fn new() -> Self { Self::default() }

    /// Append one message.
    #[must_use]
    pub fn message(mut self, spec: PutMessageSpec) -> Self {
        self.messages.push(spec);
        self
    }

    /// Encode the whole event, header first.
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for message in &self.messages {
            message.encode_into(&mut body);
        }
        let mut out = Vec::new();
        let total_length = (EventHeader::ENCODED_MIN_LEN + body.len()) as u32;
        EventHeader::new(EventType::Put, total_length).encode(&mut out);
        out.extend_from_slice(&body);
        out
    }

    /// Encode the event and split it into `segment_size`-byte segments.
    pub fn build_chain(&self, segment_size: usize) -> BufferChain {
        segmented(&self.build(), segment_size)
    }
}

/// Split raw bytes into a chain of fixed-size segments.
pub fn segmented(raw: &[u8], segment_size: usize) -> BufferChain {
    BufferChain::new(
        raw.chunks(segment_size)
            .map(Bytes::copy_from_slice)
            .collect(),
    )
}
