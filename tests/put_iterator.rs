//! End-to-end iteration scenarios over built PUT events.

mod common;

use common::{PutEventBuilder, PutMessageSpec};
use putframe::byte_order::write_network_u32;
use putframe::protocol::{CompressionType, EventHeader, PutHeader, WORD_SIZE};
use putframe::{
    Advance,
    BufferChain,
    DecompressPolicy,
    PropertyValue,
    PutEventError,
    PutMessageIterator,
};

fn armed(chain: &BufferChain, policy: DecompressPolicy) -> PutMessageIterator<'_> {
    let event_header = EventHeader::decode(chain).expect("valid event header");
    let mut iter = PutMessageIterator::new(policy);
    iter.reset(chain, &event_header, policy).expect("valid reset");
    iter
}

#[test]
fn empty_event_yields_no_messages() {
    let chain = BufferChain::from_slice(&PutEventBuilder::new().build());
    let mut iter = armed(&chain, DecompressPolicy::None);

    assert_eq!(iter.advance().expect("end"), Advance::EndOfEvent);
    assert!(!iter.is_valid());
}

#[test]
fn single_uncompressed_message_round_trips() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"hello"))
        .build_chain(4);
    let mut iter = armed(&chain, DecompressPolicy::None);

    assert_eq!(iter.advance().expect("one message"), Advance::Message);
    assert_eq!(iter.application_data_size(), 5);
    assert_eq!(iter.message_properties_size(), 0);

    let mut payload = Vec::new();
    iter.load_message_payload(&mut payload).expect("copy");
    assert_eq!(payload, b"hello");

    assert_eq!(iter.advance().expect("end"), Advance::EndOfEvent);
    assert!(!iter.is_valid());
}

#[test]
fn group_id_surfaces_per_message() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"grouped").with_group_id("g1"))
        .message(PutMessageSpec::payload(b"plain"))
        .build_chain(16);
    let mut iter = armed(&chain, DecompressPolicy::None);

    assert_eq!(iter.advance().expect("first"), Advance::Message);
    assert!(iter.has_options());
    assert!(iter.has_msg_group_id());
    assert_eq!(iter.extract_msg_group_id().expect("present").as_str(), "g1");

    assert_eq!(iter.advance().expect("second"), Advance::Message);
    assert!(!iter.has_options());
    assert!(!iter.has_msg_group_id());
    assert_eq!(iter.extract_msg_group_id(), None);

    assert_eq!(iter.advance().expect("end"), Advance::EndOfEvent);
}

#[test]
fn compressed_application_data_per_policy() {
    let spec = PutMessageSpec::payload(b"abcdef").compressed();
    let compressed_len = common::deflate(b"abcdef").len();
    let chain = PutEventBuilder::new().message(spec).build_chain(8);

    let mut iter = armed(&chain, DecompressPolicy::Always);
    assert_eq!(iter.advance().expect("message"), Advance::Message);
    assert_eq!(iter.application_data_size(), 6);
    assert_eq!(iter.header().compression_type(), Some(CompressionType::None));
    let mut data = Vec::new();
    iter.load_application_data(&mut data).expect("owned copy");
    assert_eq!(data, b"abcdef");

    let mut iter = armed(&chain, DecompressPolicy::None);
    assert_eq!(iter.advance().expect("message"), Advance::Message);
    assert_eq!(iter.application_data_size(), compressed_len);
    assert_eq!(iter.header().compression_type(), Some(CompressionType::Zlib));
    iter.load_application_data(&mut data).expect("aliased copy");
    assert_eq!(data, common::deflate(b"abcdef"));
}

#[test]
fn legacy_properties_measured_after_policy_decompression() {
    let entries = vec![(
        "source".to_owned(),
        PropertyValue::String("probe".to_owned()),
    )];
    let spec = PutMessageSpec::payload(b"body")
        .with_properties(true, &entries)
        .compressed();
    let properties_len = spec.logical_application_data().len() - b"body".len();
    let chain = PutEventBuilder::new().message(spec).build_chain(8);

    let mut iter = armed(&chain, DecompressPolicy::OnlyOldFormatProperties);
    assert_eq!(iter.advance().expect("message"), Advance::Message);
    assert_eq!(iter.message_properties_size(), properties_len);
    assert_eq!(iter.message_payload_size(), 4);
    let properties = iter.load_message_properties().expect("decodes");
    assert!(properties.is_legacy());
    assert_eq!(
        properties.get("source"),
        Some(&PropertyValue::String("probe".to_owned()))
    );

    // Without a decompression policy the message still iterates.
    let mut iter = armed(&chain, DecompressPolicy::None);
    assert_eq!(iter.advance().expect("message"), Advance::Message);
    assert!(iter.has_message_properties());
}

#[test]
fn truncation_inside_second_header_is_reported() {
    let raw = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"ok"))
        .message(PutMessageSpec::payload(b"never parsed"))
        .build();
    // Cut the event one byte short of the second message's fixed header and
    // rewrite the declared total length to match.
    let unpadded = PutHeader::ENCODED_MIN_LEN + b"ok".len();
    let first_total = unpadded + (WORD_SIZE - unpadded % WORD_SIZE);
    let cut = EventHeader::ENCODED_MIN_LEN + first_total + PutHeader::ENCODED_MIN_LEN - 1;
    let mut truncated = raw[..cut].to_vec();
    truncated[4..8].copy_from_slice(&write_network_u32(cut as u32));

    let chain = BufferChain::from_slice(&truncated);
    let mut iter = armed(&chain, DecompressPolicy::None);

    assert_eq!(iter.advance().expect("first message"), Advance::Message);
    assert_eq!(
        iter.advance().expect_err("second header cut"),
        PutEventError::TruncatedHeader {
            declared: 40,
            remaining: 39,
        }
    );
    assert!(!iter.is_valid());
    assert_eq!(iter.advance().expect("sticky end"), Advance::EndOfEvent);
}

#[test]
fn message_lengths_sum_to_event_length() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"alpha"))
        .message(PutMessageSpec::payload(b"beta").with_group_id("orders"))
        .message(PutMessageSpec::payload(&[0xFF; 41]))
        .build_chain(10);
    let event_header = EventHeader::decode(&chain).expect("valid event header");
    let mut iter = armed(&chain, DecompressPolicy::None);

    let mut total = event_header.header_size();
    while let Advance::Message = iter.advance().expect("valid event") {
        total += iter.header().total_size();
    }
    assert_eq!(total, event_header.total_length());
    assert_eq!(total, chain.len());
}

#[test]
fn clear_and_reset_reproduce_the_same_sequence() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"one").with_group_id("g"))
        .message(PutMessageSpec::payload(b"two"))
        .build_chain(5);
    let event_header = EventHeader::decode(&chain).expect("valid event header");
    let mut iter = PutMessageIterator::new(DecompressPolicy::None);

    let mut runs = Vec::new();
    for _ in 0..2 {
        iter.clear();
        iter.reset(&chain, &event_header, DecompressPolicy::None)
            .expect("valid reset");
        let mut run = Vec::new();
        while let Advance::Message = iter.advance().expect("valid event") {
            let mut payload = Vec::new();
            iter.load_message_payload(&mut payload).expect("copy");
            run.push((
                payload,
                iter.options_size(),
                iter.extract_msg_group_id().map(|id| id.into_string()),
            ));
        }
        runs.push(run);
    }
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0].len(), 2);
}

#[test]
fn zero_copy_discipline_under_policy_none() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"alpha"))
        .message(PutMessageSpec::payload(b"bravo").compressed())
        .build_chain(6);
    let mut iter = armed(&chain, DecompressPolicy::None);

    while let Advance::Message = iter.advance().expect("valid event") {
        let position = iter
            .application_data_position()
            .expect("aliased in zero-copy mode");
        let mut copied = Vec::new();
        iter.load_application_data(&mut copied).expect("copy");
        let sliced = chain
            .range(position, iter.application_data_size())
            .expect("in bounds")
            .to_vec();
        assert_eq!(copied, sliced);
    }
}

#[test]
fn options_accessors_agree() {
    let chain = PutEventBuilder::new()
        .message(PutMessageSpec::payload(b"with").with_group_id("k7"))
        .message(PutMessageSpec::payload(b"without"))
        .build_chain(16);
    let mut iter = armed(&chain, DecompressPolicy::None);

    while let Advance::Message = iter.advance().expect("valid event") {
        let view = iter.options_view().expect("parseable options");
        assert_eq!(iter.has_options(), iter.options_size() > 0);
        assert_eq!(iter.has_options(), !view.is_empty());

        let mut raw = Vec::new();
        iter.load_options(&mut raw).expect("copy");
        assert_eq!(raw.len(), iter.options_size());
    }
}
