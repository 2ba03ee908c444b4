//! Property-based round-trip checks over arbitrary built events.

mod common;

use common::{PutEventBuilder, PutMessageSpec};
use proptest::prelude::*;
use putframe::protocol::EventHeader;
use putframe::{Advance, DecompressPolicy, PropertyValue, PutMessageIterator};

#[derive(Clone, Debug)]
struct SpecCase {
    spec: PutMessageSpec,
    group_id: Option<String>,
}

fn case_strategy() -> impl Strategy<Value = SpecCase> {
    (
        proptest::collection::vec(any::<u8>(), 0..64),
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(("[a-z]{1,6}", any::<i32>())),
        any::<bool>(),
    )
        .prop_map(|(payload, group_id, property, compressed)| {
            let mut spec = PutMessageSpec::payload(&payload);
            if let Some(id) = &group_id {
                spec = spec.with_group_id(id);
            }
            if let Some((name, value)) = property {
                spec = spec.with_properties(false, &[(name, PropertyValue::Int32(value))]);
            }
            if compressed {
                spec = spec.compressed();
            }
            SpecCase { spec, group_id }
        })
}

fn event_strategy() -> impl Strategy<Value = (Vec<SpecCase>, usize)> {
    (proptest::collection::vec(case_strategy(), 0..6), 1_usize..32)
}

fn build_chain(cases: &[SpecCase], segment_size: usize) -> putframe::BufferChain {
    cases
        .iter()
        .fold(PutEventBuilder::new(), |builder, case| {
            builder.message(case.spec.clone())
        })
        .build_chain(segment_size)
}

proptest! {
    /// Iterating with `Always` recovers every message's logical bytes and
    /// group id.
    #[test]
    fn iteration_recovers_logical_application_data(
        (cases, segment_size) in event_strategy(),
    ) {
        let chain = build_chain(&cases, segment_size);
        let event_header = EventHeader::decode(&chain).expect("built event decodes");

        let mut iter = PutMessageIterator::new(DecompressPolicy::Always);
        iter.reset(&chain, &event_header, DecompressPolicy::Always)
            .expect("built event resets");

        let mut seen = 0;
        while let Advance::Message = iter.advance().expect("built event iterates") {
            let case = &cases[seen];
            let mut data = Vec::new();
            iter.load_application_data(&mut data).expect("copy");
            prop_assert_eq!(&data, &case.spec.logical_application_data());
            prop_assert_eq!(
                iter.extract_msg_group_id().map(|id| id.into_string()),
                case.group_id.clone()
            );
            prop_assert_eq!(iter.has_msg_group_id(), case.group_id.is_some());
            seen += 1;
        }
        prop_assert_eq!(seen, cases.len());
    }

    /// Under `None` every message aliases the chain and lengths account for
    /// the whole event.
    #[test]
    fn zero_copy_iteration_accounts_for_every_byte(
        (cases, segment_size) in event_strategy(),
    ) {
        let chain = build_chain(&cases, segment_size);
        let event_header = EventHeader::decode(&chain).expect("built event decodes");

        let mut iter = PutMessageIterator::new(DecompressPolicy::None);
        iter.reset(&chain, &event_header, DecompressPolicy::None)
            .expect("built event resets");

        let mut accounted = event_header.header_size();
        while let Advance::Message = iter.advance().expect("built event iterates") {
            let position = iter
                .application_data_position()
                .expect("aliased in zero-copy mode");
            let mut copied = Vec::new();
            iter.load_application_data(&mut copied).expect("copy");
            let sliced = chain
                .range(position, iter.application_data_size())
                .expect("in bounds")
                .to_vec();
            prop_assert_eq!(copied, sliced);
            accounted += iter.header().total_size();
        }
        prop_assert_eq!(accounted, event_header.total_length());
        prop_assert_eq!(accounted, chain.len());
    }
}
