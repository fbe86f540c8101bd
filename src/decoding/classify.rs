//! Routing of decoded events to typed records.
//!
//! Attributes are read by position, never by key: the order in which the
//! claims and IBC modules emit them is part of the source data's contract.

use thiserror::Error;

use super::attributes::{decode_event, DecodeError, DecodedEvent};
use crate::rpc::RawEvent;
use crate::types::records::{ClaimEvent, MergeEvent, PacketData, UnknownClaimAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `recipient`, `claimed_coins`, `fund_community_pool_coins`
    MergeClaimsRecords,
    /// `sender`, `amount`, `action`
    Claim,
    /// `packet_data` (JSON)
    RecvPacket,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "merge_claims_records" => Some(EventKind::MergeClaimsRecords),
            "claim" => Some(EventKind::Claim),
            "recv_packet" => Some(EventKind::RecvPacket),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::MergeClaimsRecords => "merge_claims_records",
            EventKind::Claim => "claim",
            EventKind::RecvPacket => "recv_packet",
        }
    }

    fn arity(&self) -> usize {
        match self {
            EventKind::MergeClaimsRecords | EventKind::Claim => 3,
            EventKind::RecvPacket => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    Merge(MergeEvent),
    Claim(ClaimEvent),
    PacketReceipt(PacketData),
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("'{event_type}' needs {expected} attributes, found {found}")]
    TooFewAttributes {
        event_type: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    UnknownAction(#[from] UnknownClaimAction),

    #[error("invalid packet data: {0}")]
    PacketData(#[from] serde_json::Error),
}

/// Decodes and classifies one raw event.
///
/// Returns `None` for event types that are not of interest; those are never
/// decoded. An error only invalidates this event.
pub fn read_event(raw: &RawEvent, height: u64) -> Option<Result<ClassifiedEvent, ClassifyError>> {
    let kind = EventKind::from_tag(&raw.kind)?;
    Some(
        decode_event(raw)
            .map_err(ClassifyError::from)
            .and_then(|decoded| classify(&decoded, kind, height)),
    )
}

/// Builds the typed record for an already decoded event of `kind`.
pub fn classify(
    event: &DecodedEvent,
    kind: EventKind,
    height: u64,
) -> Result<ClassifiedEvent, ClassifyError> {
    let expected = kind.arity();
    if event.attributes.len() < expected {
        return Err(ClassifyError::TooFewAttributes {
            event_type: kind.tag(),
            expected,
            found: event.attributes.len(),
        });
    }
    let value = |position: usize| event.value(position).unwrap_or_default().to_string();

    let classified = match kind {
        EventKind::MergeClaimsRecords => ClassifiedEvent::Merge(MergeEvent {
            height,
            recipient: value(0),
            claimed_coins: value(1),
            fund_community_pool_coins: value(2),
        }),
        EventKind::Claim => ClassifiedEvent::Claim(ClaimEvent {
            height,
            sender: value(0),
            amount: value(1),
            action: value(2).parse()?,
        }),
        EventKind::RecvPacket => {
            ClassifiedEvent::PacketReceipt(serde_json::from_str(&value(0))?)
        }
    };

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::raw_event;
    use crate::types::records::ClaimAction;

    #[test]
    fn test_merge_claims_records_positional() {
        let raw = raw_event(
            "merge_claims_records",
            &[
                ("recipient", "evmos1recipient"),
                ("claimed_coins", "2500aevmos"),
                ("fund_community_pool_coins", "10aevmos"),
            ],
        );

        let event = read_event(&raw, 300_000).unwrap().unwrap();
        assert_eq!(
            event,
            ClassifiedEvent::Merge(MergeEvent {
                height: 300_000,
                recipient: "evmos1recipient".to_string(),
                claimed_coins: "2500aevmos".to_string(),
                fund_community_pool_coins: "10aevmos".to_string(),
            })
        );
    }

    #[test]
    fn test_claim_ignores_attribute_keys() {
        // Keys deliberately mislabelled: only positions matter.
        let raw = raw_event(
            "claim",
            &[
                ("action", "evmos1sender"),
                ("sender", "99aevmos"),
                ("amount", "ACTION_EVM"),
            ],
        );

        match read_event(&raw, 5).unwrap().unwrap() {
            ClassifiedEvent::Claim(claim) => {
                assert_eq!(claim.sender, "evmos1sender");
                assert_eq!(claim.amount, "99aevmos");
                assert_eq!(claim.action, ClaimAction::Evm);
                assert_eq!(claim.height, 5);
            }
            other => panic!("expected claim, got {:?}", other),
        }
    }

    #[test]
    fn test_recv_packet_extracts_sender() {
        let raw = raw_event(
            "recv_packet",
            &[
                (
                    "packet_data",
                    r#"{"amount":"1","denom":"uosmo","receiver":"evmos1r","sender":"osmo1s"}"#,
                ),
                ("packet_sequence", "12"),
            ],
        );

        match read_event(&raw, 1).unwrap().unwrap() {
            ClassifiedEvent::PacketReceipt(packet) => assert_eq!(packet.sender, "osmo1s"),
            other => panic!("expected packet receipt, got {:?}", other),
        }
    }

    #[test]
    fn test_short_attribute_list_fails_event() {
        let raw = raw_event("claim", &[("sender", "evmos1s"), ("amount", "1aevmos")]);
        let err = read_event(&raw, 1).unwrap().unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::TooFewAttributes {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_claim_action_fails_event() {
        let raw = raw_event(
            "claim",
            &[("sender", "evmos1s"), ("amount", "1aevmos"), ("action", "ACTION_SWAP")],
        );
        assert!(matches!(
            read_event(&raw, 1).unwrap(),
            Err(ClassifyError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_invalid_packet_json_fails_event() {
        let raw = raw_event("recv_packet", &[("packet_data", "{not json")]);
        assert!(matches!(
            read_event(&raw, 1).unwrap(),
            Err(ClassifyError::PacketData(_))
        ));
    }

    #[test]
    fn test_other_event_types_are_not_decoded() {
        let raw = RawEvent {
            kind: "transfer".to_string(),
            attributes: vec![crate::rpc::RawAttribute {
                key: None,
                value: Some("%%% not base64 %%%".to_string()),
                index: false,
            }],
        };
        assert!(read_event(&raw, 1).is_none());
    }
}
