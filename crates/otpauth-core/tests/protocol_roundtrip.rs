//! Integration tests for the otpauth-core protocol codec.
//!
//! These tests verify complete round-trip encoding and decoding of every
//! message type through the public API, exercising the codec and message
//! types together, plus the split header/payload path a stream reader uses.

use otpauth_core::{
    decode_message, encode_message,
    protocol::{
        codec::{decode_payload, parse_header},
        messages::{
            AnnounceMessage, PinSubmitMessage, SecretPayloadMessage, HEADER_SIZE,
        },
    },
    SecretSet, SyncMessage,
};

/// Encodes a message and then decodes it, asserting that the decoded message
/// matches the original.
fn roundtrip(msg: SyncMessage) -> SyncMessage {
    let bytes = encode_message(&msg).expect("encode must succeed");
    let (decoded, consumed) = decode_message(&bytes).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

#[test]
fn test_roundtrip_announce_message() {
    let original = SyncMessage::Announce(AnnounceMessage {
        transfer_port: 9999,
        device_name: "integration-test".to_string(),
    });

    let decoded = roundtrip(original.clone());

    assert_eq!(original, decoded);
}

#[test]
fn test_roundtrip_pin_submit_message() {
    let original = SyncMessage::PinSubmit(PinSubmitMessage {
        pin: "482913".to_string(),
    });

    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_secret_payload_message() {
    let mut secrets = SecretSet::new();
    secrets.insert("github", "JBSWY3DPEHPK3PXP");
    secrets.insert("work", "KRSXG5CTMVRXEZLU");

    let original = SyncMessage::SecretPayload(SecretPayloadMessage::from_secret_set(&secrets));
    let decoded = roundtrip(original.clone());

    assert_eq!(original, decoded);

    // The decoded payload reconstructs a set equal to the source, keys and
    // values intact, independent of entry order.
    match decoded {
        SyncMessage::SecretPayload(m) => assert_eq!(m.into_secret_set(), secrets),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_split_header_then_payload_decode_matches_whole_buffer_decode() {
    // A TCP reader consumes the header first, then reads payload_len bytes.
    // Both paths must agree.
    let original = SyncMessage::Announce(AnnounceMessage {
        transfer_port: 4242,
        device_name: "split-read".to_string(),
    });
    let bytes = encode_message(&original).unwrap();

    let header = parse_header(&bytes[..HEADER_SIZE]).expect("header must parse");
    assert_eq!(header.payload_len, bytes.len() - HEADER_SIZE);

    let via_split = decode_payload(header.message_type, &bytes[HEADER_SIZE..]).unwrap();
    let (via_whole, _) = decode_message(&bytes).unwrap();

    assert_eq!(via_split, via_whole);
    assert_eq!(via_split, original);
}

#[test]
fn test_large_vault_round_trips() {
    let secrets: SecretSet = (0..200)
        .map(|i| (format!("account-{i:03}"), format!("SECRET{i:03}AAAA")))
        .collect();

    let original = SyncMessage::SecretPayload(SecretPayloadMessage::from_secret_set(&secrets));
    let decoded = roundtrip(original.clone());
    assert_eq!(original, decoded);
}
