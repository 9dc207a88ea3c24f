use battleship_server::{Frame, FrameKind, ProtocolError, CRC_LEN, HEADER_LEN, MAX_PAYLOAD_LEN};
use proptest::prelude::*;

const ALL_KINDS: [FrameKind; 9] = [
    FrameKind::Join,
    FrameKind::Place,
    FrameKind::Fire,
    FrameKind::Chat,
    FrameKind::StateSync,
    FrameKind::Ping,
    FrameKind::Pong,
    FrameKind::Quit,
    FrameKind::Error,
];

#[test]
fn header_layout_is_big_endian() {
    let frame = Frame::text(0x0102_0304, FrameKind::Fire, "E6");
    let bytes = frame.encode().unwrap();
    assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(bytes[4], 0x02);
    assert_eq!(&bytes[5..7], &[0x00, 0x02]);
    assert_eq!(&bytes[7..9], b"E6");
    let crc = u32::from_be_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]);
    assert_eq!(crc, crc32fast::hash(&bytes[..9]));
    assert_eq!(bytes.len(), HEADER_LEN + 2 + CRC_LEN);
}

#[test]
fn empty_payload_round_trips() {
    let frame = Frame::new(0, FrameKind::Ping, Vec::new());
    let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
    assert_eq!(decoded, frame);
}

#[test]
fn truncated_buffer_fails_closed() {
    let bytes = Frame::text(7, FrameKind::Chat, "hello").encode().unwrap();
    for cut in 0..bytes.len() {
        assert!(matches!(
            Frame::decode(&bytes[..cut]),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}

#[test]
fn trailing_bytes_are_a_length_mismatch() {
    let mut bytes = Frame::text(7, FrameKind::Chat, "hello").encode().unwrap();
    bytes.push(0);
    assert!(matches!(
        Frame::decode(&bytes),
        Err(ProtocolError::LengthMismatch { .. })
    ));
}

#[test]
fn unknown_type_is_rejected_after_checksum() {
    let mut bytes = Frame::text(1, FrameKind::Join, "x").encode().unwrap();
    bytes[4] = 0x50;
    // Recompute the CRC so only the type tag is wrong.
    let crc_offset = bytes.len() - CRC_LEN;
    let crc = crc32fast::hash(&bytes[..crc_offset]);
    bytes[crc_offset..].copy_from_slice(&crc.to_be_bytes());
    assert_eq!(Frame::decode(&bytes), Err(ProtocolError::UnknownKind(0x50)));
}

#[test]
fn corrupted_type_without_crc_fixup_is_a_checksum_error() {
    let mut bytes = Frame::text(1, FrameKind::Join, "x").encode().unwrap();
    bytes[4] = 0x50;
    assert!(matches!(
        Frame::decode(&bytes),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
}

#[test]
fn oversized_payload_is_rejected_at_encode() {
    let frame = Frame::new(1, FrameKind::Chat, vec![0u8; MAX_PAYLOAD_LEN + 1]);
    assert_eq!(
        frame.encode(),
        Err(ProtocolError::PayloadTooLong(MAX_PAYLOAD_LEN + 1))
    );
}

fn kind_strategy() -> impl Strategy<Value = FrameKind> {
    proptest::sample::select(ALL_KINDS.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn round_trip(
        seq in any::<u32>(),
        kind in kind_strategy(),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let frame = Frame::new(seq, kind, payload);
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn any_single_bit_flip_fails_decode(
        seq in any::<u32>(),
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        flip in any::<proptest::sample::Index>(),
    ) {
        let frame = Frame::new(seq, FrameKind::Chat, payload);
        let mut bytes = frame.encode().unwrap();
        let bit = flip.index(bytes.len() * 8);
        bytes[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(Frame::decode(&bytes).is_err());
    }
}
