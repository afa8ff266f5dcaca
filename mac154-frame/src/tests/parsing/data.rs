use crate::*;

#[test]
fn parse_unicast_data_frame() {
    // PAN 0xabcd, short destination 0xbeef, short source 0x1234,
    // compressed source PAN, ack requested.
    let data = [
        0x61, 0x88, 0x2b, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0x68, 0x69,
    ];

    let frame = Frame::new(&data[..]).unwrap();
    let fc = frame.frame_control();
    assert_eq!(fc.frame_type(), FrameType::Data);
    assert!(fc.ack_request());
    assert!(fc.pan_id_compression());
    assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2003);

    assert_eq!(frame.sequence_number(), Some(0x2b));

    let addressing = frame.addressing().unwrap();
    assert_eq!(addressing.dst_pan_id(&fc), Some(0xabcd));
    assert_eq!(addressing.dst_address(&fc), Some(Address::from_short(0xbeef)));
    assert_eq!(addressing.src_pan_id(&fc), None);
    assert_eq!(addressing.src_address(&fc), Some(Address::from_short(0x1234)));

    assert_eq!(frame.payload(), Some(&[0x68, 0x69][..]));
}

#[test]
fn reject_unaddressed_legacy_data_frame() {
    // Data frame, version 2006, both addressing modes absent.
    let data = [0x01, 0x10, 0x01, 0xaa];
    assert!(Frame::new(&data[..]).is_err());
}

#[test]
fn reject_compression_without_both_addresses() {
    // Destination only, PAN ID compression set.
    let data = [0x41, 0x18, 0x01, 0xcd, 0xab, 0xef, 0xbe, 0xaa];
    assert!(Frame::new(&data[..]).is_err());
}

#[test]
fn reject_suppression_on_legacy_frame() {
    // Version 2006 with the sequence number suppression bit set.
    let data = [0x01, 0x19, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0xaa];
    assert!(Frame::new(&data[..]).is_err());
}

#[test]
fn reject_reserved_frame_type() {
    let data = [0x04, 0x10, 0x01, 0xaa];
    assert!(Frame::new(&data[..]).is_err());
}

#[test]
fn reject_reserved_version() {
    let data = [0x01, 0x30, 0x01, 0xaa];
    assert!(Frame::new(&data[..]).is_err());
}
