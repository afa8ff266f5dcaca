use crate::*;

#[test]
fn parse_imm_ack() {
    let data = [0x02, 0x10, 0x2a];

    let frame = Frame::new(&data[..]).unwrap();
    let fc = frame.frame_control();
    assert_eq!(fc.frame_type(), FrameType::Ack);
    assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2006);
    assert!(!fc.security_enabled());
    assert!(!fc.frame_pending());
    assert!(!fc.ack_request());
    assert!(!fc.pan_id_compression());
    assert!(!fc.sequence_number_suppression());

    assert_eq!(frame.sequence_number(), Some(0x2a));
    assert!(frame.addressing().is_none());
    assert!(frame.payload().is_none());
}

#[test]
fn parse_enh_ack() {
    // 2015 ACK with suppressed sequence number, extended destination,
    // compressed PAN, and a Time Correction IE.
    let data = [
        0x02, 0x2e, 0x37, 0xcd, 0xab, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x0f,
        0xe1, 0x8f,
    ];

    let frame = Frame::new(&data[..]).unwrap();
    let fc = frame.frame_control();
    assert_eq!(fc.frame_type(), FrameType::Ack);
    assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2020);
    assert!(!fc.sequence_number_suppression());
    assert!(fc.information_elements_present());
    assert_eq!(fc.dst_addressing_mode(), AddressingMode::Extended);
    assert_eq!(fc.src_addressing_mode(), AddressingMode::Absent);

    assert_eq!(frame.sequence_number(), Some(0x37));

    let addressing = frame.addressing().unwrap();
    assert_eq!(addressing.dst_pan_id(&fc), Some(0xabcd));
    assert_eq!(
        addressing.dst_address(&fc),
        Some(Address::Extended([
            0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x02
        ]))
    );

    let ie = frame.information_elements().unwrap();
    let header_ie = ie.header_information_elements().next().unwrap();
    assert_eq!(header_ie.element_id(), HeaderElementId::TimeCorrection);

    let tc = TimeCorrection::new(header_ie.content()).unwrap();
    assert_eq!(tc.time_correction(), crate::time::Duration::from_us(-31));
    assert!(tc.nack());
}

#[test]
fn reject_undersized() {
    assert!(Frame::new(&[0x02][..]).is_err());
    // Sequence number announced but missing.
    assert!(Frame::new(&[0x02, 0x10][..]).is_err());
}

#[test]
fn reject_oversized() {
    let data = [0u8; 128];
    assert!(Frame::new(&data[..]).is_err());
}
