use crate::*;

#[test]
fn parse_secured_data_frame() {
    // 2015 data frame, level 5, implicit key mode, frame counter 1,
    // short addressing, compressed PAN, two payload octets and a 4-octet
    // authentication tag.
    let data = [
        0x49, 0xa8, 0x2b, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0x05, 0x01, 0x00, 0x00, 0x00, 0x68,
        0x69, 0xde, 0xad, 0xbe, 0xef,
    ];

    let frame = Frame::new(&data[..]).unwrap();
    let fc = frame.frame_control();
    assert!(fc.security_enabled());
    assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2020);

    let aux = frame.auxiliary_security_header().unwrap();
    assert_eq!(aux.security_level(), SecurityLevel::EncMic32);
    assert_eq!(aux.key_identifier_mode(), KeyIdentifierMode::Implicit);
    assert_eq!(aux.frame_counter(), 1);
    assert_eq!(aux.len(), 5);

    // The payload view covers ciphertext and tag; the security engine is
    // responsible for shrinking the frame after decryption.
    assert_eq!(
        frame.payload(),
        Some(&[0x68, 0x69, 0xde, 0xad, 0xbe, 0xef][..])
    );
}

#[test]
fn reject_explicit_key_identifier_mode() {
    // Same frame with key identifier mode 1 and a key index.
    let data = [
        0x49, 0xa8, 0x2b, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0x0d, 0x01, 0x00, 0x00, 0x00, 0x01,
        0x68, 0x69, 0xde, 0xad, 0xbe, 0xef,
    ];
    assert!(Frame::new(&data[..]).is_err());
}

#[test]
fn reject_truncated_aux_header() {
    let data = [0x49, 0xa8, 0x2b, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0x05, 0x01];
    assert!(Frame::new(&data[..]).is_err());
}
