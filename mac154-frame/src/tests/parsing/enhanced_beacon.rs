use crate::*;

/// An enhanced beacon advertising a TSCH network: broadcast destination,
/// extended source, HT1, then an MLME payload IE with TSCH
/// Synchronization, Timeslot, Channel Hopping and Slotframe and Link
/// nested IEs (all in their shortened forms).
const ENHANCED_BEACON: [u8; 35] = [
    0x40, 0xeb, 0xcd, 0xab, 0xff, 0xff, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
    0x3f, 0x11, 0x88, 0x06, 0x1a, 0x0e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x1c, 0x00, 0x01,
    0xc8, 0x00, 0x01, 0x1b, 0x00,
];

#[test]
fn parse_enhanced_beacon() {
    let frame = Frame::new(&ENHANCED_BEACON[..]).unwrap();
    let fc = frame.frame_control();

    assert_eq!(fc.frame_type(), FrameType::Beacon);
    assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2020);
    assert!(fc.sequence_number_suppression());
    assert!(fc.information_elements_present());
    assert!(fc.pan_id_compression());

    let addressing = frame.addressing().unwrap();
    assert_eq!(addressing.dst_pan_id(&fc), Some(0xabcd));
    assert_eq!(addressing.dst_address(&fc), Some(Address::BROADCAST));
    assert_eq!(
        addressing.src_address(&fc),
        Some(Address::Extended([
            0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01
        ]))
    );

    let ie = frame.information_elements().unwrap();
    assert!(ie.payload_ie_present());

    let payload_ie = ie.payload_information_elements().next().unwrap();
    assert_eq!(payload_ie.group_id(), PayloadGroupId::Mlme);

    let mut nested = payload_ie.nested_information_elements();

    let sync = nested.next().unwrap();
    assert_eq!(
        sync.sub_id(),
        NestedSubId::Short(NestedSubIdShort::TschSynchronization)
    );
    let sync = TschSynchronization::new(sync.content()).unwrap();
    assert_eq!(sync.absolute_slot_number(), 14);
    assert_eq!(sync.join_metric(), 0);

    let timeslot = nested.next().unwrap();
    assert_eq!(
        timeslot.sub_id(),
        NestedSubId::Short(NestedSubIdShort::TschTimeslot)
    );
    let timeslot = TschTimeslot::new(timeslot.content()).unwrap();
    assert!(timeslot.is_shortened());
    assert_eq!(timeslot.id(), 0);

    let hopping = nested.next().unwrap();
    assert_eq!(
        hopping.sub_id(),
        NestedSubId::Long(NestedSubIdLong::ChannelHopping)
    );
    let hopping = ChannelHopping::new(hopping.content()).unwrap();
    assert!(hopping.is_shortened());
    assert_eq!(hopping.hopping_sequence_id(), 0);

    let slotframes = nested.next().unwrap();
    assert_eq!(
        slotframes.sub_id(),
        NestedSubId::Short(NestedSubIdShort::TschSlotframeAndLink)
    );
    let slotframes = TschSlotframeAndLink::new(slotframes.content()).unwrap();
    assert_eq!(slotframes.number_of_slotframes(), 0);

    assert!(nested.next().is_none());
}

#[test]
fn enhanced_beacon_repr_roundtrip() {
    let frame = Frame::new(&ENHANCED_BEACON[..]).unwrap();
    let repr = FrameRepr::parse(&frame).unwrap();

    assert_eq!(repr.buffer_len(), ENHANCED_BEACON.len());

    let mut buffer = [0u8; ENHANCED_BEACON.len()];
    repr.emit(&mut Frame::new_unchecked(&mut buffer[..]));

    assert_eq!(buffer, ENHANCED_BEACON);
}

#[test]
fn reject_legacy_beacon_with_destination() {
    // Version 2006 beacon with a short destination address.
    let data = [0x00, 0x98, 0x01, 0xcd, 0xab, 0xff, 0xff, 0x34, 0x12];
    assert!(Frame::new(&data[..]).is_err());
}
