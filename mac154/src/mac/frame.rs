//! Context-bound frame operations: filtering, header size computation,
//! MHR emission with the security procedure, and the construction of
//! acknowledgment, MAC command and enhanced beacon frames.
//!
//! The context lock must be held across all functions taking a
//! [`MacContext`].

use mac154_frame::time::Duration;
use mac154_frame::{
    Address, AddressPresence, AddressingFieldsRepr, AddressingMode, AuxiliarySecurityHeader,
    BeaconFrame, CommandFrameIdentifier, DataFrame, EnhAckFrame, Frame, FrameBuilder,
    FrameControl, FrameControlRepr, FrameType, FrameVersion, HeaderInformationElementRepr,
    ImmAckFrame, InformationElementsRepr, LinkInformationRepr, MacCommandFrame,
    NestedInformationElementRepr, PayloadInformationElementRepr, SecurityLevel,
    SlotframeDescriptorRepr, TimeCorrectionRepr, TschSlotframeAndLinkRepr,
    TschSynchronizationRepr, TschTimeslotRepr, ChannelHoppingRepr,
};

use super::context::{DeviceRole, MacContext};
use super::security::{outgoing_security_procedure, CcmStar};
use super::{BROADCAST_ADDRESS, BROADCAST_PAN_ID, NO_SHORT_ADDRESS_ASSIGNED};
use crate::phy::FrameBuffer;
use crate::{Error, Result};

/// Addressing parameters of an outgoing frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    /// The destination PAN identifier, host order.
    pub dst_pan_id: u16,
    /// The destination address.
    pub dst_addr: Address,
    /// The source PAN identifier, host order.
    pub src_pan_id: u16,
    /// The source address.
    pub src_addr: Address,
    /// The frame version the frame is emitted with.
    pub version: FrameVersion,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParams {
    /// Create empty addressing parameters for a legacy frame.
    pub fn new() -> Self {
        Self {
            dst_pan_id: 0,
            dst_addr: Address::Absent,
            src_pan_id: 0,
            src_addr: Address::Absent,
            version: FrameVersion::Ieee802154_2003,
        }
    }

    fn presence(&self) -> Result<AddressPresence> {
        AddressPresence::derive(
            self.version,
            self.dst_addr.into(),
            self.src_addr.into(),
            self.pan_id_compression(),
        )
        .ok_or(Error::Invalid)
    }

    /// PAN ID compression per section 7.2.2.6: both addresses present and
    /// equal PAN identifiers.
    fn pan_id_compression(&self) -> bool {
        !self.dst_addr.is_absent()
            && !self.src_addr.is_absent()
            && self.dst_pan_id == self.src_pan_id
    }

    fn is_broadcast(&self) -> bool {
        self.dst_addr.is_broadcast()
    }
}

/// Parse and validate the MAC header of a received frame.
///
/// MAC command frames of pre-2015 versions with the frame pending bit
/// set are repaired in place before validation, see section 7.2.2.4.
pub fn parse_mhr(buffer: &mut [u8]) -> Result<Frame<&[u8]>> {
    if buffer.len() >= FrameControl::<&[u8]>::LEN {
        let fc = FrameControl::new_unchecked(&buffer[..2]);
        if fc.frame_type() == FrameType::MacCommand
            && fc.frame_version().is_legacy()
            && fc.frame_pending()
        {
            FrameControl::new_unchecked(&mut buffer[..2]).set_frame_pending(false);
        }
    }

    Frame::new(&buffer[..]).map_err(|_| {
        debug!("dropping malformed frame");
        Error::Invalid
    })
}

/// Validate the MAC payload of a received frame against its frame type.
pub fn parse_mac_payload(buffer: &[u8]) -> Result<()> {
    let frame = Frame::new(buffer)?;
    let fc = frame.frame_control();

    match fc.frame_type() {
        FrameType::Data => DataFrame::new(buffer).map(|_| ()).map_err(Error::from),
        FrameType::MacCommand => MacCommandFrame::new(buffer).map(|_| ()).map_err(Error::from),
        FrameType::Beacon if fc.frame_version().is_legacy() => {
            BeaconFrame::new(buffer).map(|_| ()).map_err(Error::from)
        }
        FrameType::Ack if fc.frame_version().is_legacy() => {
            ImmAckFrame::new(buffer).map(|_| ()).map_err(Error::from)
        }
        FrameType::Ack => EnhAckFrame::new(buffer).map(|_| ()).map_err(Error::from),
        // Generic enhanced frames may or may not embed a payload.
        FrameType::Beacon => Ok(()),
        _ => Err(Error::NotSupported),
    }
}

fn matches_extended(addr: &Address, ext_addr_le: &[u8; 8]) -> bool {
    match addr {
        Address::Extended(logical) => {
            logical.iter().rev().eq(ext_addr_le.iter())
        }
        _ => false,
    }
}

/// Address and role filtering of received frames, see section 6.7.2.
///
/// Returns `false` when the frame is not for this interface and must be
/// dropped.
pub fn filter<C: CcmStar, T: AsRef<[u8]>>(ctx: &MacContext<C>, frame: &Frame<T>) -> bool {
    let fc = frame.frame_control();
    let addressing = frame.addressing();

    if let Some(af) = &addressing {
        if let Some(dst_pan_id) = af.dst_pan_id(&fc) {
            if dst_pan_id != BROADCAST_PAN_ID && dst_pan_id != ctx.pan_id {
                return false;
            }
        }

        match af.dst_address(&fc) {
            Some(Address::Short(addr)) => {
                let short = u16::from_be_bytes(addr);
                if short != BROADCAST_ADDRESS && short != ctx.short_addr {
                    return false;
                }
            }
            Some(addr @ Address::Extended(_)) => {
                if !matches_extended(&addr, &ctx.ext_addr) {
                    return false;
                }
            }
            Some(Address::Absent) | None => {
                // Frames without a destination implicitly address the PAN
                // coordinator; beacons address everyone.
                if fc.frame_type() != FrameType::Beacon
                    && ctx.device_role != DeviceRole::PanCoordinator
                {
                    return false;
                }
            }
        }
    }

    // Commands that drive the association machinery only make sense on a
    // coordinator.
    if fc.frame_type() == FrameType::MacCommand {
        if let Some(payload) = frame.payload() {
            if !payload.is_empty() {
                let is_coordinator = matches!(
                    ctx.device_role,
                    DeviceRole::Coordinator | DeviceRole::PanCoordinator
                );

                match CommandFrameIdentifier::from(payload[0]) {
                    CommandFrameIdentifier::OrphanNotification
                    | CommandFrameIdentifier::BeaconRequest
                    | CommandFrameIdentifier::AssociationRequest
                        if !is_coordinator =>
                    {
                        return false;
                    }
                    _ => {}
                }
            }
        }
    }

    true
}

/// Compute the MAC header length of a frame with the given addressing
/// parameters; includes the auxiliary security header when the frame
/// will be secured.
pub fn compute_header_size<C: CcmStar>(
    ctx: &MacContext<C>,
    params: &FrameParams,
    is_encrypted: bool,
) -> Result<usize> {
    let mut ll_hdr_len = 2 + 1; // frame control and sequence number

    ll_hdr_len += params.presence()?.len();

    if is_encrypted {
        debug_assert!(ctx.security.level != SecurityLevel::None);
        // Only the implicit key identifier mode is supported; its key
        // identifier field is empty.
        ll_hdr_len += AuxiliarySecurityHeader::<&[u8]>::CONTROL_LEN
            + AuxiliarySecurityHeader::<&[u8]>::FRAME_COUNTER_LEN;
    }

    Ok(ll_hdr_len)
}

/// Compute the authentication tag length appended to a secured frame.
pub fn compute_authtag_len<C: CcmStar>(ctx: &MacContext<C>, is_encrypted: bool) -> usize {
    if is_encrypted {
        ctx.security.authtag_len()
    } else {
        0
    }
}

/// Resolve the addressing parameters of an outgoing data frame.
///
/// The source addressing mode follows the interface's association state:
/// an assigned short address selects short addressing, otherwise the
/// extended address is used. A caller-supplied source address must match
/// the interface's address exactly. An empty destination broadcasts.
pub fn get_data_frame_params<C: CcmStar>(
    ctx: &MacContext<C>,
    dst: Option<Address>,
    src: Option<Address>,
) -> Result<(FrameParams, usize, usize)> {
    if !ctx.is_associated() {
        return Err(Error::NotAssociated);
    }

    let src_addr = match src {
        None => {
            if ctx.short_addr == NO_SHORT_ADDRESS_ASSIGNED {
                extended_address(ctx)
            } else {
                Address::from_short(ctx.short_addr)
            }
        }
        Some(addr @ Address::Short(_)) => {
            if addr.as_short() != Some(ctx.short_addr) {
                return Err(Error::Invalid);
            }
            addr
        }
        Some(addr @ Address::Extended(_)) => {
            if !matches_extended(&addr, &ctx.ext_addr) {
                return Err(Error::Invalid);
            }
            addr
        }
        Some(Address::Absent) => return Err(Error::Invalid),
    };

    let dst_addr = match dst {
        None => {
            debug!("no destination address, assuming broadcast");
            Address::BROADCAST
        }
        Some(Address::Absent) => return Err(Error::Invalid),
        Some(addr) => addr,
    };

    let is_encrypted = ctx.security.level != SecurityLevel::None;

    let params = FrameParams {
        dst_pan_id: ctx.pan_id,
        dst_addr,
        src_pan_id: ctx.pan_id,
        src_addr,
        // Unsecured frames use the original framing for compatibility;
        // the 2015+ security procedures require current-version frames.
        version: if is_encrypted {
            FrameVersion::Ieee802154_2020
        } else {
            FrameVersion::Ieee802154_2003
        },
    };

    let ll_hdr_len = compute_header_size(ctx, &params, is_encrypted)?;
    let authtag_len = compute_authtag_len(ctx, is_encrypted);

    Ok((params, ll_hdr_len, authtag_len))
}

/// The interface's extended address in logical (display) byte order.
fn extended_address<C: CcmStar>(ctx: &MacContext<C>) -> Address {
    let mut logical = ctx.ext_addr;
    logical.reverse();
    Address::Extended(logical)
}

/// Write the MAC header into `buffer` and secure the frame in place.
///
/// `buffer` must hold the complete frame: `ll_hdr_len` octets of header,
/// the plaintext payload and `authtag_len` reserved octets. The sequence
/// counter is advanced for every non-acknowledgment frame.
///
/// # Panics
///
/// Panics when the written header size does not match `ll_hdr_len`; a
/// mismatch means the caller's size computation diverged from the writer
/// and payload bytes would be corrupted.
pub fn write_mhr_and_security<C: CcmStar>(
    ctx: &mut MacContext<C>,
    frame_type: FrameType,
    params: &FrameParams,
    buffer: &mut [u8],
    ll_hdr_len: usize,
    authtag_len: usize,
) -> Result<()> {
    debug_assert!(buffer.len() <= mac154_frame::MAX_FRAME_LEN);

    if buffer.len() < ll_hdr_len + authtag_len {
        return Err(Error::Invalid);
    }

    let presence = params.presence()?;
    let mut written = 0;

    let fc = FrameControlRepr {
        frame_type,
        security_enabled: false, // flipped by the security procedure
        frame_pending: false,
        // see section 6.7.4.1
        ack_request: !params.is_broadcast() && ctx.ack_requested,
        pan_id_compression: params.pan_id_compression(),
        sequence_number_suppression: false,
        information_elements_present: false,
        dst_addressing_mode: params.dst_addr.into(),
        src_addressing_mode: params.src_addr.into(),
        frame_version: params.version,
    };

    let mut frame = Frame::new_unchecked(&mut buffer[..]);
    frame.set_frame_control(&fc);
    written += 2;

    frame.set_sequence_number(ctx.sequence);
    if frame_type != FrameType::Ack {
        ctx.sequence = ctx.sequence.wrapping_add(1);
    }
    written += 1;

    let addressing = AddressingFieldsRepr {
        dst_pan_id: presence.dst_pan_id.then_some(params.dst_pan_id),
        src_pan_id: presence.src_pan_id.then_some(params.src_pan_id),
        dst_address: (!params.dst_addr.is_absent()).then_some(params.dst_addr),
        src_address: (!params.src_addr.is_absent()).then_some(params.src_addr),
    };
    frame.set_addressing_fields(&addressing);
    written += addressing.buffer_len();

    if authtag_len > 0 {
        // The auxiliary security header is written by the procedure.
        written += AuxiliarySecurityHeader::<&[u8]>::CONTROL_LEN
            + AuxiliarySecurityHeader::<&[u8]>::FRAME_COUNTER_LEN;

        let tsch_asn = ctx.tsch.mode.then(|| ctx.tsch.asn.value());
        let pan_id = ctx.pan_id;
        let src_addr = params.src_addr;
        outgoing_security_procedure(
            &mut ctx.security,
            frame_type,
            buffer,
            ll_hdr_len,
            authtag_len,
            pan_id,
            src_addr,
            tsch_asn,
        )?;
    }

    // A mismatch here means the header-size computation and the writer
    // disagree and the payload has been overwritten.
    assert_eq!(
        written, ll_hdr_len,
        "MAC header length mismatch: wrote {} octets, computed {}",
        written, ll_hdr_len
    );

    Ok(())
}

/// Create an immediate acknowledgment frame, see section 7.3.3.
pub fn create_imm_ack_frame(seq: u8) -> FrameBuffer {
    let mut frame = FrameBuffer::new();

    let fc = FrameControlRepr {
        frame_type: FrameType::Ack,
        security_enabled: false,
        frame_pending: false,
        ack_request: false,
        pan_id_compression: false,
        sequence_number_suppression: false,
        information_elements_present: false,
        dst_addressing_mode: AddressingMode::Absent,
        src_addressing_mode: AddressingMode::Absent,
        frame_version: FrameVersion::Ieee802154_2003,
    };

    let mut writer = Frame::new_unchecked(&mut frame.buffer[..]);
    writer.set_frame_control(&fc);
    writer.set_sequence_number(seq);
    frame.len = 3;

    frame
}

/// Create an enhanced acknowledgment frame carrying a Time Correction
/// header IE, see section 7.4.2.7.
///
/// `time_correction_us` must lie within [-2048, 2047] microseconds; the
/// NACK flag is set when `is_ack` is `false`.
pub fn create_enh_ack_frame(is_ack: bool, time_correction_us: i32) -> Result<FrameBuffer> {
    if !(-2048..=2047).contains(&time_correction_us) {
        return Err(Error::Invalid);
    }

    let repr = FrameBuilder::new_enh_ack()
        .add_header_information_element(HeaderInformationElementRepr::TimeCorrection(
            TimeCorrectionRepr {
                time_correction: Duration::from_us(time_correction_us as i64),
                nack: !is_ack,
            },
        ))
        .map_err(|_| Error::NoMemory)?
        .finalize()?;

    let mut frame = FrameBuffer::new();
    frame.len = repr.buffer_len();
    repr.emit(&mut Frame::new_unchecked(&mut frame.buffer[..frame.len]));

    Ok(frame)
}

/// Create a MAC command frame, see sections 7.5.1 through 7.5.11.
///
/// The per-command addressing rules are applied to `params`; violations
/// fail the operation. The frame is returned with the command frame
/// identifier written; the caller fills the command content at the
/// returned offset and calls [`finalize_mac_cmd_frame`].
pub fn create_mac_cmd_frame<C: CcmStar>(
    ctx: &mut MacContext<C>,
    cfi: CommandFrameIdentifier,
    mut params: FrameParams,
) -> Result<(FrameBuffer, usize)> {
    use CommandFrameIdentifier::*;

    params.version = FrameVersion::Ieee802154_2003;
    let mut ack_request = false;

    match cfi {
        DisassociationNotification => {
            // See section 7.5.4.
            ack_request = true;
            params.src_addr = extended_address(ctx);
            params.dst_pan_id = ctx.pan_id;
            params.src_pan_id = ctx.pan_id;

            if ctx.device_role == DeviceRole::EndDevice {
                // Leaving the PAN: address the coordinator.
                if ctx.coord_short_addr != super::SHORT_ADDRESS_NOT_ASSOCIATED
                    && ctx.coord_short_addr != NO_SHORT_ADDRESS_ASSIGNED
                {
                    params.dst_addr = Address::from_short(ctx.coord_short_addr);
                } else {
                    let mut logical = ctx.coord_ext_addr;
                    logical.reverse();
                    params.dst_addr = Address::Extended(logical);
                }
            } else if params.dst_addr.is_absent() {
                // The coordinator must name the device being removed.
                return Err(Error::Invalid);
            }
        }
        AssociationRequest => {
            // See section 7.5.2.
            ack_request = true;
            params.src_addr = extended_address(ctx);
            // The source PAN ID is the broadcast PAN ID.
            params.src_pan_id = BROADCAST_PAN_ID;

            if params.dst_addr.is_absent() || params.dst_pan_id == BROADCAST_PAN_ID {
                return Err(Error::Invalid);
            }
        }
        AssociationResponse | PanIdConflictNotification => {
            // See sections 7.5.3 and 7.5.6.
            ack_request = true;
            params.src_addr = extended_address(ctx);
            params.dst_pan_id = ctx.pan_id;
            params.src_pan_id = ctx.pan_id;

            if cfi == AssociationResponse {
                if !matches!(params.dst_addr, Address::Extended(_)) {
                    return Err(Error::Invalid);
                }
            } else {
                let mut logical = ctx.coord_ext_addr;
                logical.reverse();
                params.dst_addr = Address::Extended(logical);
            }
        }
        DataRequest => {
            // See section 7.5.5.
            ack_request = true;
            params.src_pan_id = ctx.pan_id;
            if params.dst_addr.is_absent() {
                params.dst_pan_id = ctx.pan_id;
            }
        }
        OrphanNotification => {
            // See section 7.5.7.
            params.src_addr = extended_address(ctx);
            params.dst_addr = Address::BROADCAST;
            params.dst_pan_id = BROADCAST_PAN_ID;
            params.src_pan_id = BROADCAST_PAN_ID;
        }
        BeaconRequest => {
            // See section 7.5.8.
            params.src_addr = Address::Absent;
            params.dst_addr = Address::BROADCAST;
            params.dst_pan_id = BROADCAST_PAN_ID;
        }
        CoordinatorRealignment => {
            // See section 7.5.10.
            params.src_addr = extended_address(ctx);
            params.src_pan_id = ctx.pan_id;
            if params.dst_addr.as_short().is_some()
                && params.dst_addr != Address::BROADCAST
            {
                return Err(Error::Invalid);
            }
        }
        GtsRequest => {
            // See section 7.5.11.
            ack_request = true;
            if ctx.short_addr >= NO_SHORT_ADDRESS_ASSIGNED {
                return Err(Error::NotAssociated);
            }
            params.src_addr = Address::from_short(ctx.short_addr);
            params.src_pan_id = ctx.pan_id;
            params.dst_addr = Address::Absent;
        }
        Unknown => return Err(Error::NotSupported),
    }

    let ll_hdr_len = compute_header_size(ctx, &params, false)?;

    let mut frame = FrameBuffer::new();

    let saved_ack_requested = ctx.ack_requested;
    ctx.ack_requested = ack_request;
    let result = write_mhr_and_security(
        ctx,
        FrameType::MacCommand,
        &params,
        &mut frame.buffer[..ll_hdr_len],
        ll_hdr_len,
        0,
    );
    ctx.ack_requested = saved_ack_requested;
    result?;

    frame.buffer[ll_hdr_len] = cfi as u8;
    frame.len = ll_hdr_len + 1;

    Ok((frame, ll_hdr_len + 1))
}

/// Append the per-command content length to a command frame created with
/// [`create_mac_cmd_frame`].
pub fn finalize_mac_cmd_frame(frame: &mut FrameBuffer, cfi: CommandFrameIdentifier) {
    frame.len += cfi.content_len();
}

/// Assemble an enhanced beacon advertising this interface's TSCH
/// configuration, see section 6.3.6.
///
/// With `full`, the complete timeslot template and hopping sequence are
/// included; otherwise their shortened (template-id only) forms are used.
/// `number_of_channels` is the channel count of the current channel page
/// as reported by the driver.
pub fn create_enh_beacon<C: CcmStar>(
    ctx: &MacContext<C>,
    number_of_channels: u16,
    full: bool,
) -> Result<FrameBuffer> {
    let mut nested: heapless::Vec<NestedInformationElementRepr, 8> = heapless::Vec::new();

    // TSCH Synchronization IE, so new devices can synchronize.
    nested
        .push(NestedInformationElementRepr::TschSynchronization(
            TschSynchronizationRepr {
                absolute_slot_number: ctx.tsch.asn.value(),
                join_metric: ctx.tsch.join_metric,
            },
        ))
        .map_err(|_| Error::NoMemory)?;

    // TSCH Timeslot IE, describing when to expect frames and ACKs.
    nested
        .push(NestedInformationElementRepr::TschTimeslot(if full {
            TschTimeslotRepr::Full(ctx.tsch.timeslot_template)
        } else {
            TschTimeslotRepr::Shortened {
                id: ctx.tsch.timeslot_template.id,
            }
        }))
        .map_err(|_| Error::NoMemory)?;

    // TSCH Slotframe and Link IE over the advertising slotframes.
    let mut slotframes = TschSlotframeAndLinkRepr::default();
    for slotframe in ctx.tsch.schedule.slotframes() {
        if !slotframe.advertise {
            continue;
        }

        let mut descriptor = SlotframeDescriptorRepr {
            handle: slotframe.handle,
            size: slotframe.size,
            links: heapless::Vec::new(),
        };

        for link in slotframe.links() {
            if !link.advertise {
                continue;
            }

            descriptor
                .links
                .push(LinkInformationRepr {
                    timeslot: link.timeslot,
                    channel_offset: link.channel_offset,
                    link_options: link.wire_options(),
                })
                .map_err(|_| Error::NoMemory)?;
        }

        slotframes
            .slotframes
            .push(descriptor)
            .map_err(|_| Error::NoMemory)?;
    }
    nested
        .push(NestedInformationElementRepr::TschSlotframeAndLink(slotframes))
        .map_err(|_| Error::NoMemory)?;

    // Channel Hopping IE.
    let hopping = if full {
        let Some(sequence) = &ctx.hopping_sequence else {
            return Err(Error::NetDown);
        };

        let mut channels: heapless::Vec<u16, 16> = heapless::Vec::new();
        let mut phy_configuration = 0u32;
        for channel in sequence.channels() {
            phy_configuration |= 1 << channel;
            channels.push(channel).map_err(|_| Error::NoMemory)?;
        }

        let current_hop = (ctx.tsch.asn.value() % sequence.len() as u64) as u16;

        ChannelHoppingRepr::Full {
            sequence_id: 0,
            channel_page: 0,
            number_of_channels,
            phy_configuration,
            sequence: channels,
            current_hop,
        }
    } else {
        ChannelHoppingRepr::Shortened { sequence_id: 0 }
    };
    nested
        .push(NestedInformationElementRepr::ChannelHopping(hopping))
        .map_err(|_| Error::NoMemory)?;

    let mut ies = InformationElementsRepr::default();
    ies.payload_information_elements
        .push(PayloadInformationElementRepr::Mlme(nested))
        .map_err(|_| Error::NoMemory)?;

    let repr = FrameBuilder::new_enhanced_beacon()
        .set_dst_pan_id(ctx.pan_id)
        .set_dst_address(Address::BROADCAST)
        .set_src_address(extended_address(ctx))
        .finalize()?;

    let mut repr = repr;
    repr.frame_control.information_elements_present = true;
    repr.information_elements = Some(ies);

    let mut frame = FrameBuffer::new();
    frame.len = repr.buffer_len();
    if frame.len > mac154_frame::MAX_FRAME_LEN {
        return Err(Error::NoMemory);
    }
    repr.emit(&mut Frame::new_unchecked(&mut frame.buffer[..frame.len]));

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::security::{incoming_security_procedure, NullCipher, SoftwareCcmStar};
    use crate::mac::SHORT_ADDRESS_NOT_ASSOCIATED;

    fn context() -> MacContext<NullCipher> {
        let mut ctx = MacContext::new([0x01; 8], NullCipher);
        ctx.set_pan_id(0xabcd).unwrap();
        ctx.set_short_addr(0x1234).unwrap();
        ctx.ack_requested = true;
        ctx
    }

    #[test]
    fn imm_ack_wire_format() {
        let frame = create_imm_ack_frame(0x2a);
        assert_eq!(frame.as_slice(), &[0x02, 0x00, 0x2a]);

        let parsed = Frame::new(frame.as_slice()).unwrap();
        assert_eq!(parsed.frame_control().frame_type(), FrameType::Ack);
        assert_eq!(parsed.sequence_number(), Some(0x2a));
        assert!(parsed.addressing().is_none());
    }

    #[test]
    fn unicast_data_frame_wire_format() {
        let mut ctx = context();
        ctx.sequence = 0x2b;

        let (params, ll_hdr_len, authtag_len) =
            get_data_frame_params(&ctx, Some(Address::from_short(0xbeef)), None).unwrap();
        assert_eq!(ll_hdr_len, 9);
        assert_eq!(authtag_len, 0);

        let mut buffer = [0u8; 11];
        buffer[9..].copy_from_slice(b"hi");
        write_mhr_and_security(
            &mut ctx,
            FrameType::Data,
            &params,
            &mut buffer,
            ll_hdr_len,
            authtag_len,
        )
        .unwrap();

        assert_eq!(
            buffer,
            [0x61, 0x88, 0x2b, 0xcd, 0xab, 0xef, 0xbe, 0x34, 0x12, 0x68, 0x69]
        );
        assert_eq!(ctx.sequence, 0x2c);

        // Parsing recovers the same parameters.
        let frame = Frame::new(&buffer[..]).unwrap();
        let fc = frame.frame_control();
        assert!(fc.ack_request());
        assert!(fc.pan_id_compression());
        let addressing = frame.addressing().unwrap();
        assert_eq!(addressing.dst_pan_id(&fc), Some(0xabcd));
        assert_eq!(addressing.src_pan_id(&fc), None);
        assert_eq!(addressing.dst_address(&fc), Some(Address::from_short(0xbeef)));
        assert_eq!(addressing.src_address(&fc), Some(Address::from_short(0x1234)));
    }

    #[test]
    fn sequence_advances_once_per_frame() {
        let mut ctx = context();
        ctx.sequence = 0xfe;

        for expected in [0xfeu8, 0xff, 0x00] {
            let (params, ll_hdr_len, _) =
                get_data_frame_params(&ctx, Some(Address::from_short(0xbeef)), None).unwrap();
            let mut buffer = [0u8; 10];
            write_mhr_and_security(
                &mut ctx,
                FrameType::Data,
                &params,
                &mut buffer,
                ll_hdr_len,
                0,
            )
            .unwrap();
            assert_eq!(buffer[2], expected);
        }
    }

    #[test]
    fn broadcast_never_requests_acknowledgment() {
        let mut ctx = context();
        assert!(ctx.ack_requested);

        let (params, ll_hdr_len, _) = get_data_frame_params(&ctx, None, None).unwrap();
        assert!(params.dst_addr.is_broadcast());

        let mut buffer = [0u8; 10];
        write_mhr_and_security(&mut ctx, FrameType::Data, &params, &mut buffer, ll_hdr_len, 0)
            .unwrap();

        let frame = Frame::new(&buffer[..]).unwrap();
        assert!(!frame.frame_control().ack_request());
    }

    #[test]
    fn unassociated_interface_cannot_send() {
        let mut ctx = context();
        ctx.short_addr = SHORT_ADDRESS_NOT_ASSOCIATED;
        ctx.pan_id = super::super::PAN_ID_NOT_ASSOCIATED;

        assert_eq!(
            get_data_frame_params(&ctx, None, None).unwrap_err(),
            Error::NotAssociated
        );
    }

    #[test]
    fn foreign_source_address_is_refused() {
        let ctx = context();
        assert_eq!(
            get_data_frame_params(&ctx, None, Some(Address::from_short(0x5678))).unwrap_err(),
            Error::Invalid
        );
    }

    #[test]
    fn secured_data_frame_roundtrip() {
        let mut sender: MacContext<SoftwareCcmStar> =
            MacContext::new([0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07], SoftwareCcmStar::new());
        sender.set_pan_id(0xabcd).unwrap();
        sender.set_short_addr(super::super::NO_SHORT_ADDRESS_ASSIGNED).unwrap();
        sender
            .set_security_settings(SecurityLevel::EncMic32, &[0u8; 16])
            .unwrap();
        sender.security.frame_counter = 1;

        let mut receiver: MacContext<SoftwareCcmStar> =
            MacContext::new([0x10; 8], SoftwareCcmStar::new());
        receiver.set_pan_id(0xabcd).unwrap();
        receiver.set_short_addr(0xbeef).unwrap();
        receiver
            .set_security_settings(SecurityLevel::EncMic32, &[0u8; 16])
            .unwrap();

        let (params, ll_hdr_len, authtag_len) =
            get_data_frame_params(&sender, Some(Address::from_short(0xbeef)), None).unwrap();
        // Extended source: no short address is assigned.
        assert!(matches!(params.src_addr, Address::Extended(_)));
        assert_eq!(params.version, FrameVersion::Ieee802154_2020);
        assert_eq!(authtag_len, 4);

        let payload = b"hi";
        let mut buffer = std::vec![0u8; ll_hdr_len + payload.len() + authtag_len];
        buffer[ll_hdr_len..][..payload.len()].copy_from_slice(payload);

        write_mhr_and_security(
            &mut sender,
            FrameType::Data,
            &params,
            &mut buffer,
            ll_hdr_len,
            authtag_len,
        )
        .unwrap();

        // The plaintext has been replaced and the counter advanced.
        assert_ne!(&buffer[ll_hdr_len..][..2], payload);
        assert_eq!(sender.security.frame_counter, 2);

        // The receiver accepts and recovers the payload.
        let buffer_len = buffer.len();
        let frame = parse_mhr(&mut buffer).unwrap();
        assert!(frame.frame_control().security_enabled());
        assert!(filter(&receiver, &frame));
        let payload_offset = buffer_len - frame.payload().map_or(0, |p| p.len());
        assert_eq!(payload_offset, ll_hdr_len);

        let new_len = incoming_security_procedure(
            &mut receiver.security,
            &mut buffer,
            ll_hdr_len,
            None,
            0xabcd,
        )
        .unwrap();
        assert_eq!(new_len, ll_hdr_len + payload.len());
        assert_eq!(&buffer[ll_hdr_len..new_len], payload);
    }

    #[test]
    fn filter_accepts_own_and_broadcast_traffic() {
        let ctx = context();

        // Broadcast data frame.
        let broadcast = [
            0x41, 0x88, 0x01, 0xcd, 0xab, 0xff, 0xff, 0x34, 0x12, 0xaa,
        ];
        let frame = Frame::new(&broadcast[..]).unwrap();
        assert!(filter(&ctx, &frame));
        // The filter has no side effects: the verdict repeats.
        assert!(filter(&ctx, &frame));

        // Unicast to our short address.
        let unicast = [
            0x41, 0x88, 0x01, 0xcd, 0xab, 0x34, 0x12, 0xef, 0xbe, 0xaa,
        ];
        assert!(filter(&ctx, &Frame::new(&unicast[..]).unwrap()));

        // Unicast to somebody else.
        let foreign = [
            0x41, 0x88, 0x01, 0xcd, 0xab, 0x99, 0x99, 0x34, 0x12, 0xaa,
        ];
        assert!(!filter(&ctx, &Frame::new(&foreign[..]).unwrap()));

        // Wrong PAN.
        let wrong_pan = [
            0x41, 0x88, 0x01, 0x01, 0x00, 0xff, 0xff, 0x34, 0x12, 0xaa,
        ];
        assert!(!filter(&ctx, &Frame::new(&wrong_pan[..]).unwrap()));
    }

    #[test]
    fn filter_enforces_coordinator_role() {
        let beacon_request = [0x03, 0x08, 0x01, 0xff, 0xff, 0xff, 0xff, 0x07];
        let frame = Frame::new(&beacon_request[..]).unwrap();

        let mut ctx = context();
        assert!(!filter(&ctx, &frame));

        ctx.set_device_role(DeviceRole::PanCoordinator).unwrap();
        assert!(filter(&ctx, &frame));
    }

    #[test]
    fn enh_ack_time_correction_wire_format() {
        let frame = create_enh_ack_frame(true, 1).unwrap();
        assert_eq!(frame.as_slice(), &[0x02, 0x23, 0x02, 0x0f, 0x01, 0x00]);

        // The NACK flag marks rejected frames.
        let nack = create_enh_ack_frame(false, -600).unwrap();
        let parsed = Frame::new(nack.as_slice()).unwrap();
        let ie = parsed.information_elements().unwrap();
        let tc = ie.header_information_elements().next().unwrap();
        let tc = mac154_frame::TimeCorrection::new(tc.content()).unwrap();
        assert!(tc.nack());
        assert_eq!(tc.time_correction(), Duration::from_us(-600));
    }

    #[test]
    fn enh_ack_range_check() {
        assert!(create_enh_ack_frame(true, 2047).is_ok());
        assert!(create_enh_ack_frame(true, -2048).is_ok());
        assert_eq!(create_enh_ack_frame(true, 2048).unwrap_err(), Error::Invalid);
        assert_eq!(
            create_enh_ack_frame(true, -2049).unwrap_err(),
            Error::Invalid
        );
    }

    #[test]
    fn beacon_request_command() {
        let mut ctx = context();

        let (mut frame, content_offset) =
            create_mac_cmd_frame(&mut ctx, CommandFrameIdentifier::BeaconRequest, FrameParams::new())
                .unwrap();
        finalize_mac_cmd_frame(&mut frame, CommandFrameIdentifier::BeaconRequest);

        assert_eq!(content_offset, 8);
        assert_eq!(frame.len, 8);
        assert_eq!(
            &frame.as_slice()[..2],
            &[0x03, 0x08],
            "beacon requests are broadcast without a source"
        );

        // The emitted command satisfies its own RX validation.
        MacCommandFrame::new(frame.as_slice()).unwrap();
    }

    #[test]
    fn association_request_command() {
        let mut ctx = context();

        let mut params = FrameParams::new();
        params.dst_pan_id = 0xabcd;
        params.dst_addr = Address::from_short(0x0000);

        let (mut frame, content_offset) =
            create_mac_cmd_frame(&mut ctx, CommandFrameIdentifier::AssociationRequest, params)
                .unwrap();

        // Capability information octet.
        frame.buffer[content_offset] = 0x80;
        finalize_mac_cmd_frame(&mut frame, CommandFrameIdentifier::AssociationRequest);

        let parsed = MacCommandFrame::new(frame.as_slice()).unwrap();
        assert_eq!(
            parsed.command().unwrap(),
            CommandFrameIdentifier::AssociationRequest
        );
        assert_eq!(parsed.content().unwrap(), &[0x80]);
    }

    #[test]
    fn gts_request_needs_a_short_address() {
        let mut ctx = context();
        ctx.short_addr = super::super::NO_SHORT_ADDRESS_ASSIGNED;

        assert_eq!(
            create_mac_cmd_frame(&mut ctx, CommandFrameIdentifier::GtsRequest, FrameParams::new())
                .unwrap_err(),
            Error::NotAssociated
        );
    }

    #[test]
    fn frame_pending_is_repaired_on_legacy_commands() {
        // Beacon request with the frame pending bit set.
        let mut buffer = [0x13, 0x08, 0x01, 0xff, 0xff, 0xff, 0xff, 0x07];
        let frame = parse_mhr(&mut buffer).unwrap();
        assert!(!frame.frame_control().frame_pending());
        assert_eq!(buffer[0], 0x03);
    }

    #[test]
    fn enhanced_beacon_advertises_the_schedule() {
        let mut ctx = context();
        ctx.set_device_role(DeviceRole::PanCoordinator).unwrap();
        ctx.tsch.asn = crate::tsch::Asn::new(14);
        ctx.tsch.schedule.set_slotframe(0, 13, true).unwrap();
        ctx.tsch
            .schedule
            .set_link(crate::tsch::TschLink {
                handle: 0,
                slotframe_handle: 0,
                timeslot: 0,
                channel_offset: 0,
                node_addr: Address::BROADCAST,
                tx: true,
                rx: true,
                shared: false,
                timekeeping: true,
                priority: false,
                advertising: true,
                advertise: true,
            })
            .unwrap();
        ctx.hopping_sequence =
            Some(crate::tsch::HoppingSequence::new(&[20, 25, 26, 15]).unwrap());

        let frame = create_enh_beacon(&ctx, 16, true).unwrap();
        let parsed = Frame::new(frame.as_slice()).unwrap();
        assert_eq!(parsed.frame_control().frame_type(), FrameType::Beacon);
        assert_eq!(
            parsed.frame_control().frame_version(),
            FrameVersion::Ieee802154_2020
        );

        let ie = parsed.information_elements().unwrap();
        assert!(ie.payload_ie_present());

        let payload_ie = ie.payload_information_elements().next().unwrap();
        let mut nested = payload_ie.nested_information_elements();

        let sync = nested.next().unwrap();
        let sync = mac154_frame::TschSynchronization::new(sync.content()).unwrap();
        assert_eq!(sync.absolute_slot_number(), 14);
        assert_eq!(sync.join_metric(), 1);

        let timeslot = nested.next().unwrap();
        let timeslot = mac154_frame::TschTimeslot::new(timeslot.content()).unwrap();
        assert!(!timeslot.is_shortened());

        let slotframes = nested.next().unwrap();
        let slotframes = mac154_frame::TschSlotframeAndLink::new(slotframes.content()).unwrap();
        assert_eq!(slotframes.number_of_slotframes(), 1);
        let descriptor = slotframes.slotframe_descriptors().next().unwrap();
        assert_eq!(descriptor.size(), 13);
        assert_eq!(descriptor.links(), 1);

        let hopping = nested.next().unwrap();
        let hopping = mac154_frame::ChannelHopping::new(hopping.content()).unwrap();
        assert!(!hopping.is_shortened());
        assert_eq!(hopping.hopping_sequence_length(), 4);
        assert_eq!(hopping.current_hop(), 2);
    }

    #[test]
    fn shortened_enhanced_beacon_is_compact() {
        let mut ctx = context();
        ctx.tsch.schedule.set_slotframe(0, 13, true).unwrap();
        ctx.hopping_sequence =
            Some(crate::tsch::HoppingSequence::new(&[20, 25, 26, 15]).unwrap());

        let full = create_enh_beacon(&ctx, 16, true).unwrap();
        let short = create_enh_beacon(&ctx, 16, false).unwrap();
        assert!(short.len < full.len);
    }
}
