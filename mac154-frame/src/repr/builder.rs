use super::*;
use crate::{Address, AddressingMode, FrameType, FrameVersion};
use crate::{Error, Result};

/// Marker type for beacon frame builders.
pub struct Beacon;
/// Marker type for enhanced beacon frame builders.
pub struct EnhancedBeacon;
/// Marker type for acknowledgment frame builders.
pub struct Ack;
/// Marker type for data frame builders.
pub struct Data;

/// A helper for building IEEE 802.15.4 frames.
///
/// The builder fills in a [`FrameRepr`]; [`finalize`] derives the PAN ID
/// compression from the addressing fields and returns the representation.
///
/// [`finalize`]: FrameBuilder::finalize
pub struct FrameBuilder<'p, T> {
    frame: FrameRepr<'p>,
    marker: core::marker::PhantomData<T>,
}

fn base_frame_control(frame_type: FrameType, version: FrameVersion) -> FrameControlRepr {
    FrameControlRepr {
        frame_type,
        security_enabled: false,
        frame_pending: false,
        ack_request: false,
        pan_id_compression: false,
        sequence_number_suppression: true,
        information_elements_present: false,
        dst_addressing_mode: AddressingMode::Absent,
        src_addressing_mode: AddressingMode::Absent,
        frame_version: version,
    }
}

impl<'p> FrameBuilder<'p, Ack> {
    /// Create a new builder for an immediate acknowledgment frame.
    pub fn new_imm_ack(sequence_number: u8) -> Self {
        let mut frame_control =
            base_frame_control(FrameType::Ack, FrameVersion::Ieee802154_2006);
        frame_control.sequence_number_suppression = false;

        Self {
            frame: FrameRepr {
                frame_control,
                sequence_number: Some(sequence_number),
                addressing_fields: None,
                information_elements: None,
                payload: None,
            },
            marker: core::marker::PhantomData,
        }
    }

    /// Create a new builder for an enhanced acknowledgment frame.
    pub fn new_enh_ack() -> Self {
        Self {
            frame: FrameRepr {
                frame_control: base_frame_control(
                    FrameType::Ack,
                    FrameVersion::Ieee802154_2020,
                ),
                sequence_number: None,
                addressing_fields: None,
                information_elements: None,
                payload: None,
            },
            marker: core::marker::PhantomData,
        }
    }
}

impl<'p> FrameBuilder<'p, Beacon> {
    /// Create a new builder for a legacy beacon frame.
    pub fn new_beacon() -> Self {
        Self {
            frame: FrameRepr {
                frame_control: base_frame_control(
                    FrameType::Beacon,
                    FrameVersion::Ieee802154_2006,
                ),
                sequence_number: None,
                addressing_fields: None,
                information_elements: None,
                payload: None,
            },
            marker: core::marker::PhantomData,
        }
    }
}

impl<'p> FrameBuilder<'p, EnhancedBeacon> {
    /// Create a new builder for an enhanced beacon frame.
    pub fn new_enhanced_beacon() -> Self {
        Self {
            frame: FrameRepr {
                frame_control: base_frame_control(
                    FrameType::Beacon,
                    FrameVersion::Ieee802154_2020,
                ),
                sequence_number: None,
                addressing_fields: None,
                information_elements: None,
                payload: None,
            },
            marker: core::marker::PhantomData,
        }
    }
}

impl<'p> FrameBuilder<'p, Data> {
    /// Create a new builder for a data frame.
    pub fn new_data(payload: &'p [u8]) -> Self {
        Self {
            frame: FrameRepr {
                frame_control: base_frame_control(
                    FrameType::Data,
                    FrameVersion::Ieee802154_2006,
                ),
                sequence_number: None,
                addressing_fields: None,
                information_elements: None,
                payload: Some(payload),
            },
            marker: core::marker::PhantomData,
        }
    }
}

impl<'p, T> FrameBuilder<'p, T> {
    /// Set the sequence number and clear sequence number suppression.
    pub fn set_sequence_number(mut self, sequence_number: u8) -> Self {
        self.frame.sequence_number = Some(sequence_number);
        self.frame.frame_control.sequence_number_suppression = false;
        self
    }

    /// Set the acknowledgment request bit.
    pub fn set_ack_request(mut self, ack_request: bool) -> Self {
        self.frame.frame_control.ack_request = ack_request;
        self
    }

    /// Set the destination PAN ID.
    pub fn set_dst_pan_id(mut self, pan_id: u16) -> Self {
        self.frame
            .addressing_fields
            .get_or_insert_with(AddressingFieldsRepr::default)
            .dst_pan_id = Some(pan_id);
        self
    }

    /// Set the source PAN ID.
    pub fn set_src_pan_id(mut self, pan_id: u16) -> Self {
        self.frame
            .addressing_fields
            .get_or_insert_with(AddressingFieldsRepr::default)
            .src_pan_id = Some(pan_id);
        self
    }

    /// Set the destination address and the matching addressing mode.
    pub fn set_dst_address(mut self, address: Address) -> Self {
        self.frame.frame_control.dst_addressing_mode = address.into();
        self.frame
            .addressing_fields
            .get_or_insert_with(AddressingFieldsRepr::default)
            .dst_address = Some(address);
        self
    }

    /// Set the source address and the matching addressing mode.
    pub fn set_src_address(mut self, address: Address) -> Self {
        self.frame.frame_control.src_addressing_mode = address.into();
        self.frame
            .addressing_fields
            .get_or_insert_with(AddressingFieldsRepr::default)
            .src_address = Some(address);
        self
    }

    /// Add a Header Information Element.
    ///
    /// This sets the IE-present bit and forces the frame version to 2015+.
    pub fn add_header_information_element(
        mut self,
        ie: HeaderInformationElementRepr,
    ) -> Result<Self> {
        self.frame.frame_control.information_elements_present = true;
        self.frame.frame_control.frame_version = FrameVersion::Ieee802154_2020;
        self.frame
            .information_elements
            .get_or_insert_with(InformationElementsRepr::default)
            .header_information_elements
            .push(ie)
            .map_err(|_| Error)?;

        Ok(self)
    }

    /// Add a Payload Information Element.
    ///
    /// This sets the IE-present bit and forces the frame version to 2015+.
    pub fn add_payload_information_element(
        mut self,
        ie: PayloadInformationElementRepr,
    ) -> Result<Self> {
        self.frame.frame_control.information_elements_present = true;
        self.frame.frame_control.frame_version = FrameVersion::Ieee802154_2020;
        self.frame
            .information_elements
            .get_or_insert_with(InformationElementsRepr::default)
            .payload_information_elements
            .push(ie)
            .map_err(|_| Error)?;

        Ok(self)
    }

    /// Set the frame payload.
    pub fn set_payload(mut self, payload: &'p [u8]) -> Self {
        self.frame.payload = Some(payload);
        self
    }

    /// Finalize the builder, deriving PAN ID compression from the
    /// addressing fields.
    pub fn finalize(mut self) -> Result<FrameRepr<'p>> {
        if matches!(self.frame.frame_control.frame_type, FrameType::Ack)
            && self.frame.frame_control.frame_version.is_legacy()
        {
            // An immediate acknowledgment needs a sequence number and no
            // addressing fields.
            if self.frame.sequence_number.is_none() {
                return Err(Error);
            }

            self.frame.addressing_fields = None;

            return Ok(self.frame);
        }

        match self.frame.frame_control.frame_version {
            FrameVersion::Ieee802154_2020 => {
                let Some(addr) = self.frame.addressing_fields.as_mut() else {
                    // Addressless 2015+ frames are valid (e.g. Enh-Acks).
                    return Ok(self.frame);
                };

                self.frame.frame_control.pan_id_compression = match (
                    addr.dst_address,
                    addr.src_address,
                    addr.dst_pan_id,
                    addr.src_pan_id,
                ) {
                    (None, None, None, None) => false,
                    (None, None, Some(_), None) => true,
                    (Some(_), None, Some(_), None) => false,
                    (Some(_), None, None, None) => true,
                    (None, Some(_), None, Some(_)) => false,
                    (None, Some(_), None, None) => true,
                    (Some(Address::Extended(_)), Some(Address::Extended(_)), Some(_), None) => {
                        false
                    }
                    (Some(Address::Extended(_)), Some(Address::Extended(_)), None, None) => true,
                    (Some(_), Some(_), Some(dst), Some(src)) => {
                        if dst == src {
                            addr.src_pan_id = None;
                        }

                        dst == src
                    }
                    (Some(_), Some(_), Some(_), None) => true,
                    _ => return Err(Error),
                };
            }
            FrameVersion::Ieee802154_2003 | FrameVersion::Ieee802154_2006 => {
                // With both addresses present and equal PAN IDs the source
                // PAN ID is elided and the compression bit set; a single
                // present address carries its PAN ID uncompressed.
                let Some(addr) = self.frame.addressing_fields.as_mut() else {
                    return Err(Error);
                };

                match (
                    addr.dst_address,
                    addr.src_address,
                    addr.dst_pan_id,
                    addr.src_pan_id,
                ) {
                    (Some(_), Some(_), Some(dst_pan_id), Some(src_pan_id)) => {
                        if dst_pan_id == src_pan_id {
                            self.frame.frame_control.pan_id_compression = true;
                            addr.src_pan_id = None;
                        }
                    }
                    (Some(_), None, Some(_), _) => {
                        self.frame.frame_control.pan_id_compression = false;
                        addr.src_pan_id = None;
                    }
                    (None, Some(_), _, Some(_)) => {
                        self.frame.frame_control.pan_id_compression = false;
                        addr.dst_pan_id = None;
                    }
                    _ => return Err(Error),
                }
            }
            FrameVersion::Unknown => return Err(Error),
        }

        Ok(self.frame)
    }
}
