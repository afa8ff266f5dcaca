//! Zero-copy read and write structures for IEEE 802.15.4 MAC frames.
//!
//! Every reader follows the same pattern:
//! - [`new`]: create a reader and validate the buffer,
//! - [`new_unchecked`]: create a reader without validation.
//!
//! The central reader is [`Frame`], which validates the frame control
//! word, the addressing fields, the auxiliary security header and the
//! information elements of an MPDU. Frame-type specific validation (data,
//! beacon, acknowledgment and MAC command frames) lives in the [`frames`]
//! readers, and high-level representations with `parse`/`buffer_len`/
//! `emit` in the `repr` layer.
//!
//! ## Reading a frame
//!
//! ```
//! use mac154_frame::{Frame, FrameType};
//!
//! let data = [0x02u8, 0x10, 0x2a];
//! let frame = Frame::new(&data[..]).unwrap();
//! assert_eq!(frame.frame_control().frame_type(), FrameType::Ack);
//! assert_eq!(frame.sequence_number(), Some(0x2a));
//! ```
//!
//! ## Writing a frame
//!
//! Frames are written either through [`FrameRepr::emit`] for a fully
//! described frame, or field by field through the `set_*` methods of
//! [`Frame`] when the caller computes offsets itself.
//!
//! All multi-octet fields are little-endian on the wire. Short and
//! extended addresses are byte-reversed between their in-memory and
//! on-wire representations.
//!
//! [`new`]: Frame::new
//! [`new_unchecked`]: Frame::new_unchecked

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[cfg(test)]
mod tests;

pub mod time;

mod frame_control;
pub use frame_control::*;

mod aux_sec_header;
pub use aux_sec_header::*;

mod addressing;
pub use addressing::*;

mod ie;
pub use ie::*;

pub mod frames;
pub use frames::*;

mod repr;
pub use repr::*;

/// The maximum size of an MPDU, excluding the FCS (handled by the PHY).
pub const MAX_FRAME_LEN: usize = 125;
/// The maximum PHY packet size, including the FCS.
pub const MAX_PHY_PACKET_LEN: usize = 127;
/// The minimum size of a well-formed MPDU.
pub const MIN_FRAME_LEN: usize = 2;

/// An error that can occur when reading or writing an IEEE 802.15.4 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

/// A type alias for `Result<T, mac154_frame::Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// A reader/writer for an IEEE 802.15.4 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    /// Create a new [`Frame`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame control word carries reserved
    /// encodings, when cross-field rules of section 7.2.2 are violated,
    /// when a non-implicit key identifier mode is used, or when the buffer
    /// is too short for the fields it announces.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Self::new_unchecked(buffer);

        if !frame.check_len() {
            return Err(Error);
        }

        let fc = frame.frame_control();

        if fc.frame_type() == FrameType::Unknown
            || fc.frame_version() == FrameVersion::Unknown
            || fc.dst_addressing_mode() == AddressingMode::Unknown
            || fc.src_addressing_mode() == AddressingMode::Unknown
        {
            return Err(Error);
        }

        let legacy = fc.frame_version().is_legacy();

        // A data frame must be addressed, see sections 7.2.2.9 and 7.2.2.11.
        if fc.frame_type() == FrameType::Data
            && legacy
            && fc.dst_addressing_mode() == AddressingMode::Absent
            && fc.src_addressing_mode() == AddressingMode::Absent
        {
            return Err(Error);
        }

        // A legacy beacon has a source but no destination and no PAN ID
        // compression, see sections 7.2.2.9, 7.2.2.11 and 7.3.1.2.
        if fc.frame_type() == FrameType::Beacon
            && legacy
            && (fc.dst_addressing_mode() != AddressingMode::Absent
                || fc.src_addressing_mode() == AddressingMode::Absent
                || fc.pan_id_compression())
        {
            return Err(Error);
        }

        // Sequence number suppression and IEs exist since 2015, see
        // sections 7.2.2.7 and 7.2.2.8.
        if (fc.sequence_number_suppression() || fc.information_elements_present()) && legacy {
            return Err(Error);
        }

        if frame.addressing_offset() > frame.buffer.as_ref().len() {
            return Err(Error);
        }

        // Validates the PAN ID compression combination and the buffer
        // length, unless this is an immediate ACK without addressing.
        if !frame.is_imm_ack() {
            AddressingFields::new(&frame.buffer.as_ref()[frame.addressing_offset()..], &fc)?;
        }

        if fc.security_enabled() {
            let aux = frame.auxiliary_security_header().ok_or(Error)?;
            // Only the implicit key identifier mode is supported.
            if aux.key_identifier_mode() != KeyIdentifierMode::Implicit {
                return Err(Error);
            }
        }

        if fc.information_elements_present() {
            let offset = frame.information_elements_offset();
            InformationElements::new(&frame.buffer.as_ref()[offset..])?;
        }

        Ok(frame)
    }

    /// Returns `false` if the buffer is too short to contain a valid frame.
    fn check_len(&self) -> bool {
        let buffer = self.buffer.as_ref();

        if buffer.len() < MIN_FRAME_LEN || buffer.len() > MAX_PHY_PACKET_LEN {
            return false;
        }

        if !self.frame_control().sequence_number_suppression() && buffer.len() < 3 {
            return false;
        }

        true
    }

    /// Create a new [`Frame`] reader/writer from a given buffer without
    /// validation.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// View the underlying buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    fn is_imm_ack(&self) -> bool {
        let fc = self.frame_control();
        fc.frame_type() == FrameType::Ack && fc.frame_version().is_legacy()
    }

    /// Return a [`FrameControl`] reader.
    pub fn frame_control(&self) -> FrameControl<&'_ [u8]> {
        FrameControl::new_unchecked(&self.buffer.as_ref()[..2])
    }

    /// Return the sequence number if not suppressed.
    pub fn sequence_number(&self) -> Option<u8> {
        if self.frame_control().sequence_number_suppression() {
            None
        } else {
            Some(self.buffer.as_ref()[2])
        }
    }

    fn addressing_offset(&self) -> usize {
        2 + !self.frame_control().sequence_number_suppression() as usize
    }

    /// Return an [`AddressingFields`] reader.
    ///
    /// Immediate acknowledgments carry no addressing fields.
    pub fn addressing(&self) -> Option<AddressingFields<&'_ [u8]>> {
        if self.is_imm_ack() {
            return None;
        }

        AddressingFields::new(
            &self.buffer.as_ref()[self.addressing_offset()..],
            &self.frame_control(),
        )
        .ok()
    }

    fn aux_sec_header_offset(&self) -> usize {
        self.addressing_offset()
            + self
                .addressing()
                .map_or(0, |af| af.len(&self.frame_control()))
    }

    /// Return an [`AuxiliarySecurityHeader`] reader if security is enabled.
    pub fn auxiliary_security_header(&self) -> Option<AuxiliarySecurityHeader<&'_ [u8]>> {
        if !self.frame_control().security_enabled() {
            return None;
        }

        AuxiliarySecurityHeader::new(&self.buffer.as_ref()[self.aux_sec_header_offset()..]).ok()
    }

    fn information_elements_offset(&self) -> usize {
        self.aux_sec_header_offset()
            + self
                .auxiliary_security_header()
                .map_or(0, |aux| aux.len())
    }

    /// Return an [`InformationElements`] reader if IEs are present.
    pub fn information_elements(&self) -> Option<InformationElements<&'_ [u8]>> {
        if !self.frame_control().information_elements_present() {
            return None;
        }

        InformationElements::new(&self.buffer.as_ref()[self.information_elements_offset()..]).ok()
    }

    fn payload_offset(&self) -> usize {
        self.information_elements_offset()
            + self.information_elements().map_or(0, |ie| ie.len())
    }
}

impl<T: AsRef<[u8]>> Frame<T> {
    /// Return the MAC payload of the frame, including payload IEs.
    pub fn mac_payload(&self) -> Option<&[u8]> {
        let offset = self.information_elements_offset();
        let buffer = self.buffer.as_ref();

        if buffer.len() <= offset {
            return None;
        }

        Some(&buffer[offset..])
    }

    /// Return the payload of the frame, excluding payload IEs.
    pub fn payload(&self) -> Option<&[u8]> {
        let offset = self.payload_offset();
        let buffer = self.buffer.as_ref();

        if buffer.len() <= offset {
            return None;
        }

        Some(&buffer[offset..])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    /// Set the Frame Control field values in the buffer, based on the given
    /// [`FrameControlRepr`].
    pub fn set_frame_control(&mut self, fc: &FrameControlRepr) {
        let mut w = FrameControl::new_unchecked(&mut self.buffer.as_mut()[..2]);
        w.set_frame_type(fc.frame_type);
        w.set_security_enabled(fc.security_enabled);
        w.set_frame_pending(fc.frame_pending);
        w.set_ack_request(fc.ack_request);
        w.set_pan_id_compression(fc.pan_id_compression);
        w.set_sequence_number_suppression(fc.sequence_number_suppression);
        w.set_information_elements_present(fc.information_elements_present);
        w.set_dst_addressing_mode(fc.dst_addressing_mode);
        w.set_src_addressing_mode(fc.src_addressing_mode);
        w.set_frame_version(fc.frame_version);
    }

    /// Return a mutable [`FrameControl`] writer.
    pub fn frame_control_mut(&mut self) -> FrameControl<&'_ mut [u8]> {
        FrameControl::new_unchecked(&mut self.buffer.as_mut()[..2])
    }

    /// Set the Sequence Number field value in the buffer.
    ///
    /// This clears the sequence number suppression bit.
    pub fn set_sequence_number(&mut self, sequence_number: u8) {
        self.frame_control_mut().set_sequence_number_suppression(false);
        self.buffer.as_mut()[2] = sequence_number;
    }

    /// Set the Addressing field values in the buffer, based on the given
    /// [`AddressingFieldsRepr`].
    pub fn set_addressing_fields(&mut self, addressing_fields: &AddressingFieldsRepr) {
        let offset = self.addressing_offset();
        AddressingFields::new_unchecked(&mut self.buffer.as_mut()[offset..])
            .write_fields(addressing_fields);
    }

    /// Return a mutable [`AuxiliarySecurityHeader`] writer over the
    /// auxiliary security header area.
    ///
    /// The security enabled bit must already be set.
    pub fn aux_sec_header_mut(&mut self) -> AuxiliarySecurityHeader<&'_ mut [u8]> {
        let offset = self.aux_sec_header_offset();
        AuxiliarySecurityHeader::new_unchecked(&mut self.buffer.as_mut()[offset..])
    }

    /// Set the Information Elements in the buffer.
    pub fn set_information_elements(
        &mut self,
        ie: &InformationElementsRepr,
        contains_payload: bool,
    ) {
        let offset = self.information_elements_offset();
        ie.emit(&mut self.buffer.as_mut()[offset..], contains_payload);
    }

    /// Set the payload of the frame.
    pub fn set_payload(&mut self, payload: &[u8]) {
        let offset = self.payload_offset();
        self.buffer.as_mut()[offset..][..payload.len()].copy_from_slice(payload);
    }
}

impl<T: AsRef<[u8]> + ?Sized> core::fmt::Display for Frame<&T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let fc = self.frame_control();
        write!(f, "{}", fc)?;

        if let Some(seq) = self.sequence_number() {
            writeln!(f, "Sequence number: {}", seq)?;
        }

        if let Some(af) = self.addressing() {
            af.fmt_fields(f, &fc)?;
        }

        if let Some(aux) = self.auxiliary_security_header() {
            write!(f, "{}", aux)?;
        }

        if let Some(ie) = self.information_elements() {
            writeln!(f, "Information Elements")?;
            for header_ie in ie.header_information_elements() {
                writeln!(f, "  {}", header_ie)?;
            }

            for payload_ie in ie.payload_information_elements() {
                writeln!(f, "  {}", payload_ie)?;
            }
        }

        if let Some(payload) = self.payload() {
            writeln!(f, "Payload")?;
            writeln!(f, "  {:0x?}", payload)?;
        }

        Ok(())
    }
}
