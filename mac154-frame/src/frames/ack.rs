//! Acknowledgment frame readers.

use crate::{Error, Frame, FrameType, FrameVersion, InformationElements, Result};

/// A reader for an immediate acknowledgment frame.
///
/// An Imm-Ack is exactly three octets: frame control and a sequence
/// number. It carries no addresses and no payload.
pub struct ImmAckFrame<T: AsRef<[u8]>> {
    frame: Frame<T>,
}

impl<T: AsRef<[u8]>> ImmAckFrame<T> {
    /// The length of an immediate acknowledgment frame in octets.
    pub const LEN: usize = 3;

    /// Create a new [`ImmAckFrame`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not hold a well-formed
    /// pre-2015 acknowledgment.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Frame::new(buffer)?;

        if frame.frame_control().frame_type() != FrameType::Ack {
            return Err(Error);
        }

        if !frame.frame_control().frame_version().is_legacy() {
            return Err(Error);
        }

        let ack = Self { frame };

        if ack.frame.as_bytes().len() != Self::LEN {
            return Err(Error);
        }

        Ok(ack)
    }

    /// Return the sequence number.
    pub fn sequence_number(&self) -> u8 {
        self.frame.sequence_number().unwrap_or_default()
    }

    /// Return the wrapped [`Frame`] reader.
    pub fn frame(&self) -> &Frame<T> {
        &self.frame
    }
}

/// A reader for an enhanced acknowledgment frame (2015+).
///
/// An Enh-Ack may carry addressing fields and information elements but no
/// frame payload.
pub struct EnhAckFrame<T: AsRef<[u8]>> {
    frame: Frame<T>,
}

impl<T: AsRef<[u8]>> EnhAckFrame<T> {
    /// Create a new [`EnhAckFrame`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a 2015+ acknowledgment or if
    /// it carries a frame payload.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Frame::new(buffer)?;

        if frame.frame_control().frame_type() != FrameType::Ack {
            return Err(Error);
        }

        if frame.frame_control().frame_version() != FrameVersion::Ieee802154_2020 {
            return Err(Error);
        }

        let ack = Self { frame };

        // An acknowledgment has no payload behind its IEs.
        if ack.frame.payload().is_some_and(|payload| !payload.is_empty()) {
            return Err(Error);
        }

        Ok(ack)
    }

    /// Return the sequence number if not suppressed.
    pub fn sequence_number(&self) -> Option<u8> {
        self.frame.sequence_number()
    }

    /// Return an [`InformationElements`] reader if IEs are present.
    pub fn information_elements(&self) -> Option<InformationElements<&'_ [u8]>> {
        self.frame.information_elements()
    }

    /// Return the wrapped [`Frame`] reader.
    pub fn frame(&self) -> &Frame<T> {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imm_ack() {
        let data = [0x02, 0x10, 0x2a];
        let ack = ImmAckFrame::new(&data[..]).unwrap();
        assert_eq!(ack.sequence_number(), 0x2a);
        assert_eq!(
            ack.frame().frame_control().frame_version(),
            FrameVersion::Ieee802154_2006
        );
    }

    #[test]
    fn imm_ack_with_payload_rejected() {
        let data = [0x02, 0x10, 0x2a, 0xde, 0xad];
        assert!(ImmAckFrame::new(&data[..]).is_err());
    }

    #[test]
    fn imm_ack_wrong_type_rejected() {
        // Data frame type in an ACK-sized frame.
        let data = [0x01, 0x10, 0x2a];
        assert!(ImmAckFrame::new(&data[..]).is_err());
    }

    #[test]
    fn enh_ack_with_time_correction() {
        // 2015 ACK, no addresses, seq suppressed, IE present:
        // a single Time Correction header IE.
        let data = [0x02, 0x23, 0x02, 0x0f, 0x01, 0x00];
        let ack = EnhAckFrame::new(&data[..]).unwrap();
        assert_eq!(ack.sequence_number(), None);

        let ie = ack.information_elements().unwrap();
        let header_ie = ie.header_information_elements().next().unwrap();
        assert_eq!(
            header_ie.element_id(),
            crate::HeaderElementId::TimeCorrection
        );
    }
}
