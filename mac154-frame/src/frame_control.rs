//! Frame Control field reader and writer, see section 7.2.2.1.

use super::AddressingMode;
use super::{Error, Result};

/// IEEE 802.15.4 frame type.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum FrameType {
    /// Beacon frame.
    Beacon = 0b000,
    /// Data frame.
    Data = 0b001,
    /// Acknowledgment frame (immediate or enhanced).
    Ack = 0b010,
    /// MAC command frame.
    MacCommand = 0b011,
    /// Multipurpose frame.
    Multipurpose = 0b101,
    /// Fragment or Frak frame.
    FragmentOrFrak = 0b110,
    /// Extended frame.
    Extended = 0b111,
    /// Reserved encoding.
    Unknown,
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            0b000 => Self::Beacon,
            0b001 => Self::Data,
            0b010 => Self::Ack,
            0b011 => Self::MacCommand,
            0b101 => Self::Multipurpose,
            0b110 => Self::FragmentOrFrak,
            0b111 => Self::Extended,
            _ => Self::Unknown,
        }
    }
}

/// IEEE 802.15.4 frame version.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum FrameVersion {
    /// IEEE 802.15.4-2003.
    Ieee802154_2003 = 0b00,
    /// IEEE 802.15.4-2006.
    Ieee802154_2006 = 0b01,
    /// IEEE 802.15.4-2015 and later.
    Ieee802154_2020 = 0b10,
    /// Reserved encoding.
    Unknown,
}

impl FrameVersion {
    /// Whether this is a pre-2015 frame version.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Ieee802154_2003 | Self::Ieee802154_2006)
    }
}

impl From<u8> for FrameVersion {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Ieee802154_2003,
            0b01 => Self::Ieee802154_2006,
            0b10 => Self::Ieee802154_2020,
            _ => Self::Unknown,
        }
    }
}

/// A reader/writer for the IEEE 802.15.4 Frame Control field.
pub struct FrameControl<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> FrameControl<T> {
    /// The length of the Frame Control field in octets.
    pub const LEN: usize = 2;

    /// Create a new [`FrameControl`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short.
    pub fn new(buffer: T) -> Result<Self> {
        let fc = Self::new_unchecked(buffer);

        if !fc.check_len() {
            return Err(Error);
        }

        Ok(fc)
    }

    /// Returns `false` if the buffer is too short to contain the Frame Control
    /// field.
    fn check_len(&self) -> bool {
        self.buffer.as_ref().len() >= Self::LEN
    }

    /// Create a new [`FrameControl`] reader/writer from a given buffer without
    /// length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    fn raw(&self) -> u16 {
        let b = &self.buffer.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the [`FrameType`] field.
    pub fn frame_type(&self) -> FrameType {
        FrameType::from((self.raw() & 0b111) as u8)
    }

    /// Returns `true` when the security enabled field is set.
    pub fn security_enabled(&self) -> bool {
        (self.raw() >> 3) & 0b1 == 1
    }

    /// Returns `true` when the frame pending field is set.
    pub fn frame_pending(&self) -> bool {
        (self.raw() >> 4) & 0b1 == 1
    }

    /// Returns `true` when the acknowledgment request field is set.
    pub fn ack_request(&self) -> bool {
        (self.raw() >> 5) & 0b1 == 1
    }

    /// Returns `true` when the PAN ID compression field is set.
    pub fn pan_id_compression(&self) -> bool {
        (self.raw() >> 6) & 0b1 == 1
    }

    /// Returns `true` when the sequence number suppression field is set.
    pub fn sequence_number_suppression(&self) -> bool {
        (self.raw() >> 8) & 0b1 == 1
    }

    /// Returns `true` when the information elements present field is set.
    pub fn information_elements_present(&self) -> bool {
        (self.raw() >> 9) & 0b1 == 1
    }

    /// Return the destination [`AddressingMode`].
    pub fn dst_addressing_mode(&self) -> AddressingMode {
        AddressingMode::from(((self.raw() >> 10) & 0b11) as u8)
    }

    /// Return the [`FrameVersion`].
    pub fn frame_version(&self) -> FrameVersion {
        FrameVersion::from(((self.raw() >> 12) & 0b11) as u8)
    }

    /// Return the source [`AddressingMode`].
    pub fn src_addressing_mode(&self) -> AddressingMode {
        AddressingMode::from(((self.raw() >> 14) & 0b11) as u8)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> FrameControl<T> {
    fn set_raw(&mut self, raw: u16) {
        self.buffer.as_mut()[..2].copy_from_slice(&raw.to_le_bytes());
    }

    fn set_bit(&mut self, shift: u16, value: bool) {
        let raw = self.raw();
        self.set_raw((raw & !(1 << shift)) | ((value as u16) << shift));
    }

    /// Set the frame type field.
    pub fn set_frame_type(&mut self, frame_type: FrameType) {
        let raw = self.raw();
        self.set_raw((raw & !0b111) | (frame_type as u8 as u16 & 0b111));
    }

    /// Set the security enabled field.
    pub fn set_security_enabled(&mut self, security_enabled: bool) {
        self.set_bit(3, security_enabled);
    }

    /// Set the frame pending field.
    pub fn set_frame_pending(&mut self, frame_pending: bool) {
        self.set_bit(4, frame_pending);
    }

    /// Set the acknowledgment request field.
    pub fn set_ack_request(&mut self, ack_request: bool) {
        self.set_bit(5, ack_request);
    }

    /// Set the PAN ID compression field.
    pub fn set_pan_id_compression(&mut self, pan_id_compression: bool) {
        self.set_bit(6, pan_id_compression);
    }

    /// Set the sequence number suppression field.
    pub fn set_sequence_number_suppression(&mut self, suppression: bool) {
        self.set_bit(8, suppression);
    }

    /// Set the information elements present field.
    pub fn set_information_elements_present(&mut self, present: bool) {
        self.set_bit(9, present);
    }

    /// Set the destination addressing mode field.
    pub fn set_dst_addressing_mode(&mut self, mode: AddressingMode) {
        let raw = self.raw();
        self.set_raw((raw & !(0b11 << 10)) | ((mode as u8 as u16 & 0b11) << 10));
    }

    /// Set the frame version field.
    pub fn set_frame_version(&mut self, version: FrameVersion) {
        let raw = self.raw();
        self.set_raw((raw & !(0b11 << 12)) | ((version as u8 as u16 & 0b11) << 12));
    }

    /// Set the source addressing mode field.
    pub fn set_src_addressing_mode(&mut self, mode: AddressingMode) {
        let raw = self.raw();
        self.set_raw((raw & !(0b11 << 14)) | ((mode as u8 as u16 & 0b11) << 14));
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for FrameControl<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Frame Control")?;
        writeln!(f, "  type: {:?}", self.frame_type())?;
        writeln!(f, "  security enabled: {}", self.security_enabled() as usize)?;
        writeln!(f, "  frame pending: {}", self.frame_pending() as usize)?;
        writeln!(f, "  ack request: {}", self.ack_request() as usize)?;
        writeln!(
            f,
            "  pan id compression: {}",
            self.pan_id_compression() as usize
        )?;
        writeln!(
            f,
            "  sequence number suppression: {}",
            self.sequence_number_suppression() as usize
        )?;
        writeln!(
            f,
            "  information elements present: {}",
            self.information_elements_present() as usize
        )?;
        writeln!(f, "  dst addressing mode: {:?}", self.dst_addressing_mode())?;
        writeln!(f, "  src addressing mode: {:?}", self.src_addressing_mode())?;
        writeln!(f, "  frame version: {:?}", self.frame_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_imm_ack_fcf() {
        // Frame control of an immediate ACK: type = ACK, version = 2006.
        let fc = FrameControl::new(&[0x02, 0x10][..]).unwrap();
        assert_eq!(fc.frame_type(), FrameType::Ack);
        assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2006);
        assert_eq!(fc.dst_addressing_mode(), AddressingMode::Absent);
        assert_eq!(fc.src_addressing_mode(), AddressingMode::Absent);
        assert!(!fc.security_enabled());
        assert!(!fc.ack_request());
    }

    #[test]
    fn set_and_clear_bits() {
        let mut buffer = [0u8; 2];
        let mut fc = FrameControl::new_unchecked(&mut buffer[..]);
        fc.set_frame_type(FrameType::Data);
        fc.set_ack_request(true);
        fc.set_frame_version(FrameVersion::Ieee802154_2006);
        fc.set_dst_addressing_mode(AddressingMode::Short);
        fc.set_src_addressing_mode(AddressingMode::Short);
        fc.set_pan_id_compression(true);

        let fc = FrameControl::new_unchecked(&buffer[..]);
        assert_eq!(fc.frame_type(), FrameType::Data);
        assert!(fc.ack_request());
        assert!(fc.pan_id_compression());

        let mut fc = FrameControl::new_unchecked(&mut buffer[..]);
        fc.set_ack_request(false);
        fc.set_frame_pending(false);
        let fc = FrameControl::new_unchecked(&buffer[..]);
        assert!(!fc.ack_request());
        assert_eq!(fc.frame_type(), FrameType::Data);
    }

    #[test]
    fn reserved_encodings() {
        assert_eq!(FrameType::from(0b100), FrameType::Unknown);
        assert_eq!(FrameVersion::from(0b11), FrameVersion::Unknown);
    }
}
