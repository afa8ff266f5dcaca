//! Addressing fields reader and writer.
//!
//! PAN identifier presence follows the compatibility rules of section
//! 7.2.2.6, for both the pre-2015 and the 2015+ encodings.

use super::{Error, Result};
use super::{FrameControl, FrameVersion};

/// An IEEE 802.15.4 address.
///
/// Short and extended addresses are stored most significant byte first; they
/// are byte-reversed into on-wire little-endian order when emitted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Address {
    /// The address is elided.
    Absent,
    /// A 16-bit short address.
    Short([u8; 2]),
    /// A 64-bit extended address.
    Extended([u8; 8]),
}

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address::Short([0xff; 2]);

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !self.is_broadcast()
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the address is elided.
    pub fn is_absent(&self) -> bool {
        matches!(self, Address::Absent)
    }

    /// Create an [`Address`] from a byte slice of length 0, 2 or 8.
    ///
    /// # Panics
    ///
    /// Panics on any other slice length.
    pub fn from_bytes(a: &[u8]) -> Self {
        match a.len() {
            0 => Address::Absent,
            2 => {
                let mut b = [0u8; 2];
                b.copy_from_slice(a);
                Address::Short(b)
            }
            8 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(a);
                Address::Extended(b)
            }
            _ => panic!("invalid address length"),
        }
    }

    /// Create a short [`Address`] from a host-order `u16`.
    pub const fn from_short(short: u16) -> Self {
        Address::Short(short.to_be_bytes())
    }

    /// Return the short address as a host-order `u16`, if this is a short
    /// address.
    pub fn as_short(&self) -> Option<u16> {
        match self {
            Address::Short(b) => Some(u16::from_be_bytes(*b)),
            _ => None,
        }
    }

    /// View the address as a byte slice.
    pub const fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Absent => &[],
            Address::Short(value) => value,
            Address::Extended(value) => value,
        }
    }

    /// Return the length of the address in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Address::Absent => 0,
            Address::Short(_) => 2,
            Address::Extended(_) => 8,
        }
    }
}

impl From<Address> for AddressingMode {
    fn from(value: Address) -> Self {
        match value {
            Address::Absent => AddressingMode::Absent,
            Address::Short(_) => AddressingMode::Short,
            Address::Extended(_) => AddressingMode::Extended,
        }
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Address::Absent => write!(f, "absent"),
            Address::Short(value) => write!(f, "{:02x}:{:02x}", value[0], value[1]),
            Address::Extended(value) => {
                let mut first = true;
                for b in value {
                    if !first {
                        write!(f, ":")?;
                    }
                    write!(f, "{:02x}", b)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// IEEE 802.15.4 addressing mode.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum AddressingMode {
    /// The address is not present.
    Absent = 0b00,
    /// A short address is present.
    Short = 0b10,
    /// An extended address is present.
    Extended = 0b11,
    /// Reserved encoding.
    Unknown,
}

impl AddressingMode {
    /// Return the size of an address in this mode, in octets.
    pub fn size(&self) -> usize {
        match self {
            Self::Short => 2,
            Self::Extended => 8,
            _ => 0,
        }
    }
}

impl From<u8> for AddressingMode {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Absent,
            0b10 => Self::Short,
            0b11 => Self::Extended,
            _ => Self::Unknown,
        }
    }
}

/// Field presence derived from the frame control, see section 7.2.2.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPresence {
    /// Whether the destination PAN ID field is present.
    pub dst_pan_id: bool,
    /// The destination addressing mode.
    pub dst_addr: AddressingMode,
    /// Whether the source PAN ID field is present.
    pub src_pan_id: bool,
    /// The source addressing mode.
    pub src_addr: AddressingMode,
}

impl AddressPresence {
    /// Derive which addressing sub-fields are present.
    ///
    /// Returns `None` for combinations the standard rejects, notably PAN ID
    /// compression without both addresses present on pre-2015 frames.
    pub fn derive(
        frame_version: FrameVersion,
        dst_addr_mode: AddressingMode,
        src_addr_mode: AddressingMode,
        pan_id_compression: bool,
    ) -> Option<Self> {
        use AddressingMode::*;

        if matches!(dst_addr_mode, Unknown) || matches!(src_addr_mode, Unknown) {
            return None;
        }

        match frame_version {
            FrameVersion::Ieee802154_2003 | FrameVersion::Ieee802154_2006 => {
                let has_dst = !matches!(dst_addr_mode, Absent);
                let has_src = !matches!(src_addr_mode, Absent);

                if !(has_dst && has_src) && pan_id_compression {
                    return None;
                }

                Some(Self {
                    dst_pan_id: has_dst,
                    dst_addr: dst_addr_mode,
                    src_pan_id: has_src && !pan_id_compression,
                    src_addr: src_addr_mode,
                })
            }
            FrameVersion::Ieee802154_2020 => {
                let (dst_pan_id, src_pan_id) =
                    match (dst_addr_mode, src_addr_mode, pan_id_compression) {
                        (Absent, Absent, false) => (false, false),
                        (Absent, Absent, true) => (true, false),
                        (_, Absent, false) => (true, false),
                        (_, Absent, true) => (false, false),
                        (Absent, _, false) => (false, true),
                        (Absent, _, true) => (false, false),
                        (Extended, Extended, false) => (true, false),
                        (Extended, Extended, true) => (false, false),
                        (_, _, false) => (true, true),
                        (_, _, true) => (true, false),
                    };

                Some(Self {
                    dst_pan_id,
                    dst_addr: dst_addr_mode,
                    src_pan_id,
                    src_addr: src_addr_mode,
                })
            }
            FrameVersion::Unknown => None,
        }
    }

    /// Total length of the addressing fields in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.dst_pan_id as usize) * 2
            + self.dst_addr.size()
            + (self.src_pan_id as usize) * 2
            + self.src_addr.size()
    }
}

/// A reader/writer for the IEEE 802.15.4 addressing fields.
pub struct AddressingFields<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AddressingFields<T> {
    /// Create a new [`AddressingFields`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame control encodes an invalid addressing
    /// combination or the buffer is too short to hold all present fields.
    pub fn new<FC: AsRef<[u8]>>(buffer: T, fc: &FrameControl<FC>) -> Result<Self> {
        let af = Self::new_unchecked(buffer);

        if !af.check_len(fc) {
            return Err(Error);
        }

        Ok(af)
    }

    fn check_len<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> bool {
        match self.presence(fc) {
            Some(presence) => self.buffer.as_ref().len() >= presence.len(),
            None => false,
        }
    }

    /// Create a new [`AddressingFields`] reader/writer from a given buffer
    /// without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    fn presence<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> Option<AddressPresence> {
        AddressPresence::derive(
            fc.frame_version(),
            fc.dst_addressing_mode(),
            fc.src_addressing_mode(),
            fc.pan_id_compression(),
        )
    }

    /// Return the length of the addressing fields in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> usize {
        self.presence(fc).map_or(0, |p| p.len())
    }

    fn read_address(&self, offset: usize, mode: AddressingMode) -> Option<Address> {
        match mode {
            AddressingMode::Absent => Some(Address::Absent),
            AddressingMode::Short => {
                let mut raw = [0u8; 2];
                raw.copy_from_slice(&self.buffer.as_ref()[offset..][..2]);
                raw.reverse();
                Some(Address::Short(raw))
            }
            AddressingMode::Extended => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.buffer.as_ref()[offset..][..8]);
                raw.reverse();
                Some(Address::Extended(raw))
            }
            AddressingMode::Unknown => None,
        }
    }

    /// Return the destination [`Address`] if present.
    pub fn dst_address<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> Option<Address> {
        let presence = self.presence(fc)?;
        self.read_address((presence.dst_pan_id as usize) * 2, presence.dst_addr)
    }

    /// Return the source [`Address`] if present.
    pub fn src_address<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> Option<Address> {
        let presence = self.presence(fc)?;
        let offset = (presence.dst_pan_id as usize) * 2
            + presence.dst_addr.size()
            + (presence.src_pan_id as usize) * 2;
        self.read_address(offset, presence.src_addr)
    }

    /// Return the destination PAN identifier if not elided, in host order.
    pub fn dst_pan_id<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> Option<u16> {
        let presence = self.presence(fc)?;
        if !presence.dst_pan_id {
            return None;
        }

        let b = &self.buffer.as_ref()[..2];
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Return the source PAN identifier if not elided, in host order.
    pub fn src_pan_id<FC: AsRef<[u8]>>(&self, fc: &FrameControl<FC>) -> Option<u16> {
        let presence = self.presence(fc)?;
        if !presence.src_pan_id {
            return None;
        }

        let offset = (presence.dst_pan_id as usize) * 2 + presence.dst_addr.size();
        let b = &self.buffer.as_ref()[offset..][..2];
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn fmt_fields<FC: AsRef<[u8]>>(
        &self,
        f: &mut core::fmt::Formatter<'_>,
        fc: &FrameControl<FC>,
    ) -> core::fmt::Result {
        writeln!(f, "Addressing Fields")?;

        if let Some(id) = self.dst_pan_id(fc) {
            writeln!(f, "  dst pan id: {:04x}", id)?;
        }

        if let Some(addr) = self.dst_address(fc) {
            writeln!(f, "  dst address: {}", addr)?;
        }

        if let Some(id) = self.src_pan_id(fc) {
            writeln!(f, "  src pan id: {:04x}", id)?;
        }

        if let Some(addr) = self.src_address(fc) {
            writeln!(f, "  src address: {}", addr)?;
        }

        Ok(())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AddressingFields<T> {
    fn write_address(&mut self, offset: usize, address: Address) -> usize {
        let b = &mut self.buffer.as_mut()[offset..][..address.len()];
        match address {
            Address::Absent => {}
            Address::Short(value) => {
                let mut addr = value;
                addr.reverse();
                b.copy_from_slice(&addr);
            }
            Address::Extended(value) => {
                let mut addr = value;
                addr.reverse();
                b.copy_from_slice(&addr);
            }
        }
        address.len()
    }

    /// Write the addressing fields described by the given representation.
    ///
    /// Fields are emitted in little-endian on-wire order.
    pub fn write_fields(&mut self, fields: &super::repr::AddressingFieldsRepr) {
        let mut offset = 0;

        if let Some(id) = fields.dst_pan_id {
            self.buffer.as_mut()[offset..][..2].copy_from_slice(&id.to_le_bytes());
            offset += 2;
        }

        if let Some(addr) = fields.dst_address {
            offset += self.write_address(offset, addr);
        }

        if let Some(id) = fields.src_pan_id {
            self.buffer.as_mut()[offset..][..2].copy_from_slice(&id.to_le_bytes());
            offset += 2;
        }

        if let Some(addr) = fields.src_address {
            self.write_address(offset, addr);
        }
    }
}
