//! Legacy (pre-2015) beacon frame reader.
//!
//! The beacon payload starts with the superframe specification, the GTS
//! fields and the pending address fields, see section 7.3.1. Enhanced
//! beacons (2015+) carry their information in IEs instead and are read
//! through the generic [`Frame`] reader.
//!
//! [`Frame`]: crate::Frame

use crate::{Address, Error, Frame, FrameType, Result};

/// A reader for the 2-octet superframe specification, see section 7.3.1.3.
pub struct SuperframeSpecification<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> SuperframeSpecification<T> {
    /// The length of the superframe specification in octets.
    pub const LEN: usize = 2;

    /// Create a new [`SuperframeSpecification`] reader from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        if buffer.as_ref().len() < Self::LEN {
            return Err(Error);
        }

        Ok(Self { buffer })
    }

    fn raw(&self) -> u16 {
        let b = &self.buffer.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the beacon order field value.
    pub fn beacon_order(&self) -> u8 {
        (self.raw() & 0b1111) as u8
    }

    /// Return the superframe order field value.
    pub fn superframe_order(&self) -> u8 {
        ((self.raw() >> 4) & 0b1111) as u8
    }

    /// Return the final CAP slot field value.
    pub fn final_cap_slot(&self) -> u8 {
        ((self.raw() >> 8) & 0b1111) as u8
    }

    /// Return the battery life extension field value.
    pub fn battery_life_extension(&self) -> bool {
        (self.raw() >> 12) & 0b1 == 1
    }

    /// Return the PAN coordinator field value.
    pub fn pan_coordinator(&self) -> bool {
        (self.raw() >> 14) & 0b1 == 1
    }

    /// Return the association permit field value.
    pub fn association_permit(&self) -> bool {
        (self.raw() >> 15) & 0b1 == 1
    }
}

/// GTS direction of a guaranteed timeslot.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum GtsDirection {
    /// Receive-only GTS.
    Receive,
    /// Transmit-only GTS.
    Transmit,
}

impl From<u8> for GtsDirection {
    fn from(value: u8) -> Self {
        match value & 0b1 {
            0b0 => Self::Receive,
            _ => Self::Transmit,
        }
    }
}

/// A parsed GTS descriptor, see section 7.3.1.4.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct GtsDescriptor {
    /// Short address of the device owning the GTS.
    pub short_address: Address,
    /// Superframe slot at which the GTS begins.
    pub starting_slot: u8,
    /// Number of contiguous superframe slots of the GTS.
    pub length: u8,
    /// Direction of the GTS.
    pub direction: GtsDirection,
}

/// A reader for the GTS fields of a beacon, see section 7.3.1.4.
pub struct GtsFields<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> GtsFields<T> {
    /// The length of a single GTS descriptor in octets.
    const DESCRIPTOR_LEN: usize = 3;

    /// Create a new [`GtsFields`] reader from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        let gts = Self { buffer };

        if gts.buffer.as_ref().is_empty() {
            return Err(Error);
        }

        if gts.buffer.as_ref().len() < gts.len() {
            return Err(Error);
        }

        Ok(gts)
    }

    /// Return the GTS descriptor count field value.
    pub fn descriptor_count(&self) -> u8 {
        self.buffer.as_ref()[0] & 0b111
    }

    /// Return the GTS permit field value.
    pub fn gts_permit(&self) -> bool {
        (self.buffer.as_ref()[0] >> 7) & 0b1 == 1
    }

    /// Return the length of the GTS fields in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let count = self.descriptor_count() as usize;
        if count == 0 {
            1
        } else {
            // Specification, directions and descriptor list.
            1 + 1 + count * Self::DESCRIPTOR_LEN
        }
    }

    /// Return an [`Iterator`] over the GTS descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = GtsDescriptor> + '_ {
        let count = self.descriptor_count() as usize;
        let data = self.buffer.as_ref();
        (0..count).map(move |i| {
            let directions = data[1];
            let d = &data[2 + i * Self::DESCRIPTOR_LEN..][..Self::DESCRIPTOR_LEN];
            GtsDescriptor {
                short_address: Address::Short([d[1], d[0]]),
                starting_slot: d[2] & 0b1111,
                length: d[2] >> 4,
                direction: GtsDirection::from((directions >> i) & 0b1),
            }
        })
    }
}

/// A reader for the pending address fields of a beacon, see section 7.3.1.5.
pub struct PendingAddressFields<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> PendingAddressFields<T> {
    /// Create a new [`PendingAddressFields`] reader from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        let pending = Self { buffer };

        if pending.buffer.as_ref().is_empty() {
            return Err(Error);
        }

        if pending.buffer.as_ref().len() < pending.len() {
            return Err(Error);
        }

        Ok(pending)
    }

    /// Return the number of pending short addresses.
    pub fn short_address_count(&self) -> u8 {
        self.buffer.as_ref()[0] & 0b111
    }

    /// Return the number of pending extended addresses.
    pub fn extended_address_count(&self) -> u8 {
        (self.buffer.as_ref()[0] >> 4) & 0b111
    }

    /// Return the length of the pending address fields in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        1 + self.short_address_count() as usize * 2 + self.extended_address_count() as usize * 8
    }

    /// Return an [`Iterator`] over the pending addresses, short addresses
    /// first.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        let shorts = self.short_address_count() as usize;
        let extendeds = self.extended_address_count() as usize;
        let data = &self.buffer.as_ref()[1..];

        (0..shorts + extendeds).map(move |i| {
            if i < shorts {
                let mut raw = [0u8; 2];
                raw.copy_from_slice(&data[i * 2..][..2]);
                raw.reverse();
                Address::Short(raw)
            } else {
                let offset = shorts * 2 + (i - shorts) * 8;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&data[offset..][..8]);
                raw.reverse();
                Address::Extended(raw)
            }
        })
    }
}

/// A reader for a legacy (pre-2015) IEEE 802.15.4 beacon frame.
pub struct BeaconFrame<T: AsRef<[u8]>> {
    frame: Frame<T>,
}

impl<T: AsRef<[u8]>> BeaconFrame<T> {
    /// Create a new [`BeaconFrame`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a legacy beacon or its payload
    /// is too short for the declared GTS and pending address fields.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Frame::new(buffer)?;

        if frame.frame_control().frame_type() != FrameType::Beacon {
            return Err(Error);
        }

        if !frame.frame_control().frame_version().is_legacy() {
            return Err(Error);
        }

        let beacon = Self { frame };

        // Walking the variable-length fields validates them.
        beacon.beacon_payload()?;

        Ok(beacon)
    }

    fn mac_payload(&self) -> Result<&[u8]> {
        self.frame.payload().ok_or(Error)
    }

    /// Return the superframe specification.
    pub fn superframe_specification(&self) -> Result<SuperframeSpecification<&[u8]>> {
        SuperframeSpecification::new(self.mac_payload()?)
    }

    /// Return the GTS fields.
    pub fn gts_fields(&self) -> Result<GtsFields<&[u8]>> {
        let payload = self.mac_payload()?;
        GtsFields::new(
            payload
                .get(SuperframeSpecification::<&[u8]>::LEN..)
                .ok_or(Error)?,
        )
    }

    /// Return the pending address fields.
    pub fn pending_address_fields(&self) -> Result<PendingAddressFields<&[u8]>> {
        let offset = SuperframeSpecification::<&[u8]>::LEN + self.gts_fields()?.len();
        PendingAddressFields::new(self.mac_payload()?.get(offset..).ok_or(Error)?)
    }

    /// Return the beacon payload behind the pending address fields.
    pub fn beacon_payload(&self) -> Result<&[u8]> {
        let offset = SuperframeSpecification::<&[u8]>::LEN
            + self.gts_fields()?.len()
            + self.pending_address_fields()?.len();

        self.mac_payload()?.get(offset..).ok_or(Error)
    }

    /// Return the wrapped [`Frame`] reader.
    pub fn frame(&self) -> &Frame<T> {
        &self.frame
    }
}
