//! Header Information Element readers and writers.
//!
//! A Header IE starts with a 2-octet descriptor:
//!
//! ```notrust
//! +----------+------------+--------+
//! | Length:7 | Element:8  | Type:1 |
//! +----------+------------+--------+
//! ```

use crate::time::Duration;
use crate::{Error, Result};

/// A reader/writer for an IEEE 802.15.4 Header Information Element.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct HeaderInformationElement<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> HeaderInformationElement<T> {
    /// The length of the Header IE descriptor in octets.
    pub const HEADER_LEN: usize = 2;

    /// Create a new [`HeaderInformationElement`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot contain the descriptor and the
    /// declared content.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    fn check_len(&self) -> bool {
        let data = self.data.as_ref();

        if data.len() < Self::HEADER_LEN {
            return false;
        }

        data.len() >= Self::HEADER_LEN + self.len()
    }

    /// Create a new [`HeaderInformationElement`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    fn raw(&self) -> u16 {
        let b = &self.data.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Returns `true` when the content length is 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the content length field value.
    pub fn len(&self) -> usize {
        (self.raw() & 0x7f) as usize
    }

    /// Return the [`HeaderElementId`].
    pub fn element_id(&self) -> HeaderElementId {
        HeaderElementId::from(((self.raw() >> 7) & 0xff) as u8)
    }

    /// Return the content of this Header Information Element.
    pub fn content(&self) -> &[u8] {
        &self.data.as_ref()[2..][..self.len()]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> HeaderInformationElement<T> {
    /// Zero the descriptor.
    pub fn clear(&mut self) {
        self.data.as_mut()[..2].fill(0);
    }

    /// Set the content length field.
    pub fn set_length(&mut self, len: u16) {
        let b = &mut self.data.as_mut()[..2];
        let value = (u16::from_le_bytes([b[0], b[1]]) & !0x7f) | (len & 0x7f);
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Set the element ID field.
    pub fn set_element_id(&mut self, id: HeaderElementId) {
        const MASK: u16 = 0xff << 7;

        let b = &mut self.data.as_mut()[..2];
        let value = (u16::from_le_bytes([b[0], b[1]]) & !MASK) | (((id as u16) << 7) & MASK);
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Return the mutable content of this Header Information Element.
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[2..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for HeaderInformationElement<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let id = self.element_id();
        match id {
            HeaderElementId::HeaderTermination1 | HeaderElementId::HeaderTermination2 => {
                write!(f, "{:?}", id)
            }
            HeaderElementId::TimeCorrection => {
                let Ok(tc) = TimeCorrection::new(self.content()) else {
                    return write!(f, "{:?}({:0x?})", id, self.content());
                };
                write!(f, "{:?} {}", id, tc)
            }
            HeaderElementId::Csl => {
                let Ok(csl) = Csl::new(self.content()) else {
                    return write!(f, "{:?}({:0x?})", id, self.content());
                };
                write!(f, "{:?} {}", id, csl)
            }
            id => write!(f, "{:?}({:0x?})", id, self.content()),
        }
    }
}

/// Header Information Element ID, see section 7.4.2.1, table 7-7.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum HeaderElementId {
    /// Vendor specific header.
    VendorSpecific = 0x00,
    /// CSL IE.
    Csl = 0x1a,
    /// RIT IE.
    Rit = 0x1b,
    /// DSME PAN descriptor IE.
    DsmePanDescriptor = 0x1c,
    /// Rendezvous Time IE.
    RendezvousTime = 0x1d,
    /// Time Correction IE.
    TimeCorrection = 0x1e,
    /// Header Termination 1 (payload IEs follow).
    HeaderTermination1 = 0x7e,
    /// Header Termination 2 (plain payload follows).
    HeaderTermination2 = 0x7f,
    /// Unknown element ID.
    Unknown,
}

impl From<u8> for HeaderElementId {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::VendorSpecific,
            0x1a => Self::Csl,
            0x1b => Self::Rit,
            0x1c => Self::DsmePanDescriptor,
            0x1d => Self::RendezvousTime,
            0x1e => Self::TimeCorrection,
            0x7e => Self::HeaderTermination1,
            0x7f => Self::HeaderTermination2,
            _ => Self::Unknown,
        }
    }
}

/// An [`Iterator`] over [`HeaderInformationElement`].
///
/// Unknown element IDs are skipped; a Header Termination 1 or 2 element
/// terminates the walk.
#[derive(Debug)]
pub struct HeaderInformationElementsIterator<'f> {
    pub(crate) data: &'f [u8],
    pub(crate) offset: usize,
    pub(crate) terminated: bool,
}

impl HeaderInformationElementsIterator<'_> {
    /// Returns the offset behind the last visited Header IE.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'f> Iterator for HeaderInformationElementsIterator<'f> {
    type Item = HeaderInformationElement<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let ie = HeaderInformationElement::new(&self.data[self.offset..]).ok()?;

        self.terminated = matches!(
            ie.element_id(),
            HeaderElementId::HeaderTermination1 | HeaderElementId::HeaderTermination2
        );

        self.offset += ie.len() + HeaderInformationElement::<&[u8]>::HEADER_LEN;

        if self.offset >= self.data.len() {
            self.terminated = true;
        }

        Some(ie)
    }
}

/// A reader/writer for the CSL Header Information Element, see section
/// 7.4.2.3.
///
/// The reduced form carries phase and period; the full form additionally
/// carries a rendezvous time. The two are distinguished by content length.
pub struct Csl<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Csl<T> {
    /// Content length of the reduced form.
    pub const REDUCED_LEN: usize = 4;
    /// Content length of the full form.
    pub const FULL_LEN: usize = 6;

    /// Create a new [`Csl`] reader/writer from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        let ie = Self::new_unchecked(buffer);

        match ie.buffer.as_ref().len() {
            Self::REDUCED_LEN | Self::FULL_LEN => Ok(ie),
            _ => Err(Error),
        }
    }

    /// Create a new [`Csl`] reader/writer without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the CSL phase field value.
    pub fn csl_phase(&self) -> u16 {
        let b = &self.buffer.as_ref()[0..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the CSL period field value.
    pub fn csl_period(&self) -> u16 {
        let b = &self.buffer.as_ref()[2..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the rendezvous time field value of the full form.
    pub fn rendezvous_time(&self) -> Option<u16> {
        if self.buffer.as_ref().len() < Self::FULL_LEN {
            return None;
        }

        let b = &self.buffer.as_ref()[4..][..2];
        Some(u16::from_le_bytes([b[0], b[1]]))
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for Csl<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "phase: {}, period: {}", self.csl_phase(), self.csl_period())?;
        if let Some(rt) = self.rendezvous_time() {
            write!(f, ", rendezvous time: {}", rt)?;
        }
        Ok(())
    }
}

/// A reader/writer for the RIT Header Information Element, see section
/// 7.4.2.4.
pub struct Rit<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Rit<T> {
    /// Content length of the RIT IE.
    pub const LEN: usize = 4;

    /// Create a new [`Rit`] reader/writer from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        if buffer.as_ref().len() != Self::LEN {
            return Err(Error);
        }

        Ok(Self { buffer })
    }

    /// Return the time to first listen field value.
    pub fn time_to_first_listen(&self) -> u8 {
        self.buffer.as_ref()[0]
    }

    /// Return the number of repeat listen field value.
    pub fn number_of_repeat_listen(&self) -> u8 {
        self.buffer.as_ref()[1]
    }

    /// Return the repeat listen interval field value.
    pub fn repeat_listen_interval(&self) -> u16 {
        let b = &self.buffer.as_ref()[2..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }
}

/// A reader/writer for the Rendezvous Time Header Information Element, see
/// section 7.4.2.6.
pub struct RendezvousTime<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> RendezvousTime<T> {
    /// Content length of the Rendezvous Time IE.
    pub const LEN: usize = 4;

    /// Create a new [`RendezvousTime`] reader/writer from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        if buffer.as_ref().len() != Self::LEN {
            return Err(Error);
        }

        Ok(Self { buffer })
    }

    /// Return the rendezvous time field value.
    pub fn rendezvous_time(&self) -> u16 {
        let b = &self.buffer.as_ref()[0..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the wake-up interval field value.
    pub fn wake_up_interval(&self) -> u16 {
        let b = &self.buffer.as_ref()[2..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }
}

/// A reader/writer for the Time Correction Header Information Element, see
/// section 7.4.2.7.
///
/// The content is a single 16-bit time synchronization information field:
/// a signed 12-bit microsecond correction and a NACK flag in the topmost
/// bit.
pub struct TimeCorrection<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> TimeCorrection<T> {
    /// Content length of the Time Correction IE.
    pub const LEN: usize = 2;

    /// The NACK flag within the time synchronization information.
    const NACK: u16 = 0x8000;
    /// The value bits of the time synchronization information.
    const MASK: u16 = 0x0fff;

    /// Create a new [`TimeCorrection`] reader/writer from a given buffer.
    pub fn new(buffer: T) -> Result<Self> {
        let ie = Self::new_unchecked(buffer);

        if ie.buffer.as_ref().len() < Self::LEN {
            return Err(Error);
        }

        Ok(ie)
    }

    /// Create a new [`TimeCorrection`] reader/writer without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the length of the Time Correction IE content.
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        Self::LEN
    }

    fn time_sync_info(&self) -> u16 {
        let b = &self.buffer.as_ref()[0..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the time correction value.
    pub fn time_correction(&self) -> Duration {
        // Sign-extend the 12-bit field.
        let value = ((self.time_sync_info() & Self::MASK) << 4) as i16 >> 4;
        Duration::from_us(value as i64)
    }

    /// Returns `true` when the frame is not acknowledged.
    pub fn nack(&self) -> bool {
        self.time_sync_info() & Self::NACK != 0
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TimeCorrection<T> {
    /// Set the time correction value.
    pub fn set_time_correction(&mut self, time_correction: Duration) {
        let value = (time_correction.as_us() as i16 as u16) & Self::MASK;
        let b = &mut self.buffer.as_mut()[0..][..2];
        let raw = (u16::from_le_bytes([b[0], b[1]]) & !Self::MASK) | value;
        b.copy_from_slice(&raw.to_le_bytes());
    }

    /// Set the NACK flag.
    pub fn set_nack(&mut self, nack: bool) {
        let b = &mut self.buffer.as_mut()[0..][..2];
        let mut raw = u16::from_le_bytes([b[0], b[1]]);
        if nack {
            raw |= Self::NACK;
        } else {
            raw &= !Self::NACK;
        }
        b.copy_from_slice(&raw.to_le_bytes());
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for TimeCorrection<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, nack: {}", self.time_correction(), self.nack() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_ie_descriptor() {
        // Time Correction IE: length 2, element id 0x1e, type header.
        let data = [0x02, 0x0f, 0x01, 0x00];
        let ie = HeaderInformationElement::new(&data[..]).unwrap();
        assert_eq!(ie.len(), 2);
        assert_eq!(ie.element_id(), HeaderElementId::TimeCorrection);
        assert_eq!(ie.content(), &[0x01, 0x00]);
    }

    #[test]
    fn header_ie_roundtrip() {
        let mut data = [0u8; 4];
        let mut ie = HeaderInformationElement::new_unchecked(&mut data[..]);
        ie.clear();
        ie.set_length(2);
        ie.set_element_id(HeaderElementId::TimeCorrection);

        let ie = HeaderInformationElement::new(&data[..]).unwrap();
        assert_eq!(ie.len(), 2);
        assert_eq!(ie.element_id(), HeaderElementId::TimeCorrection);
    }

    #[test]
    fn time_correction_positive() {
        let mut data = [0u8; 2];
        let mut tc = TimeCorrection::new_unchecked(&mut data[..]);
        tc.set_time_correction(Duration::from_us(1));
        tc.set_nack(false);
        assert_eq!(data, [0x01, 0x00]);

        let tc = TimeCorrection::new(&data[..]).unwrap();
        assert_eq!(tc.time_correction(), Duration::from_us(1));
        assert!(!tc.nack());
    }

    #[test]
    fn time_correction_negative() {
        let mut data = [0u8; 2];
        let mut tc = TimeCorrection::new_unchecked(&mut data[..]);
        tc.set_time_correction(Duration::from_us(-600));
        tc.set_nack(true);

        let tc = TimeCorrection::new(&data[..]).unwrap();
        assert_eq!(tc.time_correction(), Duration::from_us(-600));
        assert!(tc.nack());
    }

    #[test]
    fn csl_forms() {
        let reduced = [0x10, 0x00, 0x20, 0x00];
        let csl = Csl::new(&reduced[..]).unwrap();
        assert_eq!(csl.csl_phase(), 0x10);
        assert_eq!(csl.csl_period(), 0x20);
        assert_eq!(csl.rendezvous_time(), None);

        let full = [0x10, 0x00, 0x20, 0x00, 0x30, 0x00];
        let csl = Csl::new(&full[..]).unwrap();
        assert_eq!(csl.rendezvous_time(), Some(0x30));

        assert!(Csl::new(&[0x00; 5][..]).is_err());
    }
}
