//! Nested (MLME) Information Element readers and writers.
//!
//! Nested IEs come in two flavors, distinguished by the type bit:
//!
//! ## Short format
//! ```notrust
//! +----------+----------+--------+---------------------------+
//! | Length:8 | Sub-ID:7 | Type=0 | Content (0-255 octets)... |
//! +----------+----------+--------+---------------------------+
//! ```
//!
//! ## Long format
//! ```notrust
//! +-----------+----------+--------+----------------------------+
//! | Length:11 | Sub-ID:4 | Type=1 | Content (0-2046 octets)... |
//! +-----------+----------+--------+----------------------------+
//! ```

use bitflags::bitflags;

use crate::time::Duration;
use crate::{Error, Result};

/// A reader/writer for an IEEE 802.15.4 Nested Information Element.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct NestedInformationElement<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> NestedInformationElement<T> {
    /// The length of the Nested IE descriptor in octets.
    pub const HEADER_LEN: usize = 2;

    /// Create a new [`NestedInformationElement`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot contain the descriptor and the
    /// declared content.
    pub fn new(data: T) -> Result<Self> {
        let nested = Self::new_unchecked(data);

        if !nested.check_len() {
            return Err(Error);
        }

        Ok(nested)
    }

    fn check_len(&self) -> bool {
        if self.data.as_ref().len() < Self::HEADER_LEN {
            return false;
        }

        self.data.as_ref().len() >= Self::HEADER_LEN + self.length()
    }

    /// Create a new [`NestedInformationElement`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    fn raw(&self) -> u16 {
        let b = &self.data.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the content length of the Nested Information Element.
    pub fn length(&self) -> usize {
        if self.is_long() {
            (self.raw() & 0x7ff) as usize
        } else {
            (self.raw() & 0xff) as usize
        }
    }

    /// Return the [`NestedSubId`].
    pub fn sub_id(&self) -> NestedSubId {
        let raw = self.raw();
        if self.is_long() {
            NestedSubId::Long(NestedSubIdLong::from(((raw >> 11) & 0b1111) as u8))
        } else {
            NestedSubId::Short(NestedSubIdShort::from(((raw >> 8) & 0x7f) as u8))
        }
    }

    /// Returns `true` when the Nested Information Element is a short type.
    pub fn is_short(&self) -> bool {
        !self.is_long()
    }

    /// Returns `true` when the Nested Information Element is a long type.
    pub fn is_long(&self) -> bool {
        self.raw() >> 15 == 0b1
    }

    /// Return the content of this Nested Information Element.
    pub fn content(&self) -> &[u8] {
        &self.data.as_ref()[2..][..self.length()]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> NestedInformationElement<T> {
    /// Zero the descriptor.
    pub fn clear(&mut self) {
        self.data.as_mut()[..2].fill(0);
    }

    /// Set the content length of the Nested Information Element.
    pub fn set_length(&mut self, len: u16, id: NestedSubId) {
        let mask: u16 = if id.is_short() { 0xff } else { 0x7ff };

        let b = &mut self.data.as_mut()[..2];
        let value = (u16::from_le_bytes([b[0], b[1]]) & !mask) | (len & mask);
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Set the [`NestedSubId`] and the matching type bit.
    pub fn set_sub_id(&mut self, id: NestedSubId) {
        let mask: u16 = if id.is_short() {
            0x7f << 8 | 0x8000
        } else {
            0b1111 << 11 | 0x8000
        };

        let b = &mut self.data.as_mut()[..2];
        let value = u16::from_le_bytes([b[0], b[1]]) & !mask;
        let value = value
            | match id {
                NestedSubId::Short(id) => (id as u16) << 8,
                NestedSubId::Long(id) => ((id as u16) << 11) | 0x8000,
            };
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Return the mutable content of this Nested Information Element.
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[2..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for NestedInformationElement<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.sub_id() {
            NestedSubId::Short(NestedSubIdShort::TschSynchronization) => {
                match TschSynchronization::new(self.content()) {
                    Ok(sync) => write!(f, "TSCH Synchronization {}", sync),
                    Err(_) => write!(f, "TSCH Synchronization (malformed)"),
                }
            }
            NestedSubId::Short(NestedSubIdShort::TschTimeslot) => {
                match TschTimeslot::new(self.content()) {
                    Ok(ts) => write!(f, "TSCH Timeslot {}", ts),
                    Err(_) => write!(f, "TSCH Timeslot (malformed)"),
                }
            }
            NestedSubId::Short(NestedSubIdShort::TschSlotframeAndLink) => {
                match TschSlotframeAndLink::new(self.content()) {
                    Ok(sf) => write!(f, "TSCH Slotframe and Link {}", sf),
                    Err(_) => write!(f, "TSCH Slotframe and Link (malformed)"),
                }
            }
            NestedSubId::Long(NestedSubIdLong::ChannelHopping) => {
                match ChannelHopping::new(self.content()) {
                    Ok(ch) => write!(f, "Channel Hopping {}", ch),
                    Err(_) => write!(f, "Channel Hopping (malformed)"),
                }
            }
            id => write!(f, "{:?}({:0x?})", id, self.content()),
        }
    }
}

/// Nested Information Element sub-ID.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubId {
    /// Short sub-ID.
    Short(NestedSubIdShort),
    /// Long sub-ID.
    Long(NestedSubIdLong),
}

impl NestedSubId {
    /// Create a short [`NestedSubId`] from a `u8`.
    pub fn from_short(value: u8) -> Self {
        Self::Short(NestedSubIdShort::from(value))
    }

    /// Create a long [`NestedSubId`] from a `u8`.
    pub fn from_long(value: u8) -> Self {
        Self::Long(NestedSubIdLong::from(value))
    }

    /// Returns `true` when this is a short sub-ID.
    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short(_))
    }

    /// Returns `true` when this is a long sub-ID.
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long(_))
    }
}

/// Short Nested Information Element sub-ID, see section 7.4.4.1, table 7-17.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubIdShort {
    /// TSCH Synchronization IE.
    TschSynchronization = 0x1a,
    /// TSCH Slotframe and Link IE.
    TschSlotframeAndLink = 0x1b,
    /// TSCH Timeslot IE.
    TschTimeslot = 0x1c,
    /// Unknown sub-ID.
    Unknown,
}

impl From<u8> for NestedSubIdShort {
    fn from(value: u8) -> Self {
        match value {
            0x1a => Self::TschSynchronization,
            0x1b => Self::TschSlotframeAndLink,
            0x1c => Self::TschTimeslot,
            _ => Self::Unknown,
        }
    }
}

/// Long Nested Information Element sub-ID, see section 7.4.4.1, table 7-17.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubIdLong {
    /// Vendor Specific Nested IE.
    VendorSpecificNested = 0x08,
    /// Channel Hopping IE.
    ChannelHopping = 0x09,
    /// Unknown sub-ID.
    Unknown,
}

impl From<u8> for NestedSubIdLong {
    fn from(value: u8) -> Self {
        match value {
            0x08 => Self::VendorSpecificNested,
            0x09 => Self::ChannelHopping,
            _ => Self::Unknown,
        }
    }
}

/// An [`Iterator`] over [`NestedInformationElement`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct NestedInformationElementsIterator<'f> {
    data: &'f [u8],
    offset: usize,
    terminated: bool,
}

impl<'f> NestedInformationElementsIterator<'f> {
    /// Create a new [`NestedInformationElementsIterator`].
    pub fn new(data: &'f [u8]) -> Self {
        Self {
            data,
            offset: 0,
            terminated: data.is_empty(),
        }
    }
}

impl<'f> Iterator for NestedInformationElementsIterator<'f> {
    type Item = NestedInformationElement<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let Ok(nested) = NestedInformationElement::new(&self.data[self.offset..]) else {
            self.terminated = true;
            return None;
        };

        let len = nested.length() + NestedInformationElement::<&[u8]>::HEADER_LEN;
        let nested = NestedInformationElement::new_unchecked(&self.data[self.offset..][..len]);

        self.offset += len;

        if self.offset >= self.data.len() {
            self.terminated = true;
        }

        Some(nested)
    }
}

/// A reader/writer for the TSCH Synchronization IE, see section 7.4.4.2.
///
/// ```notrust
/// +-------+-------------+
/// | ASN:5 | Join metric |
/// +-------+-------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschSynchronization<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> TschSynchronization<T> {
    /// Content length of the TSCH Synchronization IE.
    pub const LEN: usize = 6;

    /// Create a new [`TschSynchronization`] reader/writer from a given buffer.
    pub fn new(data: T) -> Result<Self> {
        if data.as_ref().len() < Self::LEN {
            return Err(Error);
        }

        Ok(Self::new_unchecked(data))
    }

    /// Create a new [`TschSynchronization`] reader/writer without length
    /// checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the absolute slot number field (40 bit).
    pub fn absolute_slot_number(&self) -> u64 {
        let data = self.data.as_ref();
        let mut asn = 0u64;
        for (i, b) in data[..5].iter().enumerate() {
            asn |= (*b as u64) << (8 * i);
        }
        asn
    }

    /// Return the join metric field.
    pub fn join_metric(&self) -> u8 {
        self.data.as_ref()[5]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TschSynchronization<T> {
    /// Set the absolute slot number field.
    pub fn set_absolute_slot_number(&mut self, asn: u64) {
        let data = self.data.as_mut();
        for i in 0..5 {
            data[i] = (asn >> (8 * i)) as u8;
        }
    }

    /// Set the join metric field.
    pub fn set_join_metric(&mut self, join_metric: u8) {
        self.data.as_mut()[5] = join_metric;
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for TschSynchronization<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ASN: {}, join metric: {}",
            self.absolute_slot_number(),
            self.join_metric()
        )
    }
}

/// TSCH timeslot timings, see section 8.4.3.3.4, table 8-99.
///
/// All values are in microseconds. `max_tx` and `timeslot_length` may
/// exceed 16 bits (sub-GHz PHYs), in which case the full Timeslot IE uses
/// the 27-octet encoding with 3-octet trailing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschTimeslotTimings {
    /// Timeslot template ID.
    pub id: u8,
    /// Start of the timeslot to the start of CCA.
    pub cca_offset: Duration,
    /// Duration of the CCA.
    pub cca: Duration,
    /// Start of the timeslot to the start of frame transmission.
    pub tx_offset: Duration,
    /// Start of the timeslot to when the receiver shall be listening.
    pub rx_offset: Duration,
    /// End of frame to when the transmitter listens for an acknowledgment.
    pub rx_ack_delay: Duration,
    /// End of frame to the start of the acknowledgment.
    pub tx_ack_delay: Duration,
    /// Time to wait for the start of a frame.
    pub rx_wait: Duration,
    /// Minimum time to wait for the start of an acknowledgment.
    pub ack_wait: Duration,
    /// Transmit-to-receive turnaround.
    pub rx_tx: Duration,
    /// Transmission time of the longest acknowledgment.
    pub max_ack: Duration,
    /// Transmission time of the longest frame.
    pub max_tx: Duration,
    /// Total timeslot length.
    pub timeslot_length: Duration,
}

impl TschTimeslotTimings {
    /// Default timings for channel page zero, 2.4 GHz band.
    pub const DEFAULT_2450_MHZ: Self = Self {
        id: 0,
        cca_offset: Duration::from_us(1800),
        cca: Duration::from_us(128),
        tx_offset: Duration::from_us(2120),
        rx_offset: Duration::from_us(1020),
        rx_ack_delay: Duration::from_us(800),
        tx_ack_delay: Duration::from_us(1000),
        rx_wait: Duration::from_us(2200),
        ack_wait: Duration::from_us(400),
        rx_tx: Duration::from_us(192),
        max_ack: Duration::from_us(2400),
        max_tx: Duration::from_us(4256),
        timeslot_length: Duration::from_us(10000),
    };

    /// Default timings for the sub-GHz bands.
    pub const DEFAULT_SUB_GHZ: Self = Self {
        id: 0,
        cca_offset: Duration::from_us(1800),
        cca: Duration::from_us(128),
        tx_offset: Duration::from_us(2800),
        rx_offset: Duration::from_us(1800),
        rx_ack_delay: Duration::from_us(800),
        tx_ack_delay: Duration::from_us(1000),
        rx_wait: Duration::from_us(6000),
        ack_wait: Duration::from_us(400),
        rx_tx: Duration::from_us(1000),
        max_ack: Duration::from_us(6000),
        max_tx: Duration::from_us(103040),
        timeslot_length: Duration::from_us(120000),
    };

    /// Whether the trailing fields fit the 25-octet (2-octet field) form.
    pub fn fits_short_encoding(&self) -> bool {
        self.max_tx.as_us() <= u16::MAX as i64 && self.timeslot_length.as_us() <= u16::MAX as i64
    }

    /// The length of the full Timeslot IE content for these timings.
    pub fn ie_len(&self) -> usize {
        if self.fits_short_encoding() {
            TschTimeslot::<&[u8]>::FULL_LEN
        } else {
            TschTimeslot::<&[u8]>::FULL_LEN_EXTENDED
        }
    }
}

/// A reader/writer for the TSCH Timeslot IE, see section 7.4.4.4.
///
/// The shortened form carries only the timeslot template ID; the full form
/// carries all timing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschTimeslot<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> TschTimeslot<T> {
    /// Content length of the shortened form.
    pub const SHORT_LEN: usize = 1;
    /// Content length of the full form with 2-octet trailing fields.
    pub const FULL_LEN: usize = 25;
    /// Content length of the full form with 3-octet trailing fields.
    pub const FULL_LEN_EXTENDED: usize = 27;

    /// Create a new [`TschTimeslot`] reader/writer from a given buffer.
    pub fn new(data: T) -> Result<Self> {
        match data.as_ref().len() {
            Self::SHORT_LEN | Self::FULL_LEN | Self::FULL_LEN_EXTENDED => {
                Ok(Self::new_unchecked(data))
            }
            _ => Err(Error),
        }
    }

    /// Create a new [`TschTimeslot`] reader/writer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the timeslot template ID field.
    pub fn id(&self) -> u8 {
        self.data.as_ref()[0]
    }

    /// Returns `true` when only the template ID is present.
    pub fn is_shortened(&self) -> bool {
        self.data.as_ref().len() == Self::SHORT_LEN
    }

    fn read_u16(&self, offset: usize) -> Duration {
        let b = &self.data.as_ref()[offset..][..2];
        Duration::from_us(u16::from_le_bytes([b[0], b[1]]) as i64)
    }

    fn read_trailing(&self, offset: usize) -> Duration {
        let data = self.data.as_ref();
        if data.len() == Self::FULL_LEN_EXTENDED {
            let b = &data[offset..][..3];
            Duration::from_us(u32::from_le_bytes([b[0], b[1], b[2], 0]) as i64)
        } else {
            self.read_u16(offset)
        }
    }

    /// Return the timeslot timings.
    ///
    /// The shortened form yields `None`; the template must be known from the
    /// template ID.
    pub fn timings(&self) -> Option<TschTimeslotTimings> {
        if self.is_shortened() {
            return None;
        }

        let field_len = if self.data.as_ref().len() == Self::FULL_LEN_EXTENDED {
            3
        } else {
            2
        };

        Some(TschTimeslotTimings {
            id: self.id(),
            cca_offset: self.read_u16(1),
            cca: self.read_u16(3),
            tx_offset: self.read_u16(5),
            rx_offset: self.read_u16(7),
            rx_ack_delay: self.read_u16(9),
            tx_ack_delay: self.read_u16(11),
            rx_wait: self.read_u16(13),
            ack_wait: self.read_u16(15),
            rx_tx: self.read_u16(17),
            max_ack: self.read_u16(19),
            max_tx: self.read_trailing(21),
            timeslot_length: self.read_trailing(21 + field_len),
        })
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TschTimeslot<T> {
    /// Set the timeslot template ID field (shortened form).
    pub fn set_id(&mut self, id: u8) {
        self.data.as_mut()[0] = id;
    }

    /// Write the full form from the given timings.
    ///
    /// The buffer must have been sized with [`TschTimeslotTimings::ie_len`].
    pub fn set_timings(&mut self, timings: &TschTimeslotTimings) {
        let extended = !timings.fits_short_encoding();
        let data = self.data.as_mut();

        data[0] = timings.id;
        for (offset, value) in [
            (1, timings.cca_offset),
            (3, timings.cca),
            (5, timings.tx_offset),
            (7, timings.rx_offset),
            (9, timings.rx_ack_delay),
            (11, timings.tx_ack_delay),
            (13, timings.rx_wait),
            (15, timings.ack_wait),
            (17, timings.rx_tx),
            (19, timings.max_ack),
        ] {
            data[offset..][..2].copy_from_slice(&(value.as_us() as u16).to_le_bytes());
        }

        if extended {
            data[21..][..3].copy_from_slice(&(timings.max_tx.as_us() as u32).to_le_bytes()[..3]);
            data[24..][..3]
                .copy_from_slice(&(timings.timeslot_length.as_us() as u32).to_le_bytes()[..3]);
        } else {
            data[21..][..2].copy_from_slice(&(timings.max_tx.as_us() as u16).to_le_bytes());
            data[23..][..2]
                .copy_from_slice(&(timings.timeslot_length.as_us() as u16).to_le_bytes());
        }
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for TschTimeslot<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "slot ID: {}", self.id())?;
        if let Some(timings) = self.timings() {
            write!(f, ", length: {}", timings.timeslot_length)?;
        }
        Ok(())
    }
}

bitflags! {
    /// TSCH link options bitfield of a Link Information field.
    ///
    /// ```notrust
    /// +----+----+--------+--------------+----------+----------+
    /// | Tx | Rx | Shared | Time keeping | Priority | Reserved |
    /// +----+----+--------+--------------+----------+----------+
    /// ```
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TschLinkOption: u8 {
        /// Transmit link.
        const Tx = 0b0000_0001;
        /// Receive link.
        const Rx = 0b0000_0010;
        /// Shared link.
        const Shared = 0b0000_0100;
        /// Timekeeping link.
        const TimeKeeping = 0b0000_1000;
        /// Priority link.
        const Priority = 0b0001_0000;
    }
}

/// A reader/writer for a Link Information field, see section 7.4.4.3.
///
/// ```notrust
/// +----------+----------------+--------------+
/// | Timeslot | Channel offset | Link options |
/// +----------+----------------+--------------+
/// 0          2                4
/// ```
pub struct LinkInformation<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> LinkInformation<T> {
    /// Create a new [`LinkInformation`] reader/writer from a given buffer.
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Return the length of a Link Information field in octets.
    pub const fn len() -> usize {
        5
    }

    /// Return the timeslot field.
    pub fn timeslot(&self) -> u16 {
        let b = &self.data.as_ref()[0..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the channel offset field.
    pub fn channel_offset(&self) -> u16 {
        let b = &self.data.as_ref()[2..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the link options field.
    pub fn link_options(&self) -> TschLinkOption {
        TschLinkOption::from_bits_truncate(self.data.as_ref()[4])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> LinkInformation<T> {
    /// Set the timeslot field.
    pub fn set_timeslot(&mut self, timeslot: u16) {
        self.data.as_mut()[0..][..2].copy_from_slice(&timeslot.to_le_bytes());
    }

    /// Set the channel offset field.
    pub fn set_channel_offset(&mut self, channel_offset: u16) {
        self.data.as_mut()[2..][..2].copy_from_slice(&channel_offset.to_le_bytes());
    }

    /// Set the link options field.
    pub fn set_link_options(&mut self, options: TschLinkOption) {
        self.data.as_mut()[4] = options.bits();
    }
}

/// An [`Iterator`] over [`LinkInformation`] fields.
pub struct LinkInformationIterator<'f> {
    data: &'f [u8],
    offset: usize,
}

impl<'f> LinkInformationIterator<'f> {
    /// Create a new [`LinkInformationIterator`].
    pub fn new(data: &'f [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'f> Iterator for LinkInformationIterator<'f> {
    type Item = LinkInformation<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + LinkInformation::<&[u8]>::len() > self.data.len() {
            return None;
        }

        let information = LinkInformation::new(&self.data[self.offset..]);
        self.offset += LinkInformation::<&[u8]>::len();

        Some(information)
    }
}

/// A reader/writer for a Slotframe Descriptor, see section 7.4.4.3.
///
/// ```notrust
/// +--------+------+-------+----------------------+
/// | Handle | Size | Links | Link information...  |
/// +--------+------+-------+----------------------+
/// 0        1      3       4
/// ```
pub struct SlotframeDescriptor<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> SlotframeDescriptor<T> {
    /// The length of the fixed part of a Slotframe Descriptor in octets.
    pub const HEADER_LEN: usize = 4;

    /// Create a new [`SlotframeDescriptor`] reader/writer from a given buffer.
    pub fn new(data: T) -> Result<Self> {
        let descriptor = Self::new_unchecked(data);

        if !descriptor.check_len() {
            return Err(Error);
        }

        Ok(descriptor)
    }

    fn check_len(&self) -> bool {
        let len = self.data.as_ref().len();

        if len < Self::HEADER_LEN {
            return false;
        }

        len >= self.len()
    }

    /// Create a new [`SlotframeDescriptor`] reader/writer without length
    /// checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the length of this Slotframe Descriptor in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        Self::HEADER_LEN + self.links() as usize * LinkInformation::<&[u8]>::len()
    }

    /// Return the slotframe handle field.
    pub fn handle(&self) -> u8 {
        self.data.as_ref()[0]
    }

    /// Return the slotframe size field (in timeslots).
    pub fn size(&self) -> u16 {
        let b = &self.data.as_ref()[1..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the number of links field.
    pub fn links(&self) -> u8 {
        self.data.as_ref()[3]
    }

    /// Return an [`Iterator`] over the link information fields.
    pub fn link_informations(&self) -> LinkInformationIterator {
        LinkInformationIterator::new(
            &self.data.as_ref()[4..][..self.links() as usize * LinkInformation::<&[u8]>::len()],
        )
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> SlotframeDescriptor<T> {
    /// Set the slotframe handle field.
    pub fn set_handle(&mut self, handle: u8) {
        self.data.as_mut()[0] = handle;
    }

    /// Set the slotframe size field.
    pub fn set_size(&mut self, size: u16) {
        self.data.as_mut()[1..][..2].copy_from_slice(&size.to_le_bytes());
    }

    /// Set the number of links field.
    pub fn set_links(&mut self, links: u8) {
        self.data.as_mut()[3] = links;
    }
}

/// An [`Iterator`] over [`SlotframeDescriptor`].
pub struct SlotframeDescriptorIterator<'f> {
    data: &'f [u8],
    offset: usize,
    slotframes: usize,
    slotframe_count: usize,
    terminated: bool,
}

impl<'f> SlotframeDescriptorIterator<'f> {
    /// Create a new [`SlotframeDescriptorIterator`].
    pub fn new(slotframes: usize, data: &'f [u8]) -> Self {
        Self {
            data,
            offset: 0,
            slotframes,
            slotframe_count: 0,
            terminated: slotframes == 0,
        }
    }
}

impl<'f> Iterator for SlotframeDescriptorIterator<'f> {
    type Item = SlotframeDescriptor<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let Ok(descriptor) = SlotframeDescriptor::new(&self.data[self.offset..]) else {
            self.terminated = true;
            return None;
        };

        self.slotframe_count += 1;
        self.offset += descriptor.len();

        if self.offset >= self.data.len() || self.slotframe_count >= self.slotframes {
            self.terminated = true;
        }

        Some(descriptor)
    }
}

/// A reader/writer for the TSCH Slotframe and Link IE, see section 7.4.4.3.
///
/// ```notrust
/// +----------------------+---------------------------+
/// | Number of slotframes | Slotframe descriptors...  |
/// +----------------------+---------------------------+
/// 0                      1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschSlotframeAndLink<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> TschSlotframeAndLink<T> {
    /// Create a new [`TschSlotframeAndLink`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptors do not exactly cover the IE
    /// content.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    fn check_len(&self) -> bool {
        let len = self.data.as_ref().len();

        if len < 1 {
            return false;
        }

        // Every declared descriptor must be complete and the content must not
        // carry trailing octets.
        let mut expected = 1;
        let mut count = 0;
        let mut iter = self.slotframe_descriptors();
        for descriptor in &mut iter {
            expected += descriptor.len();
            count += 1;
        }

        count == self.number_of_slotframes() as usize && expected == len
    }

    /// Create a new [`TschSlotframeAndLink`] reader/writer without length
    /// checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the number of slotframes field.
    pub fn number_of_slotframes(&self) -> u8 {
        self.data.as_ref()[0]
    }

    /// Return an [`Iterator`] over the [`SlotframeDescriptor`]s.
    pub fn slotframe_descriptors(&self) -> SlotframeDescriptorIterator {
        SlotframeDescriptorIterator::new(
            self.number_of_slotframes() as usize,
            &self.data.as_ref()[1..],
        )
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TschSlotframeAndLink<T> {
    /// Set the number of slotframes field.
    pub fn set_number_of_slotframes(&mut self, number_of_slotframes: u8) {
        self.data.as_mut()[0] = number_of_slotframes;
    }

    /// Return the mutable descriptor area.
    pub fn descriptors_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[1..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for TschSlotframeAndLink<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#slotframes: {}", self.number_of_slotframes())
    }
}

/// A reader/writer for the Channel Hopping IE, see section 7.4.4.31.
///
/// The shortened form carries only the hopping sequence ID. The full form
/// additionally carries the channel page, the number of channels, the PHY
/// configuration bitmap, the hopping sequence and the current hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHopping<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> ChannelHopping<T> {
    /// Content length of the shortened form.
    pub const SHORT_LEN: usize = 1;
    /// Content length of the full form, excluding the sequence and the
    /// current hop.
    pub const FULL_FIXED_LEN: usize = 10;

    /// Create a new [`ChannelHopping`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error when the length implied by the hopping sequence
    /// length does not exactly match the content length.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    fn check_len(&self) -> bool {
        let len = self.data.as_ref().len();

        if len == Self::SHORT_LEN {
            return true;
        }

        if len < Self::FULL_FIXED_LEN {
            return false;
        }

        // Sequence entries plus the trailing current hop word must exactly
        // fill the declared content.
        len == Self::FULL_FIXED_LEN + (self.hopping_sequence_length() as usize + 1) * 2
    }

    /// Create a new [`ChannelHopping`] reader/writer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Returns `true` when only the hopping sequence ID is present.
    pub fn is_shortened(&self) -> bool {
        self.data.as_ref().len() == Self::SHORT_LEN
    }

    /// Return the hopping sequence ID field.
    pub fn hopping_sequence_id(&self) -> u8 {
        self.data.as_ref()[0]
    }

    /// Return the channel page field of the full form.
    pub fn channel_page(&self) -> u8 {
        self.data.as_ref()[1]
    }

    /// Return the number of channels field of the full form.
    pub fn number_of_channels(&self) -> u16 {
        let b = &self.data.as_ref()[2..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the PHY configuration bitmap of the full form.
    pub fn phy_configuration(&self) -> u32 {
        let b = &self.data.as_ref()[4..][..4];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Return the hopping sequence length field of the full form.
    pub fn hopping_sequence_length(&self) -> u16 {
        let b = &self.data.as_ref()[8..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return an iterator over the hopping sequence channels.
    pub fn hopping_sequence(&self) -> impl Iterator<Item = u16> + '_ {
        let data = &self.data.as_ref()[Self::FULL_FIXED_LEN..];
        (0..self.hopping_sequence_length() as usize)
            .map(move |i| u16::from_le_bytes([data[2 * i], data[2 * i + 1]]))
    }

    /// Return the current hop field of the full form.
    pub fn current_hop(&self) -> u16 {
        let offset = Self::FULL_FIXED_LEN + self.hopping_sequence_length() as usize * 2;
        let b = &self.data.as_ref()[offset..][..2];
        u16::from_le_bytes([b[0], b[1]])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ChannelHopping<T> {
    /// Set the hopping sequence ID field.
    pub fn set_hopping_sequence_id(&mut self, id: u8) {
        self.data.as_mut()[0] = id;
    }

    /// Set the channel page field of the full form.
    pub fn set_channel_page(&mut self, page: u8) {
        self.data.as_mut()[1] = page;
    }

    /// Set the number of channels field of the full form.
    pub fn set_number_of_channels(&mut self, channels: u16) {
        self.data.as_mut()[2..][..2].copy_from_slice(&channels.to_le_bytes());
    }

    /// Set the PHY configuration bitmap of the full form.
    pub fn set_phy_configuration(&mut self, configuration: u32) {
        self.data.as_mut()[4..][..4].copy_from_slice(&configuration.to_le_bytes());
    }

    /// Set the hopping sequence of the full form, including its length field.
    pub fn set_hopping_sequence(&mut self, sequence: &[u16]) {
        self.data.as_mut()[8..][..2].copy_from_slice(&(sequence.len() as u16).to_le_bytes());
        for (i, channel) in sequence.iter().enumerate() {
            self.data.as_mut()[Self::FULL_FIXED_LEN + 2 * i..][..2]
                .copy_from_slice(&channel.to_le_bytes());
        }
    }

    /// Set the current hop field of the full form.
    ///
    /// Must be called after [`Self::set_hopping_sequence`].
    pub fn set_current_hop(&mut self, current_hop: u16) {
        let offset = Self::FULL_FIXED_LEN + self.hopping_sequence_length() as usize * 2;
        self.data.as_mut()[offset..][..2].copy_from_slice(&current_hop.to_le_bytes());
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for ChannelHopping<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sequence ID: {}", self.hopping_sequence_id())?;
        if !self.is_shortened() {
            write!(
                f,
                ", page: {}, sequence length: {}",
                self.channel_page(),
                self.hopping_sequence_length()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_descriptor_short() {
        let mut data = [0u8; 8];
        let mut nested = NestedInformationElement::new_unchecked(&mut data[..]);
        nested.clear();
        let id = NestedSubId::Short(NestedSubIdShort::TschSynchronization);
        nested.set_length(6, id);
        nested.set_sub_id(id);

        let nested = NestedInformationElement::new(&data[..]).unwrap();
        assert!(nested.is_short());
        assert_eq!(nested.length(), 6);
        assert_eq!(
            nested.sub_id(),
            NestedSubId::Short(NestedSubIdShort::TschSynchronization)
        );
    }

    #[test]
    fn nested_descriptor_long() {
        let mut data = [0u8; 14];
        let mut nested = NestedInformationElement::new_unchecked(&mut data[..]);
        nested.clear();
        let id = NestedSubId::Long(NestedSubIdLong::ChannelHopping);
        nested.set_length(12, id);
        nested.set_sub_id(id);

        let nested = NestedInformationElement::new(&data[..]).unwrap();
        assert!(nested.is_long());
        assert_eq!(nested.length(), 12);
        assert_eq!(
            nested.sub_id(),
            NestedSubId::Long(NestedSubIdLong::ChannelHopping)
        );
    }

    #[test]
    fn tsch_synchronization_asn() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x09];
        let sync = TschSynchronization::new(&data[..]).unwrap();
        assert_eq!(sync.absolute_slot_number(), 0x0504030201);
        assert_eq!(sync.join_metric(), 9);

        let mut out = [0u8; 6];
        let mut w = TschSynchronization::new_unchecked(&mut out[..]);
        w.set_absolute_slot_number(0x0504030201);
        w.set_join_metric(9);
        assert_eq!(out, data);
    }

    #[test]
    fn timeslot_full_roundtrip() {
        let timings = TschTimeslotTimings::DEFAULT_2450_MHZ;
        assert!(timings.fits_short_encoding());

        let mut data = [0u8; TschTimeslot::<&[u8]>::FULL_LEN];
        TschTimeslot::new_unchecked(&mut data[..]).set_timings(&timings);

        let ts = TschTimeslot::new(&data[..]).unwrap();
        assert_eq!(ts.timings().unwrap(), timings);
    }

    #[test]
    fn timeslot_extended_roundtrip() {
        let timings = TschTimeslotTimings::DEFAULT_SUB_GHZ;
        assert!(!timings.fits_short_encoding());
        assert_eq!(timings.ie_len(), TschTimeslot::<&[u8]>::FULL_LEN_EXTENDED);

        let mut data = [0u8; TschTimeslot::<&[u8]>::FULL_LEN_EXTENDED];
        TschTimeslot::new_unchecked(&mut data[..]).set_timings(&timings);

        let ts = TschTimeslot::new(&data[..]).unwrap();
        assert_eq!(ts.timings().unwrap(), timings);
    }

    #[test]
    fn timeslot_rejects_odd_lengths() {
        assert!(TschTimeslot::new(&[0u8; 2][..]).is_err());
        assert!(TschTimeslot::new(&[0u8; 26][..]).is_err());
    }

    #[test]
    fn channel_hopping_full_roundtrip() {
        let sequence = [20u16, 25, 26, 15];
        let len = ChannelHopping::<&[u8]>::FULL_FIXED_LEN + (sequence.len() + 1) * 2;
        let mut data = [0u8; 20];
        {
            let mut ch = ChannelHopping::new_unchecked(&mut data[..len]);
            ch.set_hopping_sequence_id(0);
            ch.set_channel_page(0);
            ch.set_number_of_channels(16);
            ch.set_phy_configuration(0b1111 << 15);
            ch.set_hopping_sequence(&sequence);
            ch.set_current_hop(2);
        }

        let ch = ChannelHopping::new(&data[..len]).unwrap();
        assert!(!ch.is_shortened());
        assert_eq!(ch.number_of_channels(), 16);
        assert_eq!(ch.hopping_sequence_length(), 4);
        let parsed: heapless::Vec<u16, 8> = ch.hopping_sequence().collect();
        assert_eq!(&parsed[..], &sequence[..]);
        assert_eq!(ch.current_hop(), 2);
    }

    #[test]
    fn channel_hopping_length_mismatch() {
        // Declares 4 sequence entries, but the content only holds 3 plus the
        // current hop.
        let mut data = [0u8; 18];
        data[8] = 4;
        assert!(ChannelHopping::new(&data[..]).is_err());

        // Shortened form is always fine.
        assert!(ChannelHopping::new(&data[..1]).is_ok());
    }

    #[test]
    fn slotframe_and_link_walk() {
        // One slotframe: handle 0, size 13, one link at timeslot 5.
        let data = [
            0x01, // number of slotframes
            0x00, 0x0d, 0x00, 0x01, // handle, size, #links
            0x05, 0x00, 0x02, 0x00, 0x03, // timeslot, channel offset, options
        ];
        let ie = TschSlotframeAndLink::new(&data[..]).unwrap();
        assert_eq!(ie.number_of_slotframes(), 1);

        let descriptor = ie.slotframe_descriptors().next().unwrap();
        assert_eq!(descriptor.handle(), 0);
        assert_eq!(descriptor.size(), 13);
        assert_eq!(descriptor.links(), 1);

        let link = descriptor.link_informations().next().unwrap();
        assert_eq!(link.timeslot(), 5);
        assert_eq!(link.channel_offset(), 2);
        assert_eq!(
            link.link_options(),
            TschLinkOption::Tx | TschLinkOption::Rx
        );
    }

    #[test]
    fn slotframe_and_link_rejects_truncated_descriptor() {
        // Declares one slotframe with two links but only one link present.
        let data = [0x01, 0x00, 0x0d, 0x00, 0x02, 0x05, 0x00, 0x02, 0x00, 0x03];
        assert!(TschSlotframeAndLink::new(&data[..]).is_err());
    }
}
