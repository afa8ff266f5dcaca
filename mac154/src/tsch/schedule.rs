//! TSCH slotframes, links and the link selector.
//!
//! Slotframes are kept sorted by handle and their link tables sorted by
//! (timeslot, handle), so that selecting the next active link is a
//! single ordered walk per slotframe.

use heapless::Vec;
use mac154_frame::{Address, TschLinkOption};

use super::neighbor::NeighborTable;
use crate::{Error, Result};

/// The maximum number of slotframes an interface can install.
pub const MAX_SLOTFRAMES: usize = 4;
/// The maximum number of links per slotframe.
pub const MAX_LINKS_PER_SLOTFRAME: usize = 8;
/// The maximum length of a channel hopping sequence.
pub const MAX_HOPPING_SEQUENCE_LEN: usize = 16;

/// The absolute slot number, a 40-bit monotonic counter shared across a
/// TSCH PAN, see section 8.4.3.3.1, table 8-96.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Asn(u64);

impl Asn {
    /// The largest representable ASN (macAsn is 40 bit wide).
    pub const MAX: u64 = (1 << 40) - 1;

    /// Create an ASN, wrapping modulo 2^40.
    pub const fn new(value: u64) -> Self {
        Self(value & Self::MAX)
    }

    /// The ASN value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Advance by the given number of timeslots, wrapping modulo 2^40.
    pub fn advance(&mut self, timeslots: u64) {
        self.0 = (self.0 + timeslots) & Self::MAX;
    }
}

/// A channel hopping sequence, see section 8.4.3.4, table 8-100.
///
/// The sequence must only contain channels valid on the current channel
/// page; macHoppingSequenceId is assumed to be 0.
#[derive(Debug, Clone, Default)]
pub struct HoppingSequence {
    channels: Vec<u16, MAX_HOPPING_SEQUENCE_LEN>,
}

impl HoppingSequence {
    /// The default 2.4 GHz sequence over 16 channels, length 16.
    pub const SEQUENCE_2_4_GHZ_16_16: [u16; 16] =
        [16, 17, 23, 18, 26, 15, 25, 22, 19, 11, 12, 13, 24, 14, 20, 21];
    /// The default 2.4 GHz sequence over 4 channels, length 16.
    pub const SEQUENCE_2_4_GHZ_4_16: [u16; 16] =
        [20, 26, 25, 26, 15, 15, 25, 20, 26, 15, 26, 25, 20, 15, 20, 25];
    /// The default 2.4 GHz sequence over 4 channels, length 4.
    pub const SEQUENCE_2_4_GHZ_4_4: [u16; 4] = [15, 25, 26, 20];
    /// The default 2.4 GHz sequence over 2 channels, length 2.
    pub const SEQUENCE_2_4_GHZ_2_2: [u16; 2] = [20, 25];
    /// The default single-channel 2.4 GHz sequence.
    pub const SEQUENCE_2_4_GHZ_1_1: [u16; 1] = [20];
    /// The default sub-GHz sequence over 10 channels, length 10.
    pub const SEQUENCE_SUB_GHZ_10_10: [u16; 10] = [6, 2, 9, 3, 7, 4, 10, 8, 5, 1];

    /// Create a hopping sequence from a channel list.
    pub fn new(channels: &[u16]) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::Invalid);
        }

        let mut sequence = Vec::new();
        sequence
            .extend_from_slice(channels)
            .map_err(|_| Error::NoMemory)?;

        Ok(Self { channels: sequence })
    }

    /// The length of the sequence.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Iterate over the channels of the sequence.
    pub fn channels(&self) -> impl Iterator<Item = u16> + '_ {
        self.channels.iter().copied()
    }

    /// The channel used at the given ASN and channel offset, see section
    /// 6.2.6.3.
    pub fn channel_for(&self, asn: Asn, channel_offset: u16) -> u16 {
        let index = (asn.value() + channel_offset as u64) % self.channels.len() as u64;
        self.channels[index as usize]
    }
}

/// A TSCH link, see section 8.4.3.3.3, table 8-98.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschLink {
    /// The link handle, unique across all slotframes.
    pub handle: u16,
    /// The handle of the slotframe this link belongs to.
    pub slotframe_handle: u8,
    /// The timeslot within the slotframe.
    pub timeslot: u16,
    /// The channel offset into the hopping sequence.
    pub channel_offset: u16,
    /// The link-layer address of the peer, broadcast for shared cells.
    pub node_addr: Address,
    /// Transmit link.
    pub tx: bool,
    /// Receive link.
    pub rx: bool,
    /// Shared (slotted CSMA/CA) link.
    pub shared: bool,
    /// The peer's frames discipline our clock.
    pub timekeeping: bool,
    /// High-priority traffic link.
    pub priority: bool,
    /// Enhanced beacons are sent in this link.
    pub advertising: bool,
    /// The link is advertised in enhanced beacons.
    pub advertise: bool,
}

impl TschLink {
    /// The wire representation of the link options.
    pub fn wire_options(&self) -> TschLinkOption {
        let mut options = TschLinkOption::empty();
        options.set(TschLinkOption::Tx, self.tx);
        options.set(TschLinkOption::Rx, self.rx);
        options.set(TschLinkOption::Shared, self.shared);
        options.set(TschLinkOption::TimeKeeping, self.timekeeping);
        options.set(TschLinkOption::Priority, self.priority);
        options
    }
}

/// A TSCH slotframe, see section 8.4.3.3.2, table 8-97.
///
/// Prime slotframe sizes are preferred so that parallel slotframes do
/// not persistently shadow each other.
#[derive(Debug, Clone)]
pub struct TschSlotframe {
    /// The slotframe handle.
    pub handle: u8,
    /// The number of timeslots in the slotframe.
    pub size: u16,
    /// The slotframe is advertised in enhanced beacons.
    pub advertise: bool,
    links: Vec<TschLink, MAX_LINKS_PER_SLOTFRAME>,
}

impl TschSlotframe {
    /// Create an empty slotframe.
    pub fn new(handle: u8, size: u16, advertise: bool) -> Self {
        Self {
            handle,
            size,
            advertise,
            links: Vec::new(),
        }
    }

    /// The links of the slotframe in (timeslot, handle) order.
    pub fn links(&self) -> impl Iterator<Item = &TschLink> {
        self.links.iter()
    }
}

/// The primary and backup link of the next active timeslot.
#[derive(Debug, Clone, Copy)]
pub struct NextActiveLink {
    /// The selected link.
    pub primary: TschLink,
    /// The lowest-slotframe-handle RX link in the same timeslot, if the
    /// primary cannot be used (e.g. a TX link without a queued frame).
    pub backup: Option<TschLink>,
    /// The offset to the slot in timeslots, measured from the current
    /// ASN before it was advanced.
    pub offset: u64,
}

/// The slotframe and link tables of an interface.
///
/// Guarded by the context lock.
#[derive(Debug, Default, Clone)]
pub struct ScheduleStore {
    slotframes: Vec<TschSlotframe, MAX_SLOTFRAMES>,
}

impl ScheduleStore {
    /// Create an empty schedule.
    pub const fn new() -> Self {
        Self {
            slotframes: Vec::new(),
        }
    }

    /// The slotframes in ascending handle order.
    pub fn slotframes(&self) -> impl Iterator<Item = &TschSlotframe> {
        self.slotframes.iter()
    }

    /// Look up a slotframe by handle.
    pub fn slotframe(&self, handle: u8) -> Option<&TschSlotframe> {
        self.slotframes.iter().find(|sf| sf.handle == handle)
    }

    /// Install or replace a slotframe.
    ///
    /// Returns the replaced slotframe, links included, so the caller can
    /// dispose of it.
    pub fn set_slotframe(
        &mut self,
        handle: u8,
        size: u16,
        advertise: bool,
    ) -> Result<Option<TschSlotframe>> {
        if size == 0 {
            return Err(Error::Invalid);
        }

        let slotframe = TschSlotframe::new(handle, size, advertise);

        if let Some(at) = self.slotframes.iter().position(|sf| sf.handle == handle) {
            let replaced = self.slotframes[at].clone();
            self.slotframes[at] = slotframe;
            return Ok(Some(replaced));
        }

        let at = self
            .slotframes
            .iter()
            .position(|sf| sf.handle > handle)
            .unwrap_or(self.slotframes.len());
        self.slotframes
            .insert(at, slotframe)
            .map_err(|_| Error::NoMemory)?;

        Ok(None)
    }

    /// Remove a slotframe and all its links.
    pub fn delete_slotframe(&mut self, handle: u8) -> Option<TschSlotframe> {
        let at = self.slotframes.iter().position(|sf| sf.handle == handle)?;
        Some(self.slotframes.remove(at))
    }

    /// Install or replace a link.
    ///
    /// Link handles are unique across slotframes; an existing link with
    /// the same handle is replaced and returned, even when it moves to a
    /// different slotframe. At least one of the TX and RX options must be
    /// set.
    pub fn set_link(&mut self, link: TschLink) -> Result<Option<TschLink>> {
        if !link.tx && !link.rx {
            return Err(Error::Invalid);
        }

        let slotframe = self
            .slotframes
            .iter()
            .position(|sf| sf.handle == link.slotframe_handle)
            .ok_or(Error::Invalid)?;

        if self.slotframes[slotframe].size <= link.timeslot {
            return Err(Error::Invalid);
        }

        let replaced = self.delete_link(link.handle);

        let links = &mut self.slotframes[slotframe].links;
        let at = links
            .iter()
            .position(|l| (l.timeslot, l.handle) > (link.timeslot, link.handle))
            .unwrap_or(links.len());
        links.insert(at, link).map_err(|_| Error::NoMemory)?;

        Ok(replaced)
    }

    /// Remove a link by handle.
    pub fn delete_link(&mut self, handle: u16) -> Option<TschLink> {
        for slotframe in self.slotframes.iter_mut() {
            if let Some(at) = slotframe.links.iter().position(|l| l.handle == handle) {
                return Some(slotframe.links.remove(at));
            }
        }

        None
    }

    /// Select the winner between two links active in the same timeslot,
    /// see section 6.2.6.4.
    fn compare_links<'l>(
        &self,
        neighbors: &NeighborTable,
        a: &'l TschLink,
        b: &'l TschLink,
    ) -> &'l TschLink {
        // A TX link beats an RX-only link.
        if a.tx != b.tx {
            return if a.tx { a } else { b };
        }

        // Same polarity: the lower slotframe handle wins.
        if a.slotframe_handle != b.slotframe_handle {
            return if a.slotframe_handle < b.slotframe_handle {
                a
            } else {
                b
            };
        }

        // RX-only links or the same neighbor: the lower link handle wins.
        if !a.tx || a.node_addr == b.node_addr {
            return if a.handle < b.handle { a } else { b };
        }

        // TX links to different neighbors: the fuller queue wins.
        let a_queued = neighbors.queue_size(&a.node_addr);
        let b_queued = neighbors.queue_size(&b.node_addr);

        if a_queued == b_queued {
            return if a.handle < b.handle { a } else { b };
        }

        if a_queued > b_queued {
            a
        } else {
            b
        }
    }

    /// Identify the next active link and advance the ASN to its slot.
    ///
    /// Offsets are measured in whole timeslots and lie in `[1, size]`: a
    /// link in the timeslot the ASN currently points at is next due a
    /// full slotframe cycle later, which keeps the advanced ASN strictly
    /// increasing.
    ///
    /// Returns `None` when no slotframe carries any link.
    pub fn get_next_active_link(
        &self,
        asn: &mut Asn,
        neighbors: &NeighborTable,
    ) -> Option<NextActiveLink> {
        let mut best: Option<&TschLink> = None;
        let mut backup: Option<&TschLink> = None;
        let mut time_to_best: u64 = 1;

        for slotframe in self.slotframes.iter() {
            let timeslot = (asn.value() % slotframe.size as u64) as u16;

            for link in slotframe.links.iter() {
                let time_to_timeslot = if link.timeslot > timeslot {
                    (link.timeslot - timeslot) as u64
                } else {
                    (slotframe.size + link.timeslot - timeslot) as u64
                };

                match best {
                    None => {
                        time_to_best = time_to_timeslot;
                        best = Some(link);
                        backup = None;
                    }
                    Some(_) if time_to_timeslot < time_to_best => {
                        time_to_best = time_to_timeslot;
                        best = Some(link);
                        backup = None;
                    }
                    Some(curr_best) if time_to_timeslot == time_to_best => {
                        let new_best = self.compare_links(neighbors, curr_best, link);

                        // The losing link can still serve as the backup
                        // RX link of the slot.
                        let loser = if core::ptr::eq(new_best, link) {
                            curr_best
                        } else {
                            link
                        };

                        if loser.rx
                            && backup
                                .map_or(true, |b| loser.slotframe_handle < b.slotframe_handle)
                        {
                            backup = Some(loser);
                        }

                        best = Some(new_best);
                    }
                    _ => {}
                }
            }
        }

        let best = best?;

        asn.advance(time_to_best);
        debug_assert!(asn.value() <= Asn::MAX);

        Some(NextActiveLink {
            primary: *best,
            backup: backup.copied(),
            offset: time_to_best,
        })
    }
}
