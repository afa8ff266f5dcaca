use heapless::Vec;

use crate::{
    ChannelHopping, LinkInformation, NestedInformationElement, NestedSubId, NestedSubIdLong,
    NestedSubIdShort, SlotframeDescriptor, TschLinkOption, TschSlotframeAndLink,
    TschSynchronization, TschTimeslot, TschTimeslotTimings,
};
use crate::{Error, Result};

/// The maximum number of slotframe descriptors in a Slotframe and Link IE
/// representation.
pub const MAX_SLOTFRAME_DESCRIPTORS: usize = 4;
/// The maximum number of links per slotframe descriptor representation.
pub const MAX_LINK_INFORMATIONS: usize = 8;
/// The maximum hopping sequence length in a Channel Hopping IE
/// representation.
pub const MAX_HOPPING_SEQUENCE_LEN: usize = 16;

/// A high-level representation of an MLME Nested Information Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedInformationElementRepr {
    /// TSCH Synchronization IE.
    TschSynchronization(TschSynchronizationRepr),
    /// TSCH Timeslot IE.
    TschTimeslot(TschTimeslotRepr),
    /// TSCH Slotframe and Link IE.
    TschSlotframeAndLink(TschSlotframeAndLinkRepr),
    /// Channel Hopping IE.
    ChannelHopping(ChannelHoppingRepr),
}

impl NestedInformationElementRepr {
    /// Parse a Nested Information Element.
    pub fn parse(ie: &NestedInformationElement<&[u8]>) -> Result<Self> {
        Ok(match ie.sub_id() {
            NestedSubId::Short(NestedSubIdShort::TschSynchronization) => Self::TschSynchronization(
                TschSynchronizationRepr::parse(&TschSynchronization::new(ie.content())?),
            ),
            NestedSubId::Short(NestedSubIdShort::TschTimeslot) => {
                Self::TschTimeslot(TschTimeslotRepr::parse(&TschTimeslot::new(ie.content())?))
            }
            NestedSubId::Short(NestedSubIdShort::TschSlotframeAndLink) => {
                Self::TschSlotframeAndLink(TschSlotframeAndLinkRepr::parse(
                    &TschSlotframeAndLink::new(ie.content())?,
                )?)
            }
            NestedSubId::Long(NestedSubIdLong::ChannelHopping) => Self::ChannelHopping(
                ChannelHoppingRepr::parse(&ChannelHopping::new(ie.content())?)?,
            ),
            _ => return Err(Error),
        })
    }

    /// The buffer length required to emit the Nested Information Element.
    pub fn buffer_len(&self) -> usize {
        2 + self.inner_len()
    }

    /// The buffer length required to emit the content of the Nested
    /// Information Element.
    pub fn inner_len(&self) -> usize {
        match self {
            Self::TschSynchronization(repr) => repr.buffer_len(),
            Self::TschTimeslot(repr) => repr.buffer_len(),
            Self::TschSlotframeAndLink(repr) => repr.buffer_len(),
            Self::ChannelHopping(repr) => repr.buffer_len(),
        }
    }

    /// Emit the Nested Information Element into a writer.
    pub fn emit(&self, w: &mut NestedInformationElement<&mut [u8]>) {
        let id = NestedSubId::from(self);

        w.clear();
        w.set_length(self.inner_len() as u16, id);
        w.set_sub_id(id);

        match self {
            Self::TschSynchronization(repr) => {
                repr.emit(&mut TschSynchronization::new_unchecked(w.content_mut()))
            }
            Self::TschTimeslot(repr) => {
                repr.emit(&mut TschTimeslot::new_unchecked(w.content_mut()))
            }
            Self::TschSlotframeAndLink(repr) => {
                repr.emit(&mut TschSlotframeAndLink::new_unchecked(w.content_mut()))
            }
            Self::ChannelHopping(repr) => {
                repr.emit(&mut ChannelHopping::new_unchecked(w.content_mut()))
            }
        }
    }
}

impl From<&NestedInformationElementRepr> for NestedSubId {
    fn from(value: &NestedInformationElementRepr) -> Self {
        match value {
            NestedInformationElementRepr::TschSynchronization(_) => {
                NestedSubId::Short(NestedSubIdShort::TschSynchronization)
            }
            NestedInformationElementRepr::TschTimeslot(_) => {
                NestedSubId::Short(NestedSubIdShort::TschTimeslot)
            }
            NestedInformationElementRepr::TschSlotframeAndLink(_) => {
                NestedSubId::Short(NestedSubIdShort::TschSlotframeAndLink)
            }
            NestedInformationElementRepr::ChannelHopping(_) => {
                NestedSubId::Long(NestedSubIdLong::ChannelHopping)
            }
        }
    }
}

/// A high-level representation of a TSCH Synchronization Nested IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TschSynchronizationRepr {
    /// The absolute slot number (40 bit).
    pub absolute_slot_number: u64,
    /// The join metric.
    pub join_metric: u8,
}

impl TschSynchronizationRepr {
    /// Parse a TSCH Synchronization IE.
    pub fn parse(ie: &TschSynchronization<&[u8]>) -> Self {
        Self {
            absolute_slot_number: ie.absolute_slot_number(),
            join_metric: ie.join_metric(),
        }
    }

    /// The buffer length required to emit the TSCH Synchronization content.
    pub const fn buffer_len(&self) -> usize {
        TschSynchronization::<&[u8]>::LEN
    }

    /// Emit the TSCH Synchronization content into a writer.
    pub fn emit(&self, w: &mut TschSynchronization<&mut [u8]>) {
        w.set_absolute_slot_number(self.absolute_slot_number);
        w.set_join_metric(self.join_metric);
    }
}

/// A high-level representation of a TSCH Timeslot Nested IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TschTimeslotRepr {
    /// The shortened form, carrying only a timeslot template ID.
    Shortened {
        /// The timeslot template ID.
        id: u8,
    },
    /// The full form, carrying all timings.
    Full(TschTimeslotTimings),
}

impl TschTimeslotRepr {
    /// Parse a TSCH Timeslot IE.
    pub fn parse(ie: &TschTimeslot<&[u8]>) -> Self {
        match ie.timings() {
            Some(timings) => Self::Full(timings),
            None => Self::Shortened { id: ie.id() },
        }
    }

    /// The buffer length required to emit the TSCH Timeslot content.
    pub fn buffer_len(&self) -> usize {
        match self {
            Self::Shortened { .. } => TschTimeslot::<&[u8]>::SHORT_LEN,
            Self::Full(timings) => timings.ie_len(),
        }
    }

    /// Emit the TSCH Timeslot content into a writer.
    pub fn emit(&self, w: &mut TschTimeslot<&mut [u8]>) {
        match self {
            Self::Shortened { id } => w.set_id(*id),
            Self::Full(timings) => w.set_timings(timings),
        }
    }
}

/// A high-level representation of a Link Information field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInformationRepr {
    /// The timeslot of the link.
    pub timeslot: u16,
    /// The channel offset of the link.
    pub channel_offset: u16,
    /// The link options.
    pub link_options: TschLinkOption,
}

/// A high-level representation of a Slotframe Descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotframeDescriptorRepr {
    /// The slotframe handle.
    pub handle: u8,
    /// The slotframe size in timeslots.
    pub size: u16,
    /// The advertised links of the slotframe.
    pub links: Vec<LinkInformationRepr, MAX_LINK_INFORMATIONS>,
}

impl SlotframeDescriptorRepr {
    /// The buffer length required to emit this descriptor.
    pub fn buffer_len(&self) -> usize {
        SlotframeDescriptor::<&[u8]>::HEADER_LEN
            + self.links.len() * LinkInformation::<&[u8]>::len()
    }
}

/// A high-level representation of a TSCH Slotframe and Link Nested IE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TschSlotframeAndLinkRepr {
    /// The advertised slotframes.
    pub slotframes: Vec<SlotframeDescriptorRepr, MAX_SLOTFRAME_DESCRIPTORS>,
}

impl TschSlotframeAndLinkRepr {
    /// Parse a TSCH Slotframe and Link IE.
    pub fn parse(ie: &TschSlotframeAndLink<&[u8]>) -> Result<Self> {
        let mut slotframes = Vec::new();

        for descriptor in ie.slotframe_descriptors() {
            let mut links = Vec::new();
            for link in descriptor.link_informations() {
                links
                    .push(LinkInformationRepr {
                        timeslot: link.timeslot(),
                        channel_offset: link.channel_offset(),
                        link_options: link.link_options(),
                    })
                    .map_err(|_| Error)?;
            }

            slotframes
                .push(SlotframeDescriptorRepr {
                    handle: descriptor.handle(),
                    size: descriptor.size(),
                    links,
                })
                .map_err(|_| Error)?;
        }

        Ok(Self { slotframes })
    }

    /// The buffer length required to emit the Slotframe and Link content.
    pub fn buffer_len(&self) -> usize {
        1 + self
            .slotframes
            .iter()
            .map(|sf| sf.buffer_len())
            .sum::<usize>()
    }

    /// Emit the Slotframe and Link content into a writer.
    pub fn emit(&self, w: &mut TschSlotframeAndLink<&mut [u8]>) {
        w.set_number_of_slotframes(self.slotframes.len() as u8);

        let mut offset = 0;
        let buffer = w.descriptors_mut();
        for slotframe in self.slotframes.iter() {
            let mut descriptor = SlotframeDescriptor::new_unchecked(&mut buffer[offset..]);
            descriptor.set_handle(slotframe.handle);
            descriptor.set_size(slotframe.size);
            descriptor.set_links(slotframe.links.len() as u8);
            offset += SlotframeDescriptor::<&[u8]>::HEADER_LEN;

            for link in slotframe.links.iter() {
                let mut information = LinkInformation::new(&mut buffer[offset..]);
                information.set_timeslot(link.timeslot);
                information.set_channel_offset(link.channel_offset);
                information.set_link_options(link.link_options);
                offset += LinkInformation::<&[u8]>::len();
            }
        }
    }
}

/// A high-level representation of a Channel Hopping Nested IE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelHoppingRepr {
    /// The shortened form, carrying only the hopping sequence ID.
    Shortened {
        /// The hopping sequence ID.
        sequence_id: u8,
    },
    /// The full form, carrying the hopping sequence itself.
    Full {
        /// The hopping sequence ID.
        sequence_id: u8,
        /// The channel page.
        channel_page: u8,
        /// The number of channels of the page.
        number_of_channels: u16,
        /// The PHY configuration bitmap.
        phy_configuration: u32,
        /// The hopping sequence.
        sequence: Vec<u16, MAX_HOPPING_SEQUENCE_LEN>,
        /// The current hop.
        current_hop: u16,
    },
}

impl ChannelHoppingRepr {
    /// Parse a Channel Hopping IE.
    pub fn parse(ie: &ChannelHopping<&[u8]>) -> Result<Self> {
        if ie.is_shortened() {
            return Ok(Self::Shortened {
                sequence_id: ie.hopping_sequence_id(),
            });
        }

        let mut sequence = Vec::new();
        for channel in ie.hopping_sequence() {
            sequence.push(channel).map_err(|_| Error)?;
        }

        Ok(Self::Full {
            sequence_id: ie.hopping_sequence_id(),
            channel_page: ie.channel_page(),
            number_of_channels: ie.number_of_channels(),
            phy_configuration: ie.phy_configuration(),
            sequence,
            current_hop: ie.current_hop(),
        })
    }

    /// The buffer length required to emit the Channel Hopping content.
    pub fn buffer_len(&self) -> usize {
        match self {
            Self::Shortened { .. } => ChannelHopping::<&[u8]>::SHORT_LEN,
            Self::Full { sequence, .. } => {
                ChannelHopping::<&[u8]>::FULL_FIXED_LEN + (sequence.len() + 1) * 2
            }
        }
    }

    /// Emit the Channel Hopping content into a writer.
    pub fn emit(&self, w: &mut ChannelHopping<&mut [u8]>) {
        match self {
            Self::Shortened { sequence_id } => w.set_hopping_sequence_id(*sequence_id),
            Self::Full {
                sequence_id,
                channel_page,
                number_of_channels,
                phy_configuration,
                sequence,
                current_hop,
            } => {
                w.set_hopping_sequence_id(*sequence_id);
                w.set_channel_page(*channel_page);
                w.set_number_of_channels(*number_of_channels);
                w.set_phy_configuration(*phy_configuration);
                w.set_hopping_sequence(sequence);
                w.set_current_hop(*current_hop);
            }
        }
    }
}
