use crate::{Address, AddressingFields, FrameControl};

/// A high-level representation of the addressing fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddressingFieldsRepr {
    /// The destination PAN ID, if present.
    pub dst_pan_id: Option<u16>,
    /// The source PAN ID, if present.
    pub src_pan_id: Option<u16>,
    /// The destination address, if present.
    pub dst_address: Option<Address>,
    /// The source address, if present.
    pub src_address: Option<Address>,
}

impl AddressingFieldsRepr {
    /// Parse the addressing fields under the given frame control.
    pub fn parse<T: AsRef<[u8]>, FC: AsRef<[u8]>>(
        af: AddressingFields<T>,
        fc: &FrameControl<FC>,
    ) -> Self {
        Self {
            dst_pan_id: af.dst_pan_id(fc),
            src_pan_id: af.src_pan_id(fc),
            dst_address: af.dst_address(fc).filter(|addr| !addr.is_absent()),
            src_address: af.src_address(fc).filter(|addr| !addr.is_absent()),
        }
    }

    /// The buffer length required to emit the addressing fields.
    pub fn buffer_len(&self) -> usize {
        (self.dst_pan_id.is_some() as usize) * 2
            + self.dst_address.map_or(0, |addr| addr.len())
            + (self.src_pan_id.is_some() as usize) * 2
            + self.src_address.map_or(0, |addr| addr.len())
    }
}
