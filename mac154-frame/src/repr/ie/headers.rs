use crate::time::Duration;
use crate::{Error, Result};
use crate::{HeaderElementId, HeaderInformationElement, TimeCorrection};

/// A high-level representation of a Header Information Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderInformationElementRepr {
    /// Time Correction Header Information Element.
    TimeCorrection(TimeCorrectionRepr),
    /// Header Termination 1 (payload IEs follow).
    HeaderTermination1,
    /// Header Termination 2 (plain payload follows).
    HeaderTermination2,
}

impl HeaderInformationElementRepr {
    /// Parse a Header Information Element.
    pub fn parse(ie: &HeaderInformationElement<&[u8]>) -> Result<Self> {
        Ok(match ie.element_id() {
            HeaderElementId::TimeCorrection => Self::TimeCorrection(TimeCorrectionRepr::parse(
                &TimeCorrection::new(ie.content())?,
            )),
            HeaderElementId::HeaderTermination1 => Self::HeaderTermination1,
            HeaderElementId::HeaderTermination2 => Self::HeaderTermination2,
            _ => return Err(Error),
        })
    }

    /// The buffer length required to emit the Header Information Element.
    pub fn buffer_len(&self) -> usize {
        2 + self.inner_len()
    }

    /// The buffer length required to emit the content of the Header
    /// Information Element.
    fn inner_len(&self) -> usize {
        match self {
            Self::TimeCorrection(repr) => repr.buffer_len(),
            Self::HeaderTermination1 | Self::HeaderTermination2 => 0,
        }
    }

    /// Emit the Header Information Element into a buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        let mut w = HeaderInformationElement::new_unchecked(&mut buffer[..]);
        w.clear();
        w.set_length(self.inner_len() as u16);
        w.set_element_id(self.into());

        match self {
            Self::TimeCorrection(repr) => {
                repr.emit(&mut TimeCorrection::new_unchecked(w.content_mut()));
            }
            Self::HeaderTermination1 | Self::HeaderTermination2 => {}
        }
    }
}

impl From<&HeaderInformationElementRepr> for HeaderElementId {
    fn from(value: &HeaderInformationElementRepr) -> Self {
        match value {
            HeaderInformationElementRepr::TimeCorrection(_) => HeaderElementId::TimeCorrection,
            HeaderInformationElementRepr::HeaderTermination1 => {
                HeaderElementId::HeaderTermination1
            }
            HeaderInformationElementRepr::HeaderTermination2 => {
                HeaderElementId::HeaderTermination2
            }
        }
    }
}

/// A high-level representation of a Time Correction Header Information
/// Element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCorrectionRepr {
    /// The time correction in microseconds.
    pub time_correction: Duration,
    /// The negative acknowledgment flag.
    pub nack: bool,
}

impl TimeCorrectionRepr {
    /// Parse a Time Correction Header Information Element.
    pub fn parse(tc: &TimeCorrection<&'_ [u8]>) -> Self {
        Self {
            time_correction: tc.time_correction(),
            nack: tc.nack(),
        }
    }

    /// The buffer length required to emit the Time Correction content.
    pub const fn buffer_len(&self) -> usize {
        2
    }

    /// Emit the Time Correction content into a writer.
    pub fn emit(&self, w: &mut TimeCorrection<&mut [u8]>) {
        w.set_time_correction(self.time_correction);
        w.set_nack(self.nack);
    }
}
