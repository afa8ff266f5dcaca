mod headers;
pub use headers::*;

mod nested;
pub use nested::*;

mod payloads;
pub use payloads::*;

use heapless::Vec;

use super::Result;
use crate::InformationElements;

/// The maximum number of header and payload IEs in a frame representation.
pub const MAX_IES: usize = 8;

/// A high-level representation of the Information Elements of a frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InformationElementsRepr {
    /// The Header Information Elements.
    pub header_information_elements: Vec<HeaderInformationElementRepr, MAX_IES>,
    /// The Payload Information Elements.
    pub payload_information_elements: Vec<PayloadInformationElementRepr, MAX_IES>,
}

impl InformationElementsRepr {
    /// Parse the Information Elements of a frame.
    ///
    /// Termination elements are consumed but not represented; they are
    /// re-derived on emission.
    pub fn parse(ie: InformationElements<&[u8]>) -> Result<Self> {
        let mut header_information_elements = Vec::new();
        let mut payload_information_elements = Vec::new();

        for header_ie in ie.header_information_elements() {
            match HeaderInformationElementRepr::parse(&header_ie) {
                Ok(
                    HeaderInformationElementRepr::HeaderTermination1
                    | HeaderInformationElementRepr::HeaderTermination2,
                ) => {}
                Ok(repr) => {
                    if header_information_elements.push(repr).is_err() {
                        break;
                    }
                }
                // Unsupported header IEs are skipped, not fatal.
                Err(_) => {}
            }
        }

        for payload_ie in ie.payload_information_elements() {
            match PayloadInformationElementRepr::parse(&payload_ie) {
                Ok(PayloadInformationElementRepr::PayloadTermination) => {}
                Ok(repr) => {
                    if payload_information_elements.push(repr).is_err() {
                        break;
                    }
                }
                Err(_) => {}
            }
        }

        Ok(Self {
            header_information_elements,
            payload_information_elements,
        })
    }

    /// The terminations required to emit the Information Elements: HT1,
    /// HT2 and payload termination.
    fn terminations(&self, contains_payload: bool) -> (bool, bool, bool) {
        match (
            !self.header_information_elements.is_empty(),
            !self.payload_information_elements.is_empty(),
            contains_payload,
        ) {
            // Payload IEs require an HT1 terminator for the header IE list.
            (_, true, contains_payload) => (true, false, contains_payload),
            // Header IEs followed by a payload require HT2.
            (true, false, true) => (false, true, false),
            // The frame ends after the header IEs; length delimits them.
            (true, false, false) => (false, false, false),
            (false, false, _) => (false, false, false),
        }
    }

    /// The buffer length required to emit the Information Elements.
    pub fn buffer_len(&self, contains_payload: bool) -> usize {
        let (ht1, ht2, pt) = self.terminations(contains_payload);
        let mut len = 0;

        for ie in self.header_information_elements.iter() {
            len += ie.buffer_len();
        }

        if ht1 || ht2 {
            len += 2;
        }

        for ie in self.payload_information_elements.iter() {
            len += ie.buffer_len();
        }

        if pt {
            len += 2;
        }

        len
    }

    /// Emit the Information Elements into a buffer.
    pub fn emit(&self, buffer: &mut [u8], contains_payload: bool) {
        let (ht1, ht2, pt) = self.terminations(contains_payload);
        let mut offset = 0;

        for ie in self.header_information_elements.iter() {
            ie.emit(&mut buffer[offset..][..ie.buffer_len()]);
            offset += ie.buffer_len();
        }

        if ht1 {
            HeaderInformationElementRepr::HeaderTermination1.emit(&mut buffer[offset..][..2]);
            offset += 2;
        }

        if ht2 {
            HeaderInformationElementRepr::HeaderTermination2.emit(&mut buffer[offset..][..2]);
            offset += 2;
        }

        for ie in self.payload_information_elements.iter() {
            ie.emit(&mut buffer[offset..][..ie.buffer_len()]);
            offset += ie.buffer_len();
        }

        if pt {
            PayloadInformationElementRepr::PayloadTermination.emit(&mut buffer[offset..][..2]);
        }
    }
}
