//! Information Element readers and writers.
//!
//! IEs come in two groups: Header IEs, which belong to the MAC header, and
//! Payload IEs, which prefix the MAC payload. Payload IEs of the MLME group
//! contain Nested IEs.

mod headers;
pub use headers::*;

mod payloads;
pub use payloads::*;

mod nested;
pub use nested::*;

use super::{Error, Result};

/// A reader for the Information Elements of an IEEE 802.15.4 frame.
///
/// Header IEs are walked until a Header Termination 1/2 element or the end
/// of the buffer; with an HT1 terminator, Payload IEs follow.
pub struct InformationElements<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> InformationElements<T> {
    /// Create a new [`InformationElements`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short to contain the
    /// information elements.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    fn check_len(&self) -> bool {
        let mut len = 0;

        let mut iter = self.header_information_elements();
        while iter.next().is_some() {}
        len += iter.offset();

        if len > self.data.as_ref().len() {
            return false;
        }

        let mut iter = self.payload_information_elements();
        while iter.next().is_some() {}
        len += iter.offset();

        self.data.as_ref().len() >= len
    }

    /// Create a new [`InformationElements`] reader from a given buffer
    /// without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the total length of the information elements in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let mut len = 0;

        let mut iter = self.header_information_elements();
        while iter.next().is_some() {}
        len += iter.offset();

        let mut iter = self.payload_information_elements();
        while iter.next().is_some() {}
        len += iter.offset();

        len
    }

    /// Returns `true` when a Header Termination 1 element announces payload
    /// IEs.
    pub fn payload_ie_present(&self) -> bool {
        self.header_information_elements()
            .any(|ie| ie.element_id() == HeaderElementId::HeaderTermination1)
    }

    /// Return an [`Iterator`] over [`HeaderInformationElement`].
    pub fn header_information_elements(&self) -> HeaderInformationElementsIterator {
        HeaderInformationElementsIterator {
            data: self.data.as_ref(),
            offset: 0,
            terminated: self.data.as_ref().is_empty(),
        }
    }

    /// Return an [`Iterator`] over [`PayloadInformationElement`].
    ///
    /// The iterator yields nothing unless the header IEs were terminated
    /// with a Header Termination 1 element.
    pub fn payload_information_elements(&self) -> PayloadInformationElementsIterator {
        let mut start = 0;
        let mut ht1 = false;
        for ie in self.header_information_elements() {
            start += ie.len() + HeaderInformationElement::<&[u8]>::HEADER_LEN;
            ht1 = ie.element_id() == HeaderElementId::HeaderTermination1;
        }

        let terminated = !ht1 || start >= self.data.as_ref().len();

        PayloadInformationElementsIterator {
            data: &self.data.as_ref()[start.min(self.data.as_ref().len())..],
            offset: 0,
            terminated,
        }
    }
}
