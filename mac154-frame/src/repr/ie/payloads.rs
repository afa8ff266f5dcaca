use heapless::Vec;

use super::NestedInformationElementRepr;
use crate::{Error, NestedInformationElement, PayloadGroupId, PayloadInformationElement, Result};

/// The maximum number of nested IEs in an MLME payload IE representation.
pub const MAX_NESTED_IES: usize = 8;

/// A high-level representation of a Payload Information Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadInformationElementRepr {
    /// MLME Payload Information Element, containing nested IEs.
    Mlme(Vec<NestedInformationElementRepr, MAX_NESTED_IES>),
    /// Payload Termination.
    PayloadTermination,
}

impl PayloadInformationElementRepr {
    /// Parse a Payload Information Element.
    pub fn parse(ie: &PayloadInformationElement<&[u8]>) -> Result<Self> {
        match ie.group_id() {
            PayloadGroupId::Mlme => {
                let mut nested_information_elements = Vec::new();

                for nested_ie in ie.nested_information_elements() {
                    nested_information_elements
                        .push(NestedInformationElementRepr::parse(&nested_ie)?)
                        .map_err(|_| Error)?;
                }

                Ok(Self::Mlme(nested_information_elements))
            }
            PayloadGroupId::PayloadTermination => Ok(Self::PayloadTermination),
            _ => Err(Error),
        }
    }

    /// The buffer length required to emit the Payload Information Element.
    pub fn buffer_len(&self) -> usize {
        2 + self.inner_len()
    }

    /// The buffer length required to emit the content of the Payload
    /// Information Element.
    pub fn inner_len(&self) -> usize {
        match self {
            Self::Mlme(nested) => nested.iter().map(|ie| ie.buffer_len()).sum(),
            Self::PayloadTermination => 0,
        }
    }

    /// Emit the Payload Information Element into a buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        let mut w = PayloadInformationElement::new_unchecked(&mut buffer[..]);
        w.clear();
        w.set_length(self.inner_len() as u16);
        w.set_group_id(self.into());

        match self {
            Self::Mlme(nested) => {
                let mut offset = 0;
                let content = w.content_mut();
                for ie in nested.iter() {
                    ie.emit(&mut NestedInformationElement::new_unchecked(
                        &mut content[offset..][..ie.buffer_len()],
                    ));
                    offset += ie.buffer_len();
                }
            }
            Self::PayloadTermination => {}
        }
    }
}

impl From<&PayloadInformationElementRepr> for PayloadGroupId {
    fn from(value: &PayloadInformationElementRepr) -> Self {
        match value {
            PayloadInformationElementRepr::Mlme(_) => PayloadGroupId::Mlme,
            PayloadInformationElementRepr::PayloadTermination => {
                PayloadGroupId::PayloadTermination
            }
        }
    }
}
