//! Data frame reader.

use crate::{Error, Frame, FrameType, Result};

/// A reader for an IEEE 802.15.4 data frame.
///
/// A data frame always embeds a non-empty payload, see section 7.3.2.
pub struct DataFrame<T: AsRef<[u8]>> {
    frame: Frame<T>,
}

impl<T: AsRef<[u8]>> DataFrame<T> {
    /// Create a new [`DataFrame`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a data frame or carries no
    /// payload.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Frame::new(buffer)?;

        if frame.frame_control().frame_type() != FrameType::Data {
            return Err(Error);
        }

        let data = Self { frame };

        if !data
            .frame
            .payload()
            .is_some_and(|payload| !payload.is_empty())
        {
            return Err(Error);
        }

        Ok(data)
    }

    /// Return the MAC payload of the frame.
    pub fn payload(&self) -> &[u8] {
        self.frame.payload().unwrap_or(&[])
    }

    /// Return the wrapped [`Frame`] reader.
    pub fn frame(&self) -> &Frame<T> {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, AddressingMode, FrameVersion};

    #[test]
    fn parse_broadcast_data_frame() {
        let data = [
            0x41, 0xd8, 0x01, 0xcd, 0xab, 0xff, 0xff, 0xc7, 0xd9, 0xb5, 0x14, 0x00, 0x4b, 0x12,
            0x00, 0x2b, 0x00, 0x00, 0x00,
        ];

        let frame = DataFrame::new(&data[..]).unwrap();
        let fc = frame.frame().frame_control();
        assert_eq!(fc.frame_type(), FrameType::Data);
        assert!(fc.pan_id_compression());
        assert_eq!(fc.dst_addressing_mode(), AddressingMode::Short);
        assert_eq!(fc.src_addressing_mode(), AddressingMode::Extended);
        assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2006);

        assert_eq!(frame.frame().sequence_number(), Some(1));

        let addressing = frame.frame().addressing().unwrap();
        assert_eq!(addressing.dst_pan_id(&fc), Some(0xabcd));
        assert_eq!(addressing.dst_address(&fc), Some(Address::BROADCAST));
        assert_eq!(addressing.src_pan_id(&fc), None);
        assert_eq!(
            addressing.src_address(&fc),
            Some(Address::Extended([
                0x00, 0x12, 0x4b, 0x00, 0x14, 0xb5, 0xd9, 0xc7
            ]))
        );

        assert_eq!(frame.payload(), &[0x2b, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn empty_payload_rejected() {
        // Same header as above, payload stripped.
        let data = [
            0x41, 0xd8, 0x01, 0xcd, 0xab, 0xff, 0xff, 0xc7, 0xd9, 0xb5, 0x14, 0x00, 0x4b, 0x12,
            0x00,
        ];
        assert!(DataFrame::new(&data[..]).is_err());
    }
}
