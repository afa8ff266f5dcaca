use crate::{AddressingMode, FrameControl, FrameType, FrameVersion};

/// A high-level representation of the Frame Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControlRepr {
    /// The frame type.
    pub frame_type: FrameType,
    /// Whether the frame is secured.
    pub security_enabled: bool,
    /// Whether more frames are pending at the sender.
    pub frame_pending: bool,
    /// Whether an acknowledgment is requested.
    pub ack_request: bool,
    /// Whether the source PAN ID is compressed away.
    pub pan_id_compression: bool,
    /// Whether the sequence number is suppressed.
    pub sequence_number_suppression: bool,
    /// Whether information elements are present.
    pub information_elements_present: bool,
    /// The destination addressing mode.
    pub dst_addressing_mode: AddressingMode,
    /// The source addressing mode.
    pub src_addressing_mode: AddressingMode,
    /// The frame version.
    pub frame_version: FrameVersion,
}

impl FrameControlRepr {
    /// Parse a Frame Control field.
    pub fn parse<T: AsRef<[u8]>>(fc: FrameControl<T>) -> Self {
        Self {
            frame_type: fc.frame_type(),
            security_enabled: fc.security_enabled(),
            frame_pending: fc.frame_pending(),
            ack_request: fc.ack_request(),
            pan_id_compression: fc.pan_id_compression(),
            sequence_number_suppression: fc.sequence_number_suppression(),
            information_elements_present: fc.information_elements_present(),
            dst_addressing_mode: fc.dst_addressing_mode(),
            src_addressing_mode: fc.src_addressing_mode(),
            frame_version: fc.frame_version(),
        }
    }

    /// The buffer length required to emit the Frame Control field.
    pub const fn buffer_len(&self) -> usize {
        2
    }
}
