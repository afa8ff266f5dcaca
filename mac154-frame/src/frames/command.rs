//! MAC command frame reader.
//!
//! Validates the command frame identifier, the per-command content length
//! and the addressing constraints of sections 7.5.1 through 7.5.11.

use crate::{AddressingMode, Error, Frame, FrameType, Result};

/// Command frame identifier, see section 7.5.1, table 7-49.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum CommandFrameIdentifier {
    /// Association request.
    AssociationRequest = 0x01,
    /// Association response.
    AssociationResponse = 0x02,
    /// Disassociation notification.
    DisassociationNotification = 0x03,
    /// Data request.
    DataRequest = 0x04,
    /// PAN ID conflict notification.
    PanIdConflictNotification = 0x05,
    /// Orphan notification.
    OrphanNotification = 0x06,
    /// Beacon request.
    BeaconRequest = 0x07,
    /// Coordinator realignment.
    CoordinatorRealignment = 0x08,
    /// GTS request.
    GtsRequest = 0x09,
    /// Unknown command.
    Unknown,
}

impl From<u8> for CommandFrameIdentifier {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::AssociationRequest,
            0x02 => Self::AssociationResponse,
            0x03 => Self::DisassociationNotification,
            0x04 => Self::DataRequest,
            0x05 => Self::PanIdConflictNotification,
            0x06 => Self::OrphanNotification,
            0x07 => Self::BeaconRequest,
            0x08 => Self::CoordinatorRealignment,
            0x09 => Self::GtsRequest,
            _ => Self::Unknown,
        }
    }
}

impl CommandFrameIdentifier {
    /// Return the length of the command content in octets, excluding the
    /// command frame identifier itself.
    pub fn content_len(&self) -> usize {
        match self {
            Self::AssociationRequest
            | Self::DisassociationNotification
            | Self::GtsRequest => 1,
            Self::AssociationResponse => 3,
            Self::CoordinatorRealignment => 8,
            _ => 0,
        }
    }
}

/// Addressing constraints a command imposes on its MAC header.
struct CommandMhrConstraints {
    ack_request: bool,
    has_src_pan: bool,
    has_dst_pan: bool,
    src_modes: u8,
    dst_modes: u8,
    src_pan_broadcast: bool,
    dst_broadcast: bool,
}

fn mode_bit(mode: AddressingMode) -> u8 {
    match mode {
        AddressingMode::Absent => 0b001,
        AddressingMode::Short => 0b010,
        AddressingMode::Extended => 0b100,
        AddressingMode::Unknown => 0,
    }
}

const NONE: u8 = 0b001;
const SHORT: u8 = 0b010;
const EXTENDED: u8 = 0b100;

/// A reader for an IEEE 802.15.4 MAC command frame.
pub struct MacCommandFrame<T: AsRef<[u8]>> {
    frame: Frame<T>,
}

impl<T: AsRef<[u8]>> MacCommandFrame<T> {
    /// Create a new [`MacCommandFrame`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown commands, content length mismatches
    /// and MAC headers that violate the addressing rules of the parsed
    /// command.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Frame::new(buffer)?;

        if frame.frame_control().frame_type() != FrameType::MacCommand {
            return Err(Error);
        }

        let command = Self { frame };
        command.validate()?;

        Ok(command)
    }

    /// Return the command frame identifier.
    pub fn command(&self) -> Result<CommandFrameIdentifier> {
        let payload = self.frame.payload().ok_or(Error)?;
        if payload.is_empty() {
            return Err(Error);
        }

        Ok(CommandFrameIdentifier::from(payload[0]))
    }

    /// Return the command content behind the command frame identifier.
    pub fn content(&self) -> Result<&[u8]> {
        let payload = self.frame.payload().ok_or(Error)?;
        let len = self.command()?.content_len();

        if payload.len() < 1 + len {
            return Err(Error);
        }

        Ok(&payload[1..][..len])
    }

    /// Return the wrapped [`Frame`] reader.
    pub fn frame(&self) -> &Frame<T> {
        &self.frame
    }

    fn constraints(&self, cfi: CommandFrameIdentifier) -> Result<CommandMhrConstraints> {
        use CommandFrameIdentifier::*;

        let fc = self.frame.frame_control();

        Ok(match cfi {
            AssociationRequest => CommandMhrConstraints {
                ack_request: true,
                has_src_pan: true,
                has_dst_pan: true,
                src_modes: EXTENDED,
                dst_modes: SHORT | EXTENDED,
                src_pan_broadcast: true,
                dst_broadcast: false,
            },
            AssociationResponse | PanIdConflictNotification => CommandMhrConstraints {
                ack_request: true,
                has_src_pan: false,
                has_dst_pan: true,
                src_modes: EXTENDED,
                dst_modes: EXTENDED,
                src_pan_broadcast: false,
                dst_broadcast: false,
            },
            DisassociationNotification => CommandMhrConstraints {
                ack_request: true,
                has_src_pan: false,
                has_dst_pan: true,
                src_modes: EXTENDED,
                dst_modes: SHORT | EXTENDED,
                src_pan_broadcast: false,
                dst_broadcast: false,
            },
            DataRequest => {
                if fc.dst_addressing_mode() == AddressingMode::Absent {
                    CommandMhrConstraints {
                        ack_request: true,
                        has_src_pan: true,
                        has_dst_pan: false,
                        src_modes: SHORT | EXTENDED,
                        dst_modes: NONE,
                        src_pan_broadcast: false,
                        dst_broadcast: false,
                    }
                } else {
                    CommandMhrConstraints {
                        ack_request: true,
                        has_src_pan: false,
                        has_dst_pan: true,
                        src_modes: SHORT | EXTENDED,
                        dst_modes: SHORT | EXTENDED,
                        src_pan_broadcast: false,
                        dst_broadcast: false,
                    }
                }
            }
            OrphanNotification => CommandMhrConstraints {
                ack_request: false,
                has_src_pan: false,
                has_dst_pan: true,
                src_modes: EXTENDED,
                dst_modes: SHORT,
                src_pan_broadcast: false,
                dst_broadcast: false,
            },
            BeaconRequest => CommandMhrConstraints {
                ack_request: false,
                has_src_pan: false,
                has_dst_pan: true,
                src_modes: NONE,
                dst_modes: SHORT,
                src_pan_broadcast: false,
                dst_broadcast: true,
            },
            CoordinatorRealignment => {
                let dst_short = fc.dst_addressing_mode() == AddressingMode::Short;
                CommandMhrConstraints {
                    ack_request: false,
                    has_src_pan: true,
                    has_dst_pan: true,
                    src_modes: EXTENDED,
                    dst_modes: if dst_short { SHORT } else { EXTENDED },
                    src_pan_broadcast: false,
                    dst_broadcast: dst_short,
                }
            }
            GtsRequest => CommandMhrConstraints {
                ack_request: true,
                has_src_pan: true,
                has_dst_pan: false,
                src_modes: SHORT,
                dst_modes: NONE,
                src_pan_broadcast: false,
                dst_broadcast: false,
            },
            Unknown => return Err(Error),
        })
    }

    fn validate(&self) -> Result<()> {
        let cfi = self.command()?;
        let payload = self.frame.payload().ok_or(Error)?;

        if payload.len() < 1 + cfi.content_len() {
            return Err(Error);
        }

        // Legacy command frames carry nothing behind the command content.
        if self.frame.frame_control().frame_version().is_legacy()
            && payload.len() != 1 + cfi.content_len()
        {
            return Err(Error);
        }

        let constraints = self.constraints(cfi)?;
        let fc = self.frame.frame_control();

        if fc.ack_request() != constraints.ack_request {
            return Err(Error);
        }

        if mode_bit(fc.src_addressing_mode()) & constraints.src_modes == 0 {
            return Err(Error);
        }

        if mode_bit(fc.dst_addressing_mode()) & constraints.dst_modes == 0 {
            return Err(Error);
        }

        let addressing = self.frame.addressing().ok_or(Error)?;

        if addressing.src_pan_id(&fc).is_some() != constraints.has_src_pan {
            return Err(Error);
        }

        if addressing.dst_pan_id(&fc).is_some() != constraints.has_dst_pan {
            return Err(Error);
        }

        if constraints.src_pan_broadcast && addressing.src_pan_id(&fc) != Some(0xffff) {
            return Err(Error);
        }

        if constraints.dst_broadcast
            && !addressing
                .dst_address(&fc)
                .is_some_and(|addr| addr.is_broadcast())
        {
            return Err(Error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_request() {
        let data = [0x03, 0x08, 0x01, 0xff, 0xff, 0xff, 0xff, 0x07];
        let command = MacCommandFrame::new(&data[..]).unwrap();
        assert_eq!(
            command.command().unwrap(),
            CommandFrameIdentifier::BeaconRequest
        );
        assert!(command.content().unwrap().is_empty());
    }

    #[test]
    fn beacon_request_must_be_broadcast() {
        // Same frame, unicast destination.
        let data = [0x03, 0x08, 0x01, 0xff, 0xff, 0x34, 0x12, 0x07];
        assert!(MacCommandFrame::new(&data[..]).is_err());
    }

    #[test]
    fn association_request() {
        // dst: PAN 0xabcd, short 0x0000; src: broadcast PAN, extended
        // address; ack requested; capability information 0x80.
        let data = [
            0x23, 0xc8, 0x05, 0xcd, 0xab, 0x00, 0x00, 0xff, 0xff, 0x01, 0x02, 0x03, 0x04, 0x05,
            0x06, 0x07, 0x08, 0x01, 0x80,
        ];
        let command = MacCommandFrame::new(&data[..]).unwrap();
        assert_eq!(
            command.command().unwrap(),
            CommandFrameIdentifier::AssociationRequest
        );
        assert_eq!(command.content().unwrap(), &[0x80]);
    }

    #[test]
    fn association_request_needs_broadcast_src_pan() {
        let mut data = [
            0x23, 0xc8, 0x05, 0xcd, 0xab, 0x00, 0x00, 0xff, 0xff, 0x01, 0x02, 0x03, 0x04, 0x05,
            0x06, 0x07, 0x08, 0x01, 0x80,
        ];
        // Overwrite the source PAN with a unicast PAN ID.
        data[7] = 0x01;
        data[8] = 0x00;
        assert!(MacCommandFrame::new(&data[..]).is_err());
    }

    #[test]
    fn data_request_without_destination() {
        // Only source addressing: PAN 0xabcd, short 0x1234.
        let data = [0x23, 0x80, 0x07, 0xcd, 0xab, 0x34, 0x12, 0x04];
        let command = MacCommandFrame::new(&data[..]).unwrap();
        assert_eq!(command.command().unwrap(), CommandFrameIdentifier::DataRequest);
    }

    #[test]
    fn truncated_content_rejected() {
        // Association request without the capability octet.
        let data = [
            0x23, 0xc8, 0x05, 0xcd, 0xab, 0x00, 0x00, 0xff, 0xff, 0x01, 0x02, 0x03, 0x04, 0x05,
            0x06, 0x07, 0x08, 0x01,
        ];
        assert!(MacCommandFrame::new(&data[..]).is_err());
    }

    #[test]
    fn unknown_command_rejected() {
        let data = [0x03, 0x08, 0x01, 0xff, 0xff, 0xff, 0xff, 0x7f];
        assert!(MacCommandFrame::new(&data[..]).is_err());
    }
}
