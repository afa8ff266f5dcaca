//! Auxiliary Security Header reader and writer, see section 9.4.
//!
//! The auxiliary header carries the security control octet, the 4-octet
//! frame counter and, depending on the key identifier mode, a key
//! identifier field of 0, 1, 5 or 9 octets.

use super::{Error, Result};

/// Security level, see section 9.4.2.2, table 9-6.
///
/// Level 4 (encryption without authentication) is deprecated since
/// IEEE 802.15.4-2015 and treated as reserved.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SecurityLevel {
    /// No security.
    None = 0,
    /// Authentication with a 32-bit tag.
    Mic32 = 1,
    /// Authentication with a 64-bit tag.
    Mic64 = 2,
    /// Authentication with a 128-bit tag.
    Mic128 = 3,
    /// Reserved (formerly encryption-only).
    Reserved = 4,
    /// Encryption and authentication with a 32-bit tag.
    EncMic32 = 5,
    /// Encryption and authentication with a 64-bit tag.
    EncMic64 = 6,
    /// Encryption and authentication with a 128-bit tag.
    EncMic128 = 7,
}

impl SecurityLevel {
    /// Return the length of the authentication tag in octets.
    pub fn authtag_len(&self) -> usize {
        match self {
            Self::Mic32 | Self::EncMic32 => 4,
            Self::Mic64 | Self::EncMic64 => 8,
            Self::Mic128 | Self::EncMic128 => 16,
            Self::None | Self::Reserved => 0,
        }
    }

    /// Returns `true` when the level encrypts the payload.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::EncMic32 | Self::EncMic64 | Self::EncMic128)
    }

    /// Return the authentication-only level with the same tag length.
    ///
    /// Enhanced Beacon frames in TSCH mode shall not be encrypted but may
    /// be authenticated, see section 6.3.6.
    pub fn without_encryption(&self) -> Self {
        match self {
            Self::EncMic32 => Self::Mic32,
            Self::EncMic64 => Self::Mic64,
            Self::EncMic128 => Self::Mic128,
            level => *level,
        }
    }
}

impl From<u8> for SecurityLevel {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0 => Self::None,
            1 => Self::Mic32,
            2 => Self::Mic64,
            3 => Self::Mic128,
            5 => Self::EncMic32,
            6 => Self::EncMic64,
            7 => Self::EncMic128,
            _ => Self::Reserved,
        }
    }
}

/// Key identifier mode, see section 9.4.2.3, table 9-7.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum KeyIdentifierMode {
    /// The key is determined implicitly from the originator and recipient.
    Implicit = 0,
    /// The key is determined from a 1-octet key index.
    Index = 1,
    /// The key is determined from a 4-octet key source and a key index.
    Source4Index = 2,
    /// The key is determined from an 8-octet key source and a key index.
    Source8Index = 3,
}

impl KeyIdentifierMode {
    /// Return the length of the key identifier field in octets.
    pub fn key_identifier_len(&self) -> usize {
        match self {
            Self::Implicit => 0,
            Self::Index => 1,
            Self::Source4Index => 5,
            Self::Source8Index => 9,
        }
    }
}

impl From<u8> for KeyIdentifierMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => Self::Implicit,
            1 => Self::Index,
            2 => Self::Source4Index,
            _ => Self::Source8Index,
        }
    }
}

/// A reader/writer for the IEEE 802.15.4 Auxiliary Security Header.
#[derive(Debug)]
pub struct AuxiliarySecurityHeader<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AuxiliarySecurityHeader<T> {
    /// The length of the security control field in octets.
    pub const CONTROL_LEN: usize = 1;
    /// The length of the frame counter field in octets.
    pub const FRAME_COUNTER_LEN: usize = 4;

    /// Create a new [`AuxiliarySecurityHeader`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short to contain the security
    /// control, the frame counter and the key identifier field.
    pub fn new(buffer: T) -> Result<Self> {
        let aux = Self::new_unchecked(buffer);

        if !aux.check_len() {
            return Err(Error);
        }

        Ok(aux)
    }

    fn check_len(&self) -> bool {
        let len = self.buffer.as_ref().len();

        if len < Self::CONTROL_LEN + Self::FRAME_COUNTER_LEN {
            return false;
        }

        len >= self.len()
    }

    /// Create a new [`AuxiliarySecurityHeader`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the length of the auxiliary security header in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        Self::CONTROL_LEN
            + Self::FRAME_COUNTER_LEN
            + self.key_identifier_mode().key_identifier_len()
    }

    /// Return the [`SecurityLevel`] field.
    pub fn security_level(&self) -> SecurityLevel {
        SecurityLevel::from(self.buffer.as_ref()[0] & 0b111)
    }

    /// Return the [`KeyIdentifierMode`] field.
    pub fn key_identifier_mode(&self) -> KeyIdentifierMode {
        KeyIdentifierMode::from((self.buffer.as_ref()[0] >> 3) & 0b11)
    }

    /// Returns `true` when the frame counter is suppressed.
    pub fn frame_counter_suppression(&self) -> bool {
        (self.buffer.as_ref()[0] >> 5) & 0b1 == 1
    }

    /// Returns `true` when the ASN is used in the nonce.
    pub fn asn_in_nonce(&self) -> bool {
        (self.buffer.as_ref()[0] >> 6) & 0b1 == 1
    }

    /// Return the frame counter field, in host order.
    pub fn frame_counter(&self) -> u32 {
        let b = &self.buffer.as_ref()[1..][..4];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Return the key identifier field.
    pub fn key_identifier(&self) -> &[u8] {
        let len = self.key_identifier_mode().key_identifier_len();
        &self.buffer.as_ref()[5..][..len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AuxiliarySecurityHeader<T> {
    /// Set the [`SecurityLevel`] field.
    pub fn set_security_level(&mut self, level: SecurityLevel) {
        let b = &mut self.buffer.as_mut()[0];
        *b = (*b & !0b111) | level as u8;
    }

    /// Set the [`KeyIdentifierMode`] field.
    pub fn set_key_identifier_mode(&mut self, mode: KeyIdentifierMode) {
        let b = &mut self.buffer.as_mut()[0];
        *b = (*b & !(0b11 << 3)) | ((mode as u8) << 3);
    }

    /// Clear the reserved bits of the security control field.
    pub fn clear_control_reserved(&mut self) {
        self.buffer.as_mut()[0] &= 0b0001_1111;
    }

    /// Set the frame counter field.
    pub fn set_frame_counter(&mut self, frame_counter: u32) {
        self.buffer.as_mut()[1..][..4].copy_from_slice(&frame_counter.to_le_bytes());
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for AuxiliarySecurityHeader<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Auxiliary Security Header")?;
        writeln!(f, "  level: {:?}", self.security_level())?;
        writeln!(f, "  key id mode: {:?}", self.key_identifier_mode())?;
        writeln!(f, "  frame counter: {}", self.frame_counter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_level_table() {
        for (value, tag, encrypted) in [
            (0u8, 0usize, false),
            (1, 4, false),
            (2, 8, false),
            (3, 16, false),
            (4, 0, false),
            (5, 4, true),
            (6, 8, true),
            (7, 16, true),
        ] {
            let level = SecurityLevel::from(value);
            assert_eq!(level.authtag_len(), tag);
            assert_eq!(level.is_encrypted(), encrypted);
        }
    }

    #[test]
    fn encryption_downgrade() {
        assert_eq!(
            SecurityLevel::EncMic32.without_encryption(),
            SecurityLevel::Mic32
        );
        assert_eq!(
            SecurityLevel::EncMic128.without_encryption(),
            SecurityLevel::Mic128
        );
        assert_eq!(SecurityLevel::Mic64.without_encryption(), SecurityLevel::Mic64);
    }

    #[test]
    fn read_implicit_mode_header() {
        // level 5, implicit key id mode, counter 0x01020304
        let data = [0x05, 0x04, 0x03, 0x02, 0x01];
        let aux = AuxiliarySecurityHeader::new(&data[..]).unwrap();
        assert_eq!(aux.security_level(), SecurityLevel::EncMic32);
        assert_eq!(aux.key_identifier_mode(), KeyIdentifierMode::Implicit);
        assert_eq!(aux.frame_counter(), 0x01020304);
        assert_eq!(aux.len(), 5);
    }

    #[test]
    fn rejects_truncated_key_identifier() {
        // key id mode 2 needs 5 + 5 octets
        let data = [0x05 | (2 << 3), 0x00, 0x00, 0x00, 0x00, 0x01, 0x02];
        assert!(AuxiliarySecurityHeader::new(&data[..]).is_err());
    }

    #[test]
    fn write_and_read_back() {
        let mut data = [0u8; 5];
        let mut aux = AuxiliarySecurityHeader::new_unchecked(&mut data[..]);
        aux.set_security_level(SecurityLevel::EncMic64);
        aux.set_key_identifier_mode(KeyIdentifierMode::Implicit);
        aux.clear_control_reserved();
        aux.set_frame_counter(42);

        let aux = AuxiliarySecurityHeader::new(&data[..]).unwrap();
        assert_eq!(aux.security_level(), SecurityLevel::EncMic64);
        assert_eq!(aux.frame_counter(), 42);
        assert!(!aux.frame_counter_suppression());
    }
}
