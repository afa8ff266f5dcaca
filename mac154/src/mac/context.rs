//! The per-interface link-layer context.
//!
//! All mutable context state is guarded by a single context lock
//! (`Mutex<MacContext<_>>`); scanning and mode transitions are guarded by
//! a separate scan lock so that a scan can run concurrently with normal
//! operation.

use mac154_frame::{SecurityLevel, TschTimeslotTimings};

use super::security::{CcmStar, SecurityContext};
use super::{
    BROADCAST_PAN_ID, NO_SHORT_ADDRESS_ASSIGNED, PAN_ID_NOT_ASSOCIATED,
    SHORT_ADDRESS_NOT_ASSOCIATED,
};
use crate::tsch::{Asn, HoppingSequence, ScheduleStore};
use crate::{Error, Result};

/// The role a device plays in its PAN, see section 6.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceRole {
    /// An end device.
    #[default]
    EndDevice,
    /// A coordinator.
    Coordinator,
    /// The PAN coordinator.
    PanCoordinator,
}

/// The TSCH sub-context of an interface.
pub struct TschContext {
    /// Whether TSCH mode is on, see section 8.2.19.5, table 8-49.
    pub mode: bool,
    /// The absolute slot number, see section 8.4.3.3.1, table 8-96.
    pub asn: Asn,
    /// The timeslot template, see section 8.4.3.3.4.
    pub timeslot_template: TschTimeslotTimings,
    /// The slotframe and link tables, see sections 8.4.3.3.2/8.4.3.3.3.
    pub schedule: ScheduleStore,
    /// The join metric advertised in enhanced beacons.
    pub join_metric: u8,
    /// macDisconnectTime, see section 8.4.3.3.1, table 8-96.
    pub disconnect_time: u8,
    /// Whether TSCH CCA is performed before transmissions.
    pub cca: bool,
}

impl Default for TschContext {
    fn default() -> Self {
        Self {
            mode: false,
            asn: Asn::default(),
            timeslot_template: TschTimeslotTimings::DEFAULT_2450_MHZ,
            schedule: ScheduleStore::new(),
            // see section 8.4.3.3.1, table 8-96
            join_metric: 1,
            disconnect_time: 0xff,
            cca: false,
        }
    }
}

/// The link-layer context of one interface.
///
/// PAN identifier and short address are kept in host byte order; the
/// extended address is kept in its on-wire little-endian order.
pub struct MacContext<C: CcmStar> {
    /// The PAN this interface operates on; broadcast when unassociated.
    pub pan_id: u16,
    /// The current radio channel.
    pub channel: u16,
    /// The short address; see the `SHORT_ADDRESS_*` constants for the
    /// reserved values.
    pub short_addr: u16,
    /// The extended address, little-endian.
    pub ext_addr: [u8; 8],
    /// The outgoing sequence counter (macDsn).
    pub sequence: u8,
    /// The transmission power in dBm.
    pub tx_power: i16,
    /// The device role.
    pub device_role: DeviceRole,
    /// Whether outgoing unicast frames request acknowledgment.
    pub ack_requested: bool,
    /// The sequence number of the last acknowledgment sent.
    pub ack_seq: u8,
    /// Short address of the coordinator this device associated through;
    /// see section 8.4.3.1, table 8-94, macCoordShortAddress.
    pub coord_short_addr: u16,
    /// Extended address of the coordinator this device associated
    /// through, little-endian; all-zero when unknown.
    pub coord_ext_addr: [u8; 8],
    /// The security sub-context.
    pub security: SecurityContext<C>,
    /// The TSCH sub-context.
    pub tsch: TschContext,
    /// The channel hopping sequence, if one is installed.
    pub hopping_sequence: Option<HoppingSequence>,
}

impl<C: CcmStar> MacContext<C> {
    /// Create a new, unassociated context with the given extended address
    /// (little-endian) and cipher.
    pub fn new(ext_addr: [u8; 8], cipher: C) -> Self {
        Self {
            pan_id: PAN_ID_NOT_ASSOCIATED,
            channel: crate::phy::NO_CHANNEL,
            short_addr: SHORT_ADDRESS_NOT_ASSOCIATED,
            ext_addr,
            sequence: 0,
            tx_power: 0,
            device_role: DeviceRole::default(),
            ack_requested: false,
            ack_seq: 0,
            coord_short_addr: SHORT_ADDRESS_NOT_ASSOCIATED,
            coord_ext_addr: [0; 8],
            security: SecurityContext::new(cipher),
            tsch: TschContext::default(),
            hopping_sequence: None,
        }
    }

    /// Whether the interface is associated to a PAN.
    pub fn is_associated(&self) -> bool {
        self.pan_id != PAN_ID_NOT_ASSOCIATED && self.short_addr != SHORT_ADDRESS_NOT_ASSOCIATED
    }

    /// Set the PAN identifier.
    pub fn set_pan_id(&mut self, pan_id: u16) -> Result<()> {
        if self.device_role == DeviceRole::PanCoordinator && pan_id == BROADCAST_PAN_ID {
            return Err(Error::Invalid);
        }

        self.pan_id = pan_id;
        Ok(())
    }

    /// Set the short address.
    pub fn set_short_addr(&mut self, short_addr: u16) -> Result<()> {
        if self.device_role == DeviceRole::PanCoordinator
            && short_addr >= NO_SHORT_ADDRESS_ASSIGNED
        {
            return Err(Error::Invalid);
        }

        self.short_addr = short_addr;
        Ok(())
    }

    /// Set the device role.
    ///
    /// A PAN coordinator must already carry a valid PAN identifier and an
    /// assigned short address.
    pub fn set_device_role(&mut self, role: DeviceRole) -> Result<()> {
        if role == DeviceRole::PanCoordinator
            && (self.pan_id == BROADCAST_PAN_ID || self.short_addr >= NO_SHORT_ADDRESS_ASSIGNED)
        {
            return Err(Error::Invalid);
        }

        self.device_role = role;
        Ok(())
    }

    /// Set the security level and key; only the implicit key identifier
    /// mode is supported.
    pub fn set_security_settings(&mut self, level: SecurityLevel, key: &[u8]) -> Result<()> {
        self.security.setup(level, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::security::NullCipher;

    fn context() -> MacContext<NullCipher> {
        MacContext::new([0x01; 8], NullCipher)
    }

    #[test]
    fn fresh_context_is_unassociated() {
        let ctx = context();
        assert!(!ctx.is_associated());
        assert_eq!(ctx.short_addr, SHORT_ADDRESS_NOT_ASSOCIATED);
    }

    #[test]
    fn pan_coordinator_requires_addresses() {
        let mut ctx = context();
        assert_eq!(
            ctx.set_device_role(DeviceRole::PanCoordinator),
            Err(Error::Invalid)
        );

        ctx.set_pan_id(0xabcd).unwrap();
        ctx.set_short_addr(0x1234).unwrap();
        ctx.set_device_role(DeviceRole::PanCoordinator).unwrap();
        assert!(ctx.is_associated());

        // And the addresses cannot be torn down underneath the role.
        assert_eq!(ctx.set_pan_id(BROADCAST_PAN_ID), Err(Error::Invalid));
        assert_eq!(
            ctx.set_short_addr(NO_SHORT_ADDRESS_ASSIGNED),
            Err(Error::Invalid)
        );
    }
}
