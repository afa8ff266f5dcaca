//! The link-layer context, its attributes and the context-bound frame
//! operations.

mod context;
pub use context::*;

pub mod frame;
pub use frame::*;

pub mod security;
pub use security::*;

/// The broadcast short address, see section 6.1.
pub const BROADCAST_ADDRESS: u16 = 0xffff;
/// The broadcast PAN identifier, see section 6.1.
pub const BROADCAST_PAN_ID: u16 = 0xffff;
/// Short address value of a device that is associated without an
/// assigned short address, see section 7.3.5.
pub const NO_SHORT_ADDRESS_ASSIGNED: u16 = 0xfffe;
/// Short address value of a device that is not associated, see section
/// 7.3.5.
pub const SHORT_ADDRESS_NOT_ASSOCIATED: u16 = BROADCAST_ADDRESS;
/// PAN identifier of a device that is not associated, see section 7.3.5.
pub const PAN_ID_NOT_ASSOCIATED: u16 = BROADCAST_PAN_ID;
