//! An IEEE 802.15.4-2020 MAC layer with TSCH for constrained devices.
//!
//! The crate turns a raw packet radio into a reliable, optionally
//! authenticated and encrypted, time-synchronized link:
//!
//! - [`mac`]: the link-layer context and its attributes, frame filtering,
//!   header emission and the frame security procedures.
//! - [`tsch`]: the TSCH schedule (slotframes and links), the link
//!   selector and the tickless slot state machine.
//! - [`net_time`]: the syntonized network uptime reference bridging a
//!   low-power sleep counter and a high-resolution radio counter, with a
//!   generic timeout queue.
//! - [`phy`]: the radio driver contract consumed by the MAC.
//! - [`sync`]: executor-independent synchronization primitives used by
//!   the TSCH task.
//!
//! Frame parsing and emission live in the [`mac154_frame`] crate,
//! re-exported as [`frame`].

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
pub(crate) mod utils;

pub use mac154_frame as frame;

pub mod mac;
pub mod net_time;
pub mod phy;
pub mod sync;
pub mod tsch;

/// The error kinds of the MAC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Malformed bytes or out-of-range arguments.
    Invalid,
    /// The operation or encoding is not supported.
    NotSupported,
    /// The interface is not associated to a PAN.
    NotAssociated,
    /// The medium or a resource is busy.
    Busy,
    /// A security procedure failed.
    Security,
    /// No data is available.
    NoData,
    /// A buffer or table is exhausted.
    NoMemory,
    /// An operation timed out.
    Timeout,
    /// The network is down or not synchronized.
    NetDown,
}

/// A type alias for `Result<T, mac154::Error>`.
pub type Result<T> = core::result::Result<T, Error>;

impl From<mac154_frame::Error> for Error {
    fn from(_: mac154_frame::Error) -> Self {
        Self::Invalid
    }
}
