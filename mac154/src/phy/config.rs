//! Radio configuration values.

use crate::net_time::NetTime;

/// IEEE 802.15.4 channel pages, see section 10.1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPage {
    /// Channel page zero: O-QPSK 2450 MHz, BPSK 868/915 MHz.
    ZeroOqpsk2450Bpsk868And915,
    /// Channel page two: O-QPSK 868/915 MHz.
    TwoOqpsk868And915,
    /// Channel page five: O-QPSK 780 MHz.
    FiveOqpsk780,
    /// Channel page nine: SUN PHYs with predefined channel plans.
    NineSunPredefined,
}

impl ChannelPage {
    /// Whether the page (and, for page zero, the given channel range
    /// check) addresses a sub-GHz band.
    pub fn is_sub_ghz(&self, supports_channel_zero_or_one: bool) -> bool {
        match self {
            // Page zero carries both the 2.4 GHz band (channels 11-26)
            // and the sub-GHz BPSK channels 0-10.
            Self::ZeroOqpsk2450Bpsk868And915 => supports_channel_zero_or_one,
            Self::TwoOqpsk868And915 | Self::FiveOqpsk780 | Self::NineSunPredefined => true,
        }
    }
}

/// A runtime radio configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Config<'a> {
    /// Open a reception window.
    RxSlot {
        /// Network time at which the window opens.
        start: NetTime,
        /// Length of the window in nanoseconds.
        duration: NetTime,
        /// Channel to listen on.
        channel: u16,
    },
    /// Announce the expected arrival time of the next frame so a driver
    /// with auto-ACK support can compute the time correction itself.
    ExpectedRxTime(NetTime),
    /// Install a Header IE to be carried in all enhanced ACK frames sent
    /// to the given short address (broadcast installs it for everyone).
    EnhAckHeaderIe {
        /// The encoded Header IE, descriptor included.
        ie: &'a [u8],
        /// The short address the IE applies to.
        short_addr: u16,
    },
}
