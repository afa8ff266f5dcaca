//! The radio driver trait.

use bitflags::bitflags;

use super::{ChannelPage, Config, FrameBuffer};
use crate::net_time::{HighResClock, NetTimeReference, SleepClock};
use crate::Result;

bitflags! {
    /// Hardware capabilities a driver may declare.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HwCapabilities: u8 {
        /// The radio transmits at a scheduled network time.
        const TIMED_TX = 0b0000_0001;
        /// The radio receives within a scheduled window.
        const TIMED_RX = 0b0000_0010;
        /// The radio acknowledges received frames itself.
        const AUTO_RX_TX_ACK = 0b0000_0100;
    }
}

/// The contract between the MAC and a radio driver.
///
/// The driver owns the physical radio and the network uptime counter;
/// received frames are delivered by the driver calling into the MAC's RX
/// path with the frame octets and a nanosecond RX timestamp.
pub trait Driver {
    /// The sleep clock backing the driver's uptime counter.
    type Sleep: SleepClock;
    /// The high-resolution clock backing the driver's uptime counter.
    type HighRes: HighResClock;

    /// Return the hardware capabilities of the radio.
    fn hw_capabilities(&self) -> HwCapabilities;

    /// Tune the radio to the given channel.
    fn set_channel(&mut self, channel: u16) -> Result<()>;

    /// Perform a single clear channel assessment.
    ///
    /// # Errors
    ///
    /// `Busy` when energy was detected on the channel.
    fn cca(&mut self) -> Result<()>;

    /// Apply a runtime configuration item.
    fn configure(&mut self, config: Config<'_>) -> Result<()>;

    /// Hand a frame to the radio for transmission.
    ///
    /// With [`HwCapabilities::TIMED_TX`], transmission starts at the
    /// frame's `timestamp`.
    fn send(&mut self, frame: &mut FrameBuffer) -> Result<()>;

    /// Return the network uptime reference of the radio.
    fn time_reference(&self) -> &NetTimeReference<Self::Sleep, Self::HighRes>;

    /// Return the currently configured channel page.
    fn channel_page(&self) -> ChannelPage;

    /// Check whether the given channel is valid on the current page.
    fn verify_channel(&self, channel: u16) -> bool;

    /// Return the supported channel ranges as inclusive `(from, to)`
    /// pairs.
    fn supported_channel_ranges(&self) -> &[(u16, u16)];
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::net_time::{NetTime, NetTimeCounter, TestClock};
    use crate::Error;
    use core::cell::RefCell;
    use std::vec::Vec;

    /// What the test radio was asked to do, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum TestDriverEvent {
        SetChannel(u16),
        Cca,
        Send { timestamp: NetTime, frame: Vec<u8> },
        RxSlot { start: NetTime, duration: NetTime, channel: u16 },
        ExpectedRxTime(NetTime),
        EnhAckHeaderIe { ie: Vec<u8>, short_addr: u16 },
    }

    /// Build the clock and uptime reference a [`TestDriver`] runs on.
    pub(crate) fn test_time() -> (TestClock, NetTimeReference<TestClock, TestClock>) {
        let clock = TestClock::default();
        let time = NetTimeReference::new(NetTimeCounter::new(clock.clone(), clock.clone()));
        (clock, time)
    }

    pub(crate) struct TestDriver<'r> {
        pub time: &'r NetTimeReference<TestClock, TestClock>,
        pub events: RefCell<Vec<TestDriverEvent>>,
        pub capabilities: HwCapabilities,
        pub cca_busy: bool,
        pub page: ChannelPage,
    }

    impl<'r> TestDriver<'r> {
        pub fn new(
            time: &'r NetTimeReference<TestClock, TestClock>,
            capabilities: HwCapabilities,
        ) -> Self {
            Self {
                time,
                events: RefCell::new(Vec::new()),
                capabilities,
                cca_busy: false,
                page: ChannelPage::ZeroOqpsk2450Bpsk868And915,
            }
        }

        pub fn events(&self) -> Vec<TestDriverEvent> {
            self.events.borrow().clone()
        }
    }

    impl Driver for TestDriver<'_> {
        type Sleep = TestClock;
        type HighRes = TestClock;

        fn hw_capabilities(&self) -> HwCapabilities {
            self.capabilities
        }

        fn set_channel(&mut self, channel: u16) -> Result<()> {
            self.events
                .borrow_mut()
                .push(TestDriverEvent::SetChannel(channel));
            Ok(())
        }

        fn cca(&mut self) -> Result<()> {
            self.events.borrow_mut().push(TestDriverEvent::Cca);
            if self.cca_busy {
                Err(Error::Busy)
            } else {
                Ok(())
            }
        }

        fn configure(&mut self, config: Config<'_>) -> Result<()> {
            let event = match config {
                Config::RxSlot {
                    start,
                    duration,
                    channel,
                } => TestDriverEvent::RxSlot {
                    start,
                    duration,
                    channel,
                },
                Config::ExpectedRxTime(time) => TestDriverEvent::ExpectedRxTime(time),
                Config::EnhAckHeaderIe { ie, short_addr } => TestDriverEvent::EnhAckHeaderIe {
                    ie: ie.to_vec(),
                    short_addr,
                },
            };
            self.events.borrow_mut().push(event);
            Ok(())
        }

        fn send(&mut self, frame: &mut FrameBuffer) -> Result<()> {
            self.events.borrow_mut().push(TestDriverEvent::Send {
                timestamp: frame.timestamp,
                frame: frame.as_slice().to_vec(),
            });
            Ok(())
        }

        fn time_reference(&self) -> &NetTimeReference<TestClock, TestClock> {
            self.time
        }

        fn channel_page(&self) -> ChannelPage {
            self.page
        }

        fn verify_channel(&self, channel: u16) -> bool {
            (11..=26).contains(&channel)
        }

        fn supported_channel_ranges(&self) -> &[(u16, u16)] {
            &[(11, 26)]
        }
    }
}
