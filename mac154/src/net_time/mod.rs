//! The network uptime reference.
//!
//! Network time is a monotonic, syntonized 64-bit nanosecond uptime since
//! interface start. Internally it is carried by a merged counter: a
//! low-power sleep counter that keeps running while the radio sleeps and
//! a high-resolution radio counter used while the radio is active. A
//! single compare register drives a [`TimeoutQueue`] from which all MAC
//! timers are multiplexed.

mod timeout;
pub use timeout::{TimeoutFn, TimeoutHandle, TimeoutQueue, TIMER_SLOTS};

mod counter;
pub use counter::{HighResClock, NetTimeCounter, SleepClock};

#[cfg(test)]
pub(crate) use counter::tests::TestClock;

mod reference;
pub use reference::{NetTimeReference, NetTimeTimer};

/// Network time in nanoseconds since interface start.
pub type NetTime = i64;

/// Nanoseconds per microsecond.
pub const NSEC_PER_USEC: NetTime = 1000;
/// Nanoseconds per second.
pub const NSEC_PER_SEC: NetTime = 1_000_000_000;

/// An absolute network uptime counter value in the counter's native
/// frequency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timepoint {
    /// The counter tick.
    pub tick: u64,
}

/// Rounding applied when converting nanosecond times to counter
/// timepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round to the nearest timepoint.
    Nearest,
    /// Round up to the next timepoint.
    Next,
    /// Round down to the previous timepoint.
    Previous,
}

/// Convert a nanosecond time to counter ticks at the given frequency.
pub(crate) fn ticks_from_time(time: NetTime, frequency: u64, rounding: Rounding) -> u64 {
    debug_assert!(time >= 0);

    let time = time as i128;
    let frequency = frequency as i128;

    let ticks = match rounding {
        Rounding::Previous => (time * frequency) / NSEC_PER_SEC as i128,
        Rounding::Next => (time * frequency + NSEC_PER_SEC as i128 - 1) / NSEC_PER_SEC as i128,
        Rounding::Nearest => {
            (time * frequency + NSEC_PER_SEC as i128 / 2) / NSEC_PER_SEC as i128
        }
    };

    ticks as u64
}

/// Convert counter ticks at the given frequency to a nanosecond time.
pub(crate) fn time_from_ticks(ticks: u64, frequency: u64) -> NetTime {
    (ticks as i128 * NSEC_PER_SEC as i128 / frequency as i128) as NetTime
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4 MHz: one tick is exactly 250 ns.
    const FREQUENCY: u64 = 4_000_000;

    #[test]
    fn conversions_are_lossless_at_tick_boundaries() {
        for tick in [0u64, 1, 4_000_000, 123_456_789] {
            let time = time_from_ticks(tick, FREQUENCY);
            for rounding in [Rounding::Nearest, Rounding::Next, Rounding::Previous] {
                assert_eq!(ticks_from_time(time, FREQUENCY, rounding), tick);
            }
        }
    }

    #[test]
    fn rounding_modes() {
        // 100 ns is below half a 250 ns tick.
        assert_eq!(ticks_from_time(100, FREQUENCY, Rounding::Previous), 0);
        assert_eq!(ticks_from_time(100, FREQUENCY, Rounding::Next), 1);
        assert_eq!(ticks_from_time(100, FREQUENCY, Rounding::Nearest), 0);

        // 200 ns is above half a tick.
        assert_eq!(ticks_from_time(200, FREQUENCY, Rounding::Nearest), 1);
    }
}
