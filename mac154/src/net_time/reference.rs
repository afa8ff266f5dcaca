//! The network uptime reference API.
//!
//! The reference converts between syntonized nanosecond network time and
//! counter timepoints, and multiplexes nanosecond-precision timers on the
//! merged counter's single compare register.

use core::cell::{Cell, RefCell};
use core::future::poll_fn;
use core::task::Poll;

use super::counter::{HighResClock, NetTimeCounter, SleepClock};
use super::timeout::TimeoutHandle;
use super::{ticks_from_time, time_from_ticks, NetTime, Rounding, Timepoint};
use crate::Result;

/// A timer multiplexed on the network uptime reference.
///
/// Timers are programmed at absolute network times; relative deadlines
/// are computed by the caller from the last programmed expiry so that
/// periodic chains do not accumulate rounding errors.
pub struct NetTimeTimer {
    handle: Cell<Option<TimeoutHandle>>,
    /// The nominal (unrounded) expiry in network time.
    current_expiry: Cell<NetTime>,
    /// The period for periodic timers, 0 for one-shot timers.
    period: Cell<NetTime>,
    rounding: Cell<Rounding>,
}

impl NetTimeTimer {
    /// Create a new, unprogrammed timer.
    pub const fn new() -> Self {
        Self {
            handle: Cell::new(None),
            current_expiry: Cell::new(0),
            period: Cell::new(0),
            rounding: Cell::new(Rounding::Nearest),
        }
    }

    /// The nominal expiry the timer is currently programmed to.
    pub fn current_expiry(&self) -> NetTime {
        self.current_expiry.get()
    }
}

impl Default for NetTimeTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// The network uptime reference over a merged counter.
pub struct NetTimeReference<S: SleepClock, H: HighResClock> {
    counter: RefCell<NetTimeCounter<S, H>>,
}

impl<S: SleepClock, H: HighResClock> NetTimeReference<S, H> {
    /// Create a new reference over the given counter.
    pub fn new(counter: NetTimeCounter<S, H>) -> Self {
        Self {
            counter: RefCell::new(counter),
        }
    }

    /// Return the monotonic network uptime in nanoseconds.
    pub fn get_time(&self) -> Result<NetTime> {
        let mut counter = self.counter.borrow_mut();
        let frequency = counter.frequency();
        let (tick, _) = counter.current_tick();
        Ok(time_from_ticks(tick, frequency))
    }

    /// Convert a network time to a counter timepoint with the chosen
    /// rounding.
    pub fn get_timepoint_from_time(&self, time: NetTime, rounding: Rounding) -> Timepoint {
        let frequency = self.counter.borrow().frequency();
        Timepoint {
            tick: ticks_from_time(time, frequency, rounding),
        }
    }

    /// Convert a counter timepoint to a network time.
    pub fn get_time_from_timepoint(&self, timepoint: Timepoint) -> NetTime {
        let frequency = self.counter.borrow().frequency();
        time_from_ticks(timepoint.tick, frequency)
    }

    /// Program a timer at an absolute network time.
    ///
    /// A `period` greater than zero makes the timer periodic: every
    /// expiry observed through [`Self::expired`] re-arms it one nominal
    /// period after the previous nominal expiry, so rounding errors do
    /// not accumulate.
    ///
    /// Returns the network time the timer was actually programmed to
    /// after rounding.
    pub fn timer_start(
        &self,
        timer: &NetTimeTimer,
        expire_at: NetTime,
        period: NetTime,
        rounding: Rounding,
    ) -> Result<NetTime> {
        if period < 0 {
            return Err(crate::Error::Invalid);
        }

        self.timer_stop(timer);

        timer.current_expiry.set(expire_at);
        timer.period.set(period);
        timer.rounding.set(rounding);

        let timepoint = self.get_timepoint_from_time(expire_at, rounding);

        let mut counter = self.counter.borrow_mut();
        let (handle, _) = counter.add_timeout_at(timepoint.tick, None, None)?;
        timer.handle.set(Some(handle));
        drop(counter);

        Ok(self.get_time_from_timepoint(timepoint))
    }

    /// Cancel a running timer. Idempotent.
    pub fn timer_stop(&self, timer: &NetTimeTimer) {
        if let Some(handle) = timer.handle.take() {
            self.counter.borrow_mut().abort_timeout(handle);
        }
    }

    /// Wait until the timer expires.
    ///
    /// Re-arms periodic timers before returning.
    pub async fn expired(&self, timer: &NetTimeTimer) {
        poll_fn(|cx| {
            let Some(handle) = timer.handle.get() else {
                // Never programmed or already observed: nothing to wait on.
                return Poll::Ready(());
            };

            let mut counter = self.counter.borrow_mut();
            if counter.timeout_is_active(handle) {
                counter.set_timeout_waker(handle, cx.waker().clone());
                Poll::Pending
            } else {
                timer.handle.set(None);
                Poll::Ready(())
            }
        })
        .await;

        let period = timer.period.get();
        if period > 0 {
            let next = timer.current_expiry.get() + period;
            let _ = self.timer_start(timer, next, period, timer.rounding.get());
        }
    }

    /// The syntonization hook.
    ///
    /// The minimal implementation tracks no skew; the measurement is
    /// accepted and discarded.
    pub fn syntonize(&self, _measured_time: NetTime, _measured_timepoint: Timepoint) {}

    /// Power up the high-resolution part of the counter. Idempotent.
    pub fn counter_wake_up(&self) -> Result<()> {
        self.counter.borrow_mut().wake_up()
    }

    /// Release the high-resolution part of the counter. Idempotent.
    pub fn counter_may_sleep(&self) {
        self.counter.borrow_mut().may_sleep()
    }

    /// Drive the compare callback.
    ///
    /// Must be called by the owner when the counter's compare register
    /// fires: announces elapsed ticks, fires expired timers and
    /// reprograms the next deadline.
    pub fn on_compare(&self) {
        self.counter.borrow_mut().on_compare();
    }

    /// Access the merged counter.
    pub fn counter(&self) -> &RefCell<NetTimeCounter<S, H>> {
        &self.counter
    }
}

#[cfg(test)]
mod tests {
    use pollster::FutureExt as _;

    use super::super::counter::tests::{TestClock, HIGHRES_HZ};
    use super::*;
    use crate::sync::{select, Either};

    fn reference(clock: &TestClock) -> NetTimeReference<TestClock, TestClock> {
        let reference = NetTimeReference::new(NetTimeCounter::new(clock.clone(), clock.clone()));
        reference.counter_wake_up().unwrap();
        reference
    }

    #[test]
    fn time_is_monotonic() {
        let clock = TestClock::default();
        let reference = reference(&clock);

        let t0 = reference.get_time().unwrap();
        clock.advance_ns(1_000_000);
        let t1 = reference.get_time().unwrap();
        assert!(t1 > t0);
    }

    #[test]
    fn timepoint_roundtrip() {
        let clock = TestClock::default();
        let reference = reference(&clock);

        let timepoint = reference.get_timepoint_from_time(1_000_000, Rounding::Nearest);
        assert_eq!(timepoint.tick, HIGHRES_HZ / 1_000);
        assert_eq!(reference.get_time_from_timepoint(timepoint), 1_000_000);
    }

    #[test]
    fn timer_fires_at_programmed_expiry() {
        let clock = TestClock::default();
        let reference = reference(&clock);
        let timer = NetTimeTimer::new();

        let now = reference.get_time().unwrap();
        let programmed = reference
            .timer_start(&timer, now + 1_000_000, 0, Rounding::Nearest)
            .unwrap();
        assert_eq!(programmed, now + 1_000_000);

        async {
            select(reference.expired(&timer), async {
                clock.advance_ns(1_000_000);
                reference.on_compare();
                // Allow the woken timer future to observe the expiry.
                loop {
                    crate::sync::yield_now().await;
                }
            })
            .await
        }
        .block_on();
    }

    #[test]
    fn timer_stop_is_idempotent() {
        let clock = TestClock::default();
        let reference = reference(&clock);
        let timer = NetTimeTimer::new();

        let now = reference.get_time().unwrap();
        reference
            .timer_start(&timer, now + 1_000_000, 0, Rounding::Nearest)
            .unwrap();

        reference.timer_stop(&timer);
        reference.timer_stop(&timer);

        // A stopped timer is immediately "expired" for waiters.
        async {
            let result = select(reference.expired(&timer), core::future::pending::<()>()).await;
            assert!(matches!(result, Either::First(())));
        }
        .block_on();
    }
}
