//! The merged network uptime counter.
//!
//! The counter combines two clocks: a low-power sleep clock (typically
//! ~32 kHz) that never stops, and a high-resolution clock (typically
//! ~4 MHz) that only runs while the radio is powered. The merged value is
//! always expressed in high-resolution ticks. On wake-up an epoch offset
//! is captured so that the merged counter stays continuous across sleep
//! periods; a monotonicity clamp ensures it never runs backwards when
//! switching between the two clocks.

use super::timeout::{TimeoutFn, TimeoutHandle, TimeoutQueue};
use crate::{Error, Result};

/// A free-running low-power clock.
pub trait SleepClock {
    /// Return the current tick of the sleep clock.
    fn ticks(&self) -> u64;

    /// Return the frequency of the sleep clock in Hz.
    fn frequency(&self) -> u64;
}

/// A stoppable high-resolution clock with a single compare register.
pub trait HighResClock {
    /// Returns `true` while the clock is running.
    fn is_running(&self) -> bool;

    /// Start the clock.
    fn start(&mut self) -> Result<()>;

    /// Stop the clock. The compare register is discarded.
    fn stop(&mut self);

    /// Return the current tick of the clock's own epoch.
    fn ticks(&self) -> u64;

    /// Program the compare register at a tick of the clock's own epoch.
    fn set_compare(&mut self, tick: u64);

    /// Return the frequency of the clock in Hz.
    fn frequency(&self) -> u64;
}

/// The merged uptime counter with its multiplexing timeout queue.
pub struct NetTimeCounter<S: SleepClock, H: HighResClock> {
    sleep_clock: S,
    highres_clock: H,
    /// Offset of the high-resolution clock's own epoch within the merged
    /// timeline; merged = offset + native.
    epoch_offset: u64,
    /// Monotonicity clamp over the merged tick.
    prev_tick: u64,
    /// Ticks already announced to the timeout queue.
    announced: u64,
    /// The merged tick the compare register is programmed to.
    programmed_deadline: Option<u64>,
    queue: TimeoutQueue,
    awake: bool,
}

impl<S: SleepClock, H: HighResClock> NetTimeCounter<S, H> {
    /// Create a new merged counter over the given clocks.
    pub fn new(sleep_clock: S, highres_clock: H) -> Self {
        Self {
            sleep_clock,
            highres_clock,
            epoch_offset: 0,
            prev_tick: 0,
            announced: 0,
            programmed_deadline: None,
            queue: TimeoutQueue::new(),
            awake: false,
        }
    }

    /// Return the frequency of the merged counter in Hz.
    pub fn frequency(&self) -> u64 {
        self.highres_clock.frequency()
    }

    fn sleep_ticks_as_highres(&self) -> u64 {
        // Conservatively assume the sleep clock is just about to advance.
        let sleep_ticks = self.sleep_clock.ticks() + 1;
        (sleep_ticks as u128 * self.highres_clock.frequency() as u128
            / self.sleep_clock.frequency() as u128) as u64
    }

    /// Power up the high-resolution clock and capture the epoch offset.
    ///
    /// Idempotent: waking an awake counter is a no-op.
    pub fn wake_up(&mut self) -> Result<()> {
        if self.awake && self.highres_clock.is_running() {
            return Ok(());
        }

        let resumed_at = self.sleep_ticks_as_highres().max(self.prev_tick);
        self.highres_clock.start()?;
        self.epoch_offset = resumed_at.wrapping_sub(self.highres_clock.ticks());
        self.awake = true;

        Ok(())
    }

    /// Release the high-resolution clock.
    ///
    /// Idempotent: releasing a sleeping counter is a no-op.
    pub fn may_sleep(&mut self) {
        if !self.awake {
            return;
        }

        // Remember where the merged timeline stopped so the clamp covers
        // the switch back to the sleep clock.
        self.prev_tick = self.current_tick().0;
        self.highres_clock.stop();
        self.awake = false;
    }

    /// Return the current merged tick.
    ///
    /// The second value is `false` when the high-resolution clock was off
    /// and the value had to be derived from the sleep clock.
    pub fn current_tick(&mut self) -> (u64, bool) {
        let (mut tick, high_precision) = if self.highres_clock.is_running() {
            (
                self.epoch_offset.wrapping_add(self.highres_clock.ticks()),
                true,
            )
        } else {
            (self.sleep_ticks_as_highres(), false)
        };

        // Never run backwards when switching between the clocks.
        if self.prev_tick > tick {
            tick = self.prev_tick;
        }
        self.prev_tick = tick;

        (tick, high_precision)
    }

    /// Ticks elapsed since the last announcement.
    pub fn elapsed(&mut self) -> u64 {
        let (tick, _) = self.current_tick();
        self.queue.gated_elapsed(tick - self.announced)
    }

    /// The current tick as seen by the timeout queue.
    pub fn tick_get(&mut self) -> u64 {
        let (tick, _) = self.current_tick();
        self.queue.tick_get(tick - self.announced)
    }

    /// Add a timeout expiring `delay` ticks from now and reprogram the
    /// compare register.
    pub fn add_timeout(
        &mut self,
        delay: u64,
        callback: Option<TimeoutFn>,
        waker: Option<core::task::Waker>,
    ) -> Result<(TimeoutHandle, u64)> {
        let elapsed = self.elapsed();
        let result = self.queue.add(delay, elapsed, callback, waker)?;
        self.reprogram();
        Ok(result)
    }

    /// Add a timeout expiring at an absolute merged tick.
    pub fn add_timeout_at(
        &mut self,
        deadline: u64,
        callback: Option<TimeoutFn>,
        waker: Option<core::task::Waker>,
    ) -> Result<(TimeoutHandle, u64)> {
        let now = self.tick_get();
        self.add_timeout(deadline.saturating_sub(now), callback, waker)
    }

    /// Cancel a pending timeout. Idempotent.
    pub fn abort_timeout(&mut self, handle: TimeoutHandle) -> bool {
        let removed = self.queue.abort(handle);
        if removed {
            self.reprogram();
        }
        removed
    }

    /// Returns `true` when the timeout behind the handle is still pending.
    pub fn timeout_is_active(&self, handle: TimeoutHandle) -> bool {
        self.queue.is_active(handle)
    }

    /// Replace the waker of a pending timeout.
    pub fn set_timeout_waker(&mut self, handle: TimeoutHandle, waker: core::task::Waker) {
        self.queue.set_waker(handle, waker);
    }

    fn reprogram(&mut self) {
        let elapsed = self.elapsed();

        match self.queue.next_timeout(elapsed) {
            Some(ticks) => {
                let deadline = self.announced + elapsed + ticks;
                self.programmed_deadline = Some(deadline);
                if self.highres_clock.is_running() {
                    self.highres_clock
                        .set_compare(deadline.wrapping_sub(self.epoch_offset));
                }
            }
            None => {
                self.programmed_deadline = None;
            }
        }
    }

    /// The merged tick the compare register is currently programmed to.
    pub fn programmed_deadline(&self) -> Option<u64> {
        self.programmed_deadline
    }

    /// The compare callback.
    ///
    /// Announces the elapsed ticks to the timeout queue, firing expired
    /// timeouts, and reprograms the compare register to the next deadline.
    pub fn on_compare(&mut self) {
        let (now, _) = self.current_tick();

        if let Some(deadline) = self.programmed_deadline.take() {
            // The comparator must not fire before its programmed tick.
            debug_assert!(deadline <= now, "compare fired early");
        }

        let announce = now - self.announced;
        self.announced = now;
        self.queue.announce(announce);

        self.reprogram();
    }

    /// Whether the high-resolution clock is currently requested.
    pub fn is_awake(&self) -> bool {
        self.awake
    }
}

impl<S: SleepClock, H: HighResClock> NetTimeCounter<S, H> {
    /// Access the underlying sleep clock.
    pub fn sleep_clock(&self) -> &S {
        &self.sleep_clock
    }

    /// Access the underlying high-resolution clock.
    pub fn highres_clock(&self) -> &H {
        &self.highres_clock
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    /// A manually advanced pair of test clocks sharing one timeline.
    #[derive(Clone, Default)]
    pub(crate) struct TestClock {
        inner: Rc<TestClockInner>,
    }

    #[derive(Default)]
    pub(crate) struct TestClockInner {
        /// Nanoseconds since power-on.
        now_ns: Cell<u64>,
        running: Cell<bool>,
        /// High-res epoch start in ns.
        started_at_ns: Cell<u64>,
        compare: Cell<Option<u64>>,
    }

    pub(crate) const SLEEP_HZ: u64 = 32_768;
    pub(crate) const HIGHRES_HZ: u64 = 4_000_000;

    impl TestClock {
        pub fn advance_ns(&self, ns: u64) {
            self.inner.now_ns.set(self.inner.now_ns.get() + ns);
        }

        pub fn compare(&self) -> Option<u64> {
            self.inner.compare.get()
        }
    }

    impl SleepClock for TestClock {
        fn ticks(&self) -> u64 {
            self.inner.now_ns.get() * SLEEP_HZ / 1_000_000_000
        }

        fn frequency(&self) -> u64 {
            SLEEP_HZ
        }
    }

    impl HighResClock for TestClock {
        fn is_running(&self) -> bool {
            self.inner.running.get()
        }

        fn start(&mut self) -> crate::Result<()> {
            if !self.inner.running.get() {
                self.inner.running.set(true);
                self.inner.started_at_ns.set(self.inner.now_ns.get());
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.inner.running.set(false);
            self.inner.compare.set(None);
        }

        fn ticks(&self) -> u64 {
            (self.inner.now_ns.get() - self.inner.started_at_ns.get()) * HIGHRES_HZ
                / 1_000_000_000
        }

        fn set_compare(&mut self, tick: u64) {
            self.inner.compare.set(Some(tick));
        }

        fn frequency(&self) -> u64 {
            HIGHRES_HZ
        }
    }

    #[test]
    fn merged_tick_is_monotonic_across_sleep() {
        let clock = TestClock::default();
        let mut counter = NetTimeCounter::new(clock.clone(), clock.clone());

        counter.wake_up().unwrap();
        let (t0, precise) = counter.current_tick();
        assert!(precise);

        clock.advance_ns(1_000_000);
        let (t1, _) = counter.current_tick();
        assert!(t1 > t0);

        counter.may_sleep();
        let (t2, precise) = counter.current_tick();
        assert!(!precise);
        assert!(t2 >= t1);

        clock.advance_ns(10_000_000);
        counter.wake_up().unwrap();
        let (t3, precise) = counter.current_tick();
        assert!(precise);
        assert!(t3 >= t2);
    }

    #[test]
    fn wake_up_is_idempotent() {
        let clock = TestClock::default();
        let mut counter = NetTimeCounter::new(clock.clone(), clock.clone());

        counter.wake_up().unwrap();
        let (t0, _) = counter.current_tick();
        counter.wake_up().unwrap();
        let (t1, _) = counter.current_tick();
        assert_eq!(t0, t1);

        counter.may_sleep();
        counter.may_sleep();
    }

    #[test]
    fn compare_fires_timeouts() {
        let clock = TestClock::default();
        let mut counter = NetTimeCounter::new(clock.clone(), clock.clone());
        counter.wake_up().unwrap();

        let (handle, expiry) = counter.add_timeout(4_000, None, None).unwrap();
        assert!(counter.timeout_is_active(handle));
        assert_eq!(counter.programmed_deadline(), Some(expiry));

        // Advance exactly to the deadline and fire the comparator.
        clock.advance_ns(1_000_000);
        counter.on_compare();

        assert!(!counter.timeout_is_active(handle));
        assert_eq!(counter.programmed_deadline(), None);
    }
}
