//! A tickless timeout queue.
//!
//! Pending timeouts form a delta list: every entry stores the tick delta
//! to its predecessor, so the queue head always knows how far away the
//! next deadline is and the hardware comparator can be programmed
//! directly from it.
//!
//! While [`announce`] is running, newly added timeouts measure their
//! delay from the currently firing timeout's tick rather than from wall
//! time. Callbacks that re-arm timeouts therefore chain at well-defined,
//! deterministic offsets.
//!
//! [`announce`]: TimeoutQueue::announce

use core::task::Waker;

use crate::{Error, Result};

/// The number of timeout slots multiplexed on the uptime counter.
pub const TIMER_SLOTS: usize = 8;

/// A timeout expiry callback.
///
/// Runs inside [`TimeoutQueue::announce`] with its entry already removed;
/// it may re-arm timeouts on the queue it is handed.
pub type TimeoutFn = fn(queue: &mut TimeoutQueue, expiry_tick: u64);

/// A handle to a pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct TimeoutSlot {
    /// Ticks relative to the predecessor in the delta list.
    dticks: u64,
    next: Option<usize>,
    generation: u32,
    active: bool,
    callback: Option<TimeoutFn>,
    waker: Option<Waker>,
}

impl TimeoutSlot {
    const fn free() -> Self {
        Self {
            dticks: 0,
            next: None,
            generation: 0,
            active: false,
            callback: None,
            waker: None,
        }
    }
}

/// A fixed-capacity, delta-sorted timeout queue.
pub struct TimeoutQueue {
    slots: [TimeoutSlot; TIMER_SLOTS],
    head: Option<usize>,
    curr_tick: u64,
    announce_remaining: u64,
}

impl Default for TimeoutQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutQueue {
    /// Create a new, empty timeout queue.
    pub const fn new() -> Self {
        Self {
            slots: [const { TimeoutSlot::free() }; TIMER_SLOTS],
            head: None,
            curr_tick: 0,
            announce_remaining: 0,
        }
    }

    /// Returns `true` while [`Self::announce`] is executing.
    pub fn in_announce(&self) -> bool {
        self.announce_remaining != 0
    }

    /// Gate an externally measured elapsed tick count.
    ///
    /// Returns 0 during announcement so that re-armed timeouts are
    /// measured from the firing timeout's tick.
    pub fn gated_elapsed(&self, elapsed: u64) -> u64 {
        if self.in_announce() {
            0
        } else {
            elapsed
        }
    }

    /// The current tick of the queue, including unannounced elapsed ticks.
    pub fn tick_get(&self, elapsed: u64) -> u64 {
        self.curr_tick + self.gated_elapsed(elapsed)
    }

    /// Add a timeout expiring `delay` ticks from now.
    ///
    /// `elapsed` is the number of ticks the counter has advanced since the
    /// last announcement. Returns the handle and the absolute expiry tick.
    ///
    /// # Errors
    ///
    /// `Invalid` for a forever (`u64::MAX`) delay, `NoMemory` when all
    /// slots are pending.
    pub fn add(
        &mut self,
        delay: u64,
        elapsed: u64,
        callback: Option<TimeoutFn>,
        waker: Option<Waker>,
    ) -> Result<(TimeoutHandle, u64)> {
        if delay == u64::MAX {
            return Err(Error::Invalid);
        }

        let index = self
            .slots
            .iter()
            .position(|slot| !slot.active)
            .ok_or(Error::NoMemory)?;

        let mut dticks = delay + self.gated_elapsed(elapsed);
        let expiry = self.curr_tick + dticks;

        // Walk the delta list until a later neighbor is found.
        let mut prev: Option<usize> = None;
        let mut cursor = self.head;
        while let Some(at) = cursor {
            if self.slots[at].dticks > dticks {
                break;
            }
            dticks -= self.slots[at].dticks;
            prev = Some(at);
            cursor = self.slots[at].next;
        }

        if let Some(at) = cursor {
            self.slots[at].dticks -= dticks;
        }

        let generation = self.slots[index].generation.wrapping_add(1);
        self.slots[index] = TimeoutSlot {
            dticks,
            next: cursor,
            generation,
            active: true,
            callback,
            waker,
        };

        match prev {
            Some(at) => self.slots[at].next = Some(index),
            None => self.head = Some(index),
        }

        Ok((TimeoutHandle { index, generation }, expiry))
    }

    /// Returns `true` when the timeout behind the handle is still pending.
    pub fn is_active(&self, handle: TimeoutHandle) -> bool {
        let slot = &self.slots[handle.index];
        slot.active && slot.generation == handle.generation
    }

    /// Replace the waker of a pending timeout.
    pub fn set_waker(&mut self, handle: TimeoutHandle, waker: Waker) {
        if self.is_active(handle) {
            self.slots[handle.index].waker = Some(waker);
        }
    }

    /// Cancel a pending timeout.
    ///
    /// Cancelling an already fired or cancelled timeout is a no-op;
    /// returns `true` when the timeout was actually removed.
    pub fn abort(&mut self, handle: TimeoutHandle) -> bool {
        if !self.is_active(handle) {
            return false;
        }

        self.remove(handle.index);
        true
    }

    fn remove(&mut self, index: usize) {
        let next = self.slots[index].next;
        let dticks = self.slots[index].dticks;

        if let Some(at) = next {
            self.slots[at].dticks += dticks;
        }

        let mut prev: Option<usize> = None;
        let mut cursor = self.head;
        while let Some(at) = cursor {
            if at == index {
                break;
            }
            prev = Some(at);
            cursor = self.slots[at].next;
        }

        match prev {
            Some(at) => self.slots[at].next = next,
            None => self.head = next,
        }

        self.slots[index].active = false;
        self.slots[index].callback = None;
        self.slots[index].waker = None;
    }

    /// Ticks from now until the next pending deadline, if any.
    pub fn next_timeout(&self, elapsed: u64) -> Option<u64> {
        let head = self.head?;
        let dticks = self.slots[head].dticks;
        Some(dticks.saturating_sub(self.gated_elapsed(elapsed)))
    }

    /// Announce elapsed ticks and fire every expired timeout in delta
    /// order.
    ///
    /// Fired entries are removed before their callback runs, so callbacks
    /// may re-arm them; re-armed delays are measured from the firing
    /// timeout's tick (see the module documentation).
    pub fn announce(&mut self, ticks: u64) {
        self.announce_remaining = ticks;

        while let Some(head) = self.head {
            let dt = self.slots[head].dticks;
            if dt > self.announce_remaining {
                break;
            }

            self.curr_tick += dt;
            self.slots[head].dticks = 0;

            let callback = self.slots[head].callback.take();
            let waker = self.slots[head].waker.take();
            self.remove(head);

            if let Some(callback) = callback {
                callback(self, self.curr_tick);
            }

            if let Some(waker) = waker {
                waker.wake();
            }

            self.announce_remaining -= dt;
        }

        if let Some(head) = self.head {
            self.slots[head].dticks -= self.announce_remaining;
        }

        self.curr_tick += self.announce_remaining;
        self.announce_remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FIRED: AtomicUsize = AtomicUsize::new(0);

    fn count_fire(_queue: &mut TimeoutQueue, _tick: u64) {
        FIRED.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn fire_exactly_once() {
        FIRED.store(0, Ordering::Relaxed);

        let mut queue = TimeoutQueue::new();
        queue.add(10, 0, Some(count_fire), None).unwrap();

        queue.announce(9);
        assert_eq!(FIRED.load(Ordering::Relaxed), 0);

        queue.announce(1);
        assert_eq!(FIRED.load(Ordering::Relaxed), 1);

        queue.announce(100);
        assert_eq!(FIRED.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn overshooting_announce_fires() {
        FIRED.store(0, Ordering::Relaxed);

        let mut queue = TimeoutQueue::new();
        queue.add(10, 0, Some(count_fire), None).unwrap();
        queue.announce(25);

        assert_eq!(FIRED.load(Ordering::Relaxed), 1);
        assert_eq!(queue.tick_get(0), 25);
    }

    #[test]
    fn abort_prevents_firing() {
        FIRED.store(0, Ordering::Relaxed);

        let mut queue = TimeoutQueue::new();
        let (handle, expiry) = queue.add(10, 0, Some(count_fire), None).unwrap();
        assert_eq!(expiry, 10);

        assert!(queue.abort(handle));
        // Cancellation is idempotent.
        assert!(!queue.abort(handle));

        queue.announce(20);
        assert_eq!(FIRED.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn deltas_sum_to_deadlines() {
        let mut queue = TimeoutQueue::new();
        let (_, e1) = queue.add(30, 0, None, None).unwrap();
        let (_, e2) = queue.add(10, 0, None, None).unwrap();
        let (_, e3) = queue.add(20, 0, None, None).unwrap();

        assert_eq!((e1, e2, e3), (30, 10, 20));

        // The queue reports the earliest deadline.
        assert_eq!(queue.next_timeout(0), Some(10));

        queue.announce(10);
        assert_eq!(queue.next_timeout(0), Some(10));

        queue.announce(10);
        assert_eq!(queue.next_timeout(0), Some(10));

        queue.announce(10);
        assert_eq!(queue.next_timeout(0), None);
    }

    #[test]
    fn forever_is_rejected() {
        let mut queue = TimeoutQueue::new();
        assert_eq!(
            queue.add(u64::MAX, 0, None, None).unwrap_err(),
            Error::Invalid
        );
    }

    #[test]
    fn elapsed_offsets_new_timeouts() {
        let mut queue = TimeoutQueue::new();

        // 5 ticks have already passed since the last announcement, so a
        // 10-tick delay expires at tick 15.
        let (_, expiry) = queue.add(10, 5, None, None).unwrap();
        assert_eq!(expiry, 15);

        // During announce, elapsed is gated to zero.
        assert_eq!(queue.gated_elapsed(5), 5);
    }

    fn rearm_fire(queue: &mut TimeoutQueue, tick: u64) {
        FIRED.fetch_add(1, Ordering::Relaxed);
        if tick == 10 {
            // Re-arm relative to our own expiry: fires at tick 20 even
            // though the announcement already advanced further.
            queue.add(10, 123, Some(rearm_fire), None).unwrap();
        }
    }

    #[test]
    fn rearming_chains_deterministically() {
        FIRED.store(0, Ordering::Relaxed);

        let mut queue = TimeoutQueue::new();
        queue.add(10, 0, Some(rearm_fire), None).unwrap();

        // One announcement covering both the original and the chained
        // deadline: the re-armed timeout must fire at exactly tick 20.
        queue.announce(25);

        assert_eq!(FIRED.load(Ordering::Relaxed), 2);
        assert_eq!(queue.tick_get(0), 25);
    }
}
