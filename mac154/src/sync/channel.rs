//! A single-slot signalling channel.
//!
//! Sending never blocks and overwrites any value that was not yet
//! received; the receiver awaits the next value. This is the wake-up
//! mechanism between expiry callbacks and the TSCH task.

use core::cell::{Cell, RefCell};
use core::future::poll_fn;
use core::task::{Poll, Waker};

/// A single-slot channel carrying values of type `T`.
pub struct Channel<T> {
    slot: RefCell<Option<T>>,
    waker: Cell<Option<Waker>>,
}

impl<T> Channel<T> {
    /// Create a new, empty channel.
    pub const fn new() -> Self {
        Self {
            slot: RefCell::new(None),
            waker: Cell::new(None),
        }
    }

    /// Put a value into the channel, waking the receiver.
    ///
    /// Returns `true` when an unreceived value was overwritten.
    pub fn send(&self, value: T) -> bool {
        let replaced = self.slot.borrow_mut().replace(value).is_some();

        if let Some(waker) = self.waker.take() {
            waker.wake();
        }

        replaced
    }

    /// Returns `true` when a value is waiting.
    pub fn has_item(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Take a waiting value without blocking.
    pub fn try_receive(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }

    /// Wait for the next value.
    pub async fn receive(&self) -> T {
        poll_fn(|cx| match self.slot.borrow_mut().take() {
            Some(value) => Poll::Ready(value),
            None => {
                self.waker.set(Some(cx.waker().clone()));
                Poll::Pending
            }
        })
        .await
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pollster::FutureExt as _;

    use super::Channel;
    use crate::sync::{select, Either};

    #[test]
    fn send_then_receive() {
        async {
            let channel = Channel::new();
            assert!(!channel.send(1));
            assert!(channel.has_item());
            assert_eq!(channel.receive().await, 1);
            assert!(!channel.has_item());
        }
        .block_on()
    }

    #[test]
    fn send_overwrites() {
        async {
            let channel = Channel::new();
            assert!(!channel.send(1));
            assert!(channel.send(2));
            assert_eq!(channel.receive().await, 2);
        }
        .block_on()
    }

    #[test]
    fn receiver_wakes_on_send() {
        async {
            let channel = Channel::new();
            let result = select(channel.receive(), async {
                channel.send(42);
                // Let the receiver observe the value.
                crate::sync::yield_now().await;
            })
            .await;

            assert_eq!(result, Either::First(42));
        }
        .block_on()
    }
}
