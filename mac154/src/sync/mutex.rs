//! An async mutex for futures running concurrently in the same task.

use core::cell::{Cell, RefCell, RefMut};
use core::future::poll_fn;
use core::ops::{Deref, DerefMut};
use core::task::{Poll, Waker};

/// A mutual exclusion primitive independent of the async runtime.
///
/// The slot-operation path takes the lock with [`try_lock`] and abandons
/// the slot on contention; everything else awaits [`lock`].
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
pub struct Mutex<T> {
    value: RefCell<T>,
    waker: Cell<Option<Waker>>,
}

impl<T> Mutex<T> {
    /// Create a new mutex protecting the given value.
    pub const fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            waker: Cell::new(None),
        }
    }

    /// Wait until the lock can be acquired.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        poll_fn(|cx| match self.value.try_borrow_mut() {
            Ok(value) => Poll::Ready(MutexGuard {
                mutex: self,
                value: Some(value),
            }),
            Err(_) => {
                // Wake a previously parked waiter so it does not starve,
                // then park ourselves.
                let new_waker = cx.waker();
                match self.waker.take() {
                    Some(waker) if waker.will_wake(new_waker) => {
                        self.waker.set(Some(waker));
                    }
                    Some(waker) => {
                        waker.wake();
                        self.waker.set(Some(new_waker.clone()));
                    }
                    None => self.waker.set(Some(new_waker.clone())),
                }

                Poll::Pending
            }
        })
        .await
    }

    /// Try to acquire the lock without waiting.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        match self.value.try_borrow_mut() {
            Ok(value) => Some(MutexGuard {
                mutex: self,
                value: Some(value),
            }),
            Err(_) => None,
        }
    }

    /// Get mutable access to the protected value.
    ///
    /// A mutable reference proves there is no outstanding guard.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

/// Exclusive access to the value protected by a [`Mutex`].
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    value: Option<RefMut<'a, T>>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().unwrap()
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().unwrap()
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // Release the borrow before waking the next waiter.
        self.value = None;

        if let Some(waker) = self.mutex.waker.take() {
            waker.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use pollster::FutureExt as _;

    use super::Mutex;
    use crate::sync::{select, yield_now::yield_now};

    #[test]
    fn lock_without_contention() {
        async {
            let mut mutex = Mutex::new(0usize);
            {
                let mut guard = mutex.lock().await;
                *guard += 1;
                assert_eq!(*guard, 1);
            }

            assert_eq!(*mutex.get_mut(), 1);
        }
        .block_on()
    }

    #[test]
    fn lock_under_select_concurrency() {
        async {
            let mut mutex = Mutex::new(0usize);
            for _ in 0..100 {
                select(
                    async {
                        let mut guard = mutex.lock().await;
                        *guard += 1;
                    },
                    async {
                        let mut guard = mutex.lock().await;
                        *guard += 1;
                    },
                )
                .await;
            }

            assert_eq!(*mutex.get_mut(), 100);
        }
        .block_on()
    }

    #[test]
    fn try_lock_contends() {
        async {
            let mut mutex = Mutex::new(0usize);
            select(
                async {
                    let mut guard = mutex.lock().await;
                    for _ in 0..10 {
                        *guard += 1;
                        yield_now().await;
                    }
                },
                async {
                    let mut spins = 0;
                    loop {
                        if let Some(mut guard) = mutex.try_lock() {
                            *guard += 1;
                            break;
                        }

                        spins += 1;
                        assert!(spins < 30, "try_lock never succeeded");
                        yield_now().await;
                    }
                },
            )
            .await;

            assert!(*mutex.get_mut() > 0);
        }
        .block_on()
    }
}
