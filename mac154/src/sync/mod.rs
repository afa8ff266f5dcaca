//! Executor-independent synchronization primitives.
//!
//! Everything here synchronizes concurrent futures *within a single task*
//! (driven through [`select`]); none of the types are `Send` or `Sync`.

pub(crate) mod channel;
pub(crate) mod mutex;
pub(crate) mod select;
pub(crate) mod yield_now;

pub use channel::Channel;
pub use mutex::{Mutex, MutexGuard};
pub use select::select;
pub use yield_now::yield_now;

/// The outcome of racing two futures against each other.
#[derive(Debug, PartialEq, Eq)]
pub enum Either<T, S> {
    /// The first future finished first.
    First(T),
    /// The second future finished first.
    Second(S),
}

impl<T, S> Either<T, S> {
    /// Returns `true` when the first future won.
    pub fn is_first(&self) -> bool {
        matches!(self, Either::First(_))
    }

    /// Returns `true` when the second future won.
    pub fn is_second(&self) -> bool {
        matches!(self, Either::Second(_))
    }
}
