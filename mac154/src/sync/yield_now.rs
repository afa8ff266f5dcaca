//! Cooperative yielding.

use core::future::poll_fn;
use core::task::Poll;

/// Yield to the executor once, giving sibling futures a chance to run.
pub async fn yield_now() {
    let mut yielded = false;

    poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}
