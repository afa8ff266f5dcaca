//! Racing two futures against each other.

use core::future::{poll_fn, Future};
use core::pin::pin;
use core::task::Poll;

use super::Either;

/// Poll both futures until the first one finishes; the loser is dropped.
///
/// The first future is polled first, so it wins ties.
pub async fn select<F1: Future, F2: Future>(f1: F1, f2: F2) -> Either<F1::Output, F2::Output> {
    let mut f1 = pin!(f1);
    let mut f2 = pin!(f2);

    poll_fn(move |cx| {
        if let Poll::Ready(result) = f1.as_mut().poll(cx) {
            return Poll::Ready(Either::First(result));
        }

        if let Poll::Ready(result) = f2.as_mut().poll(cx) {
            return Poll::Ready(Either::Second(result));
        }

        Poll::Pending
    })
    .await
}

#[cfg(test)]
mod tests {
    use core::future::poll_fn;
    use core::task::Poll;

    use pollster::FutureExt as _;

    use super::select;
    use crate::sync::Either;

    #[test]
    fn first_wins_ties() {
        async {
            let f1 = poll_fn(|_| Poll::Ready(1));
            let f2 = poll_fn(|_| Poll::Ready(2));
            assert_eq!(select(f1, f2).await, Either::First(1));
        }
        .block_on();
    }

    #[test]
    fn second_finishes_first() {
        async {
            let f1 = poll_fn(|_| Poll::<()>::Pending);
            let f2 = poll_fn(|_| Poll::Ready(2));
            assert_eq!(select(f1, f2).await, Either::Second(2));
        }
        .block_on();
    }

    #[test]
    fn pending_future_is_repolled() {
        async {
            let mut polls = 5;
            let f1 = poll_fn(move |cx| {
                if polls == 0 {
                    Poll::Ready(())
                } else {
                    polls -= 1;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            });
            let f2 = poll_fn(|_| Poll::<()>::Pending);

            assert_eq!(select(f1, f2).await, Either::First(()));
        }
        .block_on();
    }
}
