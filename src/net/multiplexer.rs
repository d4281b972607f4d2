//! Readiness waiting with cooperative cancellation.
//!
//! Every blocking wait in the relay goes through here: the listener waiting
//! for a connection and each session waiting for one of its legs. A wait
//! ends when the awaited thing is ready or when shutdown is observed. The
//! poll interval bounds how long a wait runs without re-checking the
//! shutdown flag; an interval elapsing is not an error and not EOF.

use std::future::Future;
use std::time::Duration;

use futures_util::future::{select_all, FutureExt};
use tokio::net::TcpStream;

use crate::lifecycle::ShutdownSignal;

/// Outcome of a cancellable wait.
#[derive(Debug, PartialEq, Eq)]
pub enum Wait<T> {
    Ready(T),
    Cancelled,
}

/// Drive `future` to completion unless shutdown is requested first.
///
/// `future` is polled in place across wake-ups, so a partially progressed
/// accept or readiness wait is never restarted.
pub async fn until_ready<F>(
    future: F,
    shutdown: &mut ShutdownSignal,
    poll_interval: Duration,
) -> Wait<F::Output>
where
    F: Future,
{
    tokio::pin!(future);

    loop {
        if shutdown.is_cancelled() {
            return Wait::Cancelled;
        }

        // Cancellation is checked first so a wake-up that readies both never
        // reports the future after shutdown was signalled.
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Wait::Cancelled,
            output = &mut future => return Wait::Ready(output),
            _ = tokio::time::sleep(poll_interval) => {
                tracing::trace!("Poll interval elapsed");
            }
        }
    }
}

/// Wait until at least one of `streams` is readable.
///
/// Returns the indices of every stream found readable, sorted and never
/// empty. Readiness may be spurious; callers must treat `WouldBlock` on the
/// following read as "nothing yet".
///
/// # Panics
///
/// Panics if `streams` is empty.
pub async fn wait_readable(
    streams: &[&TcpStream],
    shutdown: &mut ShutdownSignal,
    poll_interval: Duration,
) -> Wait<Vec<usize>> {
    assert!(!streams.is_empty(), "wait_readable needs at least one stream");

    let any = select_all(streams.iter().map(|stream| Box::pin(stream.readable())));
    let first = match until_ready(any, shutdown, poll_interval).await {
        Wait::Ready((_, index, _)) => index,
        Wait::Cancelled => return Wait::Cancelled,
    };

    // A readiness error is reported as ready so the read surfaces it.
    let ready = streams
        .iter()
        .enumerate()
        .filter(|(index, stream)| *index == first || stream.readable().now_or_never().is_some())
        .map(|(index, _)| index)
        .collect();

    Wait::Ready(ready)
}
