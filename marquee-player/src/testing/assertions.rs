//! Async-aware assertions for playback tests.
//!
//! Timing uses `tokio::time`, so these work under a paused test clock.

use std::fmt::Debug;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, sleep, timeout};

/// Extension trait for futures under test
pub trait AsyncAssertions {
    /// Assert that a future completes within a timeout
    fn completes_within(
        self,
        duration: Duration,
    ) -> impl Future<Output = Result<Self::Output, String>>
    where
        Self: Future + Sized;

    /// Assert that a future does not complete within a timeout
    fn does_not_complete_within(
        self,
        duration: Duration,
    ) -> impl Future<Output = Result<(), String>>
    where
        Self: Future + Sized;
}

impl<F> AsyncAssertions for F
where
    F: Future,
{
    async fn completes_within(
        self,
        duration: Duration,
    ) -> Result<F::Output, String> {
        timeout(duration, self)
            .await
            .map_err(|_| format!("Future did not complete within {duration:?}"))
    }

    async fn does_not_complete_within(
        self,
        duration: Duration,
    ) -> Result<(), String> {
        match timeout(duration, self).await {
            Ok(_) => Err(format!(
                "Future completed within {duration:?} when it shouldn't have"
            )),
            Err(_) => Ok(()),
        }
    }
}

/// Extension trait for eventually-consistent assertions
pub trait EventuallyExt {
    /// Check that a condition eventually becomes true
    fn eventually<F>(
        condition: F,
        timeout_duration: Duration,
    ) -> impl Future<Output = Result<(), String>>
    where
        F: Fn() -> bool;

    /// Check that a value eventually equals `expected`
    fn eventually_equals<T, F>(
        getter: F,
        expected: T,
        timeout_duration: Duration,
    ) -> impl Future<Output = Result<(), String>>
    where
        T: PartialEq + Debug,
        F: Fn() -> T;
}

const CHECK_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
pub struct Eventually;

impl EventuallyExt for Eventually {
    async fn eventually<F>(
        condition: F,
        timeout_duration: Duration,
    ) -> Result<(), String>
    where
        F: Fn() -> bool,
    {
        let start = Instant::now();

        loop {
            if condition() {
                return Ok(());
            }
            if start.elapsed() >= timeout_duration {
                return Err(format!(
                    "Condition did not become true within {timeout_duration:?}"
                ));
            }
            sleep(CHECK_INTERVAL).await;
        }
    }

    async fn eventually_equals<T, F>(
        getter: F,
        expected: T,
        timeout_duration: Duration,
    ) -> Result<(), String>
    where
        T: PartialEq + Debug,
        F: Fn() -> T,
    {
        let start = Instant::now();

        loop {
            let current = getter();
            if current == expected {
                return Ok(());
            }
            if start.elapsed() >= timeout_duration {
                return Err(format!(
                    "Value did not equal expected within {timeout_duration:?}. Last value: {current:?}, Expected: {expected:?}"
                ));
            }
            sleep(CHECK_INTERVAL).await;
        }
    }
}

/// Every event already buffered in `events`, oldest first
pub fn drain_events<E: Clone>(events: &mut broadcast::Receiver<E>) -> Vec<E> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return drained,
        }
    }
}

/// Assert that `expected` appears as a contiguous run inside `events`
pub fn assert_event_sequence<E>(
    events: &[E],
    expected: &[E],
) -> Result<(), String>
where
    E: PartialEq + Debug,
{
    if events.len() < expected.len() {
        return Err(format!(
            "Not enough events. Got {} events, expected at least {}",
            events.len(),
            expected.len()
        ));
    }

    if expected.is_empty()
        || events.windows(expected.len()).any(|window| window == expected)
    {
        return Ok(());
    }

    Err(format!(
        "Event sequence not found. Events: {events:?}, Expected sequence: {expected:?}"
    ))
}
